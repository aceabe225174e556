//! Arena tick tests: telegraphs, defenses and combos interacting.

use riposte_combat::prelude::*;
use riposte_common::{CombatError, EntityId, Vec2};
use std::f32::consts::PI;

const DT: f32 = 1.0 / 60.0;

fn arena() -> CombatArena {
    CombatArena::new(CombatConfig {
        rng_seed: Some(7),
        ..Default::default()
    })
    .expect("valid config")
}

fn run(arena: &mut CombatArena, ticks: usize) -> Vec<CombatEvent> {
    (0..ticks).flat_map(|_| arena.tick(DT)).collect()
}

fn hits_on(events: &[CombatEvent], who: EntityId) -> Vec<f32> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::Hit {
                target,
                health_damage,
                ..
            } if *target == who => Some(*health_damage),
            _ => None,
        })
        .collect()
}

/// Player at the origin facing +x, enemy two units ahead facing back.
fn duel(arena: &mut CombatArena) -> (EntityId, EntityId) {
    let player = arena.spawn(Vitals::new(100.0, Vec2::ZERO, 0));
    let enemy = arena.spawn(Vitals::new(100.0, Vec2::new(2.0, 0.0), 1).with_facing(PI));
    (player, enemy)
}

#[test]
fn telegraph_hits_once_per_activation() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);

    assert!(arena.attack(enemy, Vec2::ZERO).expect("known entity"));
    let pattern = arena
        .telegraph_state(enemy)
        .and_then(TelegraphState::pattern)
        .expect("pattern selected");
    assert_eq!(pattern.name, "sword_slash");

    let events = run(&mut arena, 120);
    assert_eq!(hits_on(&events, player), vec![15.0]);
    assert_eq!(arena.vitals(player).map(|v| v.health), Some(85.0));

    let phases: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::Telegraph { entity, to, .. } if *entity == enemy => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![TelegraphPhase::Active, TelegraphPhase::Cooldown, TelegraphPhase::Inactive]
    );
}

#[test]
fn telegraph_ignores_own_team() {
    let mut arena = arena();
    let (_, enemy) = duel(&mut arena);
    let ally = arena.spawn(Vitals::new(100.0, Vec2::new(1.0, 0.0), 1));

    arena.attack(enemy, Vec2::ZERO).expect("known entity");
    let events = run(&mut arena, 60);
    assert!(hits_on(&events, ally).is_empty());
}

#[test]
fn large_delta_advances_one_phase() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);

    arena.attack(enemy, Vec2::ZERO).expect("known entity");
    let events = arena.tick(10.0);
    assert_eq!(
        arena.telegraph_state(enemy).map(TelegraphState::phase),
        Some(TelegraphPhase::Active)
    );
    assert_eq!(hits_on(&events, player).len(), 1);
}

#[test]
fn perfect_parry_enables_counter_and_backstab() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);

    assert!(arena.parry(player).expect("known entity"));
    for _ in 0..60 {
        let state = arena.defense_state(player).expect("spawned");
        if state.phase() == DefensePhase::Active && state.phase_remaining() <= 0.1 {
            break;
        }
        arena.tick(DT);
    }

    let events = arena.player_strike(enemy, player, 20.0).expect("known entities");
    assert_eq!(
        events,
        vec![CombatEvent::Negated {
            attacker: enemy,
            target: player
        }]
    );
    let state = arena.defense_state(player).expect("spawned");
    assert!(state.has_counter_buff());
    assert!(state.is_backstab_window());

    let counter = arena.player_strike(player, enemy, 10.0).expect("known entities");
    let dealt = hits_on(&counter, enemy);
    assert_eq!(dealt.len(), 1);
    assert!((dealt[0] - 30.0).abs() < 1e-3);

    let followup = arena.player_strike(player, enemy, 10.0).expect("known entities");
    assert!((hits_on(&followup, enemy)[0] - 20.0).abs() < 1e-3);
}

#[test]
fn counter_kept_when_strike_finds_a_corpse() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);
    let corpse = arena.spawn(Vitals::new(5.0, Vec2::new(0.0, 2.0), 1));
    arena.player_strike(player, corpse, 50.0).expect("known entities");
    assert_eq!(arena.vitals(corpse).map(Vitals::is_alive), Some(false));

    arena.parry(player).expect("known entity");
    for _ in 0..60 {
        let state = arena.defense_state(player).expect("spawned");
        if state.phase() == DefensePhase::Active && state.phase_remaining() <= 0.1 {
            break;
        }
        arena.tick(DT);
    }
    arena.player_strike(enemy, player, 20.0).expect("known entities");
    assert!(arena.defense_state(player).is_some_and(DefenseState::has_counter_buff));

    let wasted = arena.player_strike(player, corpse, 10.0).expect("known entities");
    assert!(wasted.is_empty());
    assert!(arena.defense_state(player).is_some_and(DefenseState::has_counter_buff));

    let counter = arena.player_strike(player, enemy, 10.0).expect("known entities");
    assert!((hits_on(&counter, enemy)[0] - 30.0).abs() < 1e-3);
    assert!(!arena.defense_state(player).is_some_and(DefenseState::has_counter_buff));
}

#[test]
fn early_parry_takes_thirty_percent() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);

    arena.parry(player).expect("known entity");
    while arena.defense_state(player).map(DefenseState::phase) != Some(DefensePhase::Active) {
        arena.tick(DT);
    }

    let events = arena.player_strike(enemy, player, 50.0).expect("known entities");
    assert!((hits_on(&events, player)[0] - 15.0).abs() < 1e-3);
}

#[test]
fn dodge_negates_and_travels() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);

    assert!(arena.dodge(player, Vec2::Y).expect("known entity"));
    assert!(!arena.dodge(player, Vec2::Y).expect("known entity"));
    for _ in 0..10 {
        if arena.defense_state(player).is_some_and(DefenseState::is_invulnerable) {
            break;
        }
        arena.tick(DT);
    }

    let events = arena.player_strike(enemy, player, 50.0).expect("known entities");
    assert!(matches!(events.as_slice(), [CombatEvent::Negated { .. }]));

    run(&mut arena, 30);
    let y = arena.vitals(player).map_or(0.0, |v| v.position.y);
    let distance = DefensePreset::default().dodge.distance;
    assert!((y - distance).abs() < 0.5, "travelled {y}");
}

#[test]
fn block_only_covers_front() {
    let mut arena = arena();
    let (player, front) = duel(&mut arena);
    let behind = arena.spawn(Vitals::new(100.0, Vec2::new(-2.0, 0.0), 1));

    assert!(arena.block(player).expect("known entity"));
    run(&mut arena, 10);
    assert_eq!(
        arena.defense_state(player).map(DefenseState::phase),
        Some(DefensePhase::Active)
    );

    let blocked = arena.player_strike(front, player, 10.0).expect("known entities");
    assert!((hits_on(&blocked, player)[0] - 3.0).abs() < 1e-3);

    let unblocked = arena.player_strike(behind, player, 10.0).expect("known entities");
    assert!((hits_on(&unblocked, player)[0] - 10.0).abs() < 1e-3);

    assert!(arena.cancel_block(player).expect("known entity"));
}

#[test]
fn overkill_gibs_and_resets_telegraph() {
    let mut arena = arena();
    let player = arena.spawn(Vitals::new(100.0, Vec2::ZERO, 0));
    let enemy = arena.spawn(Vitals::new(10.0, Vec2::new(2.0, 0.0), 1));

    arena.attack(enemy, Vec2::ZERO).expect("known entity");
    let events = arena.player_strike(player, enemy, 100.0).expect("known entities");
    assert!(events.contains(&CombatEvent::Killed {
        attacker: player,
        target: enemy
    }));
    assert!(events.contains(&CombatEvent::Gibbed { target: enemy }));
    assert_eq!(
        arena.telegraph_state(enemy).map(TelegraphState::phase),
        Some(TelegraphPhase::Inactive)
    );
    assert!(!arena.attack(enemy, Vec2::ZERO).expect("known entity"));
    assert_eq!(arena.alive_on_team(1), 0);

    let later = run(&mut arena, 60);
    assert!(hits_on(&later, player).is_empty());
}

#[test]
fn light_kill_does_not_gib() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);
    let events = arena.player_strike(player, enemy, 110.0).expect("known entities");
    assert!(events.iter().any(|e| matches!(e, CombatEvent::Killed { .. })));
    assert!(!events.iter().any(|e| matches!(e, CombatEvent::Gibbed { .. })));
}

#[test]
fn combo_scales_outgoing_damage() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);

    assert!(arena.start_combo(player, WeaponType::Sword).expect("known entity"));
    assert!(!arena.start_combo(player, WeaponType::Sword).expect("known entity"));
    let started = arena.tick(DT);
    assert!(started.iter().any(|e| matches!(
        e,
        CombatEvent::Combo {
            event: ComboEvent::Started { .. },
            ..
        }
    )));

    assert!(arena.buffer_combo(player).expect("known entity"));
    let events = run(&mut arena, 12);
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::Combo {
            event: ComboEvent::Advanced { step: 1, .. },
            ..
        }
    )));

    let multiplier = arena.combo_multipliers(player).damage;
    assert!(multiplier > 1.0);
    let hit = arena.player_strike(player, enemy, 10.0).expect("known entities");
    assert!((hits_on(&hit, enemy)[0] - 10.0 * multiplier).abs() < 1e-3);
    assert_eq!(arena.combo_state(player).map(|c| c.hits), Some(1));

    let lapse = run(&mut arena, 120);
    assert!(lapse.iter().any(|e| matches!(
        e,
        CombatEvent::Combo {
            event: ComboEvent::Broken { reached: 2 },
            ..
        }
    )));
    assert_eq!(arena.combo_multipliers(player), ComboMultipliers::IDENTITY);
}

#[test]
fn unknown_entities_are_errors() {
    let mut arena = arena();
    let ghost = EntityId::from_raw(u64::MAX);
    assert!(matches!(arena.parry(ghost), Err(CombatError::UnknownEntity(id)) if id == ghost));
    assert!(arena.attack(ghost, Vec2::ZERO).is_err());
    assert!(arena.player_strike(ghost, ghost, 1.0).is_err());
}

#[test]
fn grid_is_shared_across_threads() {
    let mut arena = arena();
    let (player, enemy) = duel(&mut arena);
    arena.tick(DT);

    let grid = arena.grid();
    std::thread::scope(|scope| {
        let near = scope.spawn(|| grid.query(0.0, 0.0, 0.1));
        let far = scope.spawn(|| grid.query(2.0, 0.0, 0.1));
        assert_eq!(near.join().expect("query thread"), vec![player]);
        assert_eq!(far.join().expect("query thread"), vec![enemy]);
    });
}
