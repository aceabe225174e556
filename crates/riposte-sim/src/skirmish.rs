//! Scripted skirmish: one player against a ring of enemies.
//!
//! Enemies walk in and telegraph attacks. The player reacts to windups with
//! a parry, falling back to a block or a dodge, and answers with combos.

use crate::config::{ScenarioConfig, SimConfig};
use crate::timing::FixedStep;
use anyhow::{Context, Result};
use riposte_combat::prelude::*;
use riposte_common::{direction_between, from_heading, heading, normalize_angle, EntityId, Vec2};
use serde::Serialize;
use std::f32::consts::{PI, TAU};
use tracing::{debug, info};

const PLAYER_TEAM: Team = 0;
const ENEMY_TEAM: Team = 1;

/// Longest random pause before an enemy telegraphs.
const MAX_ENEMY_HESITATION: f32 = 1.5;

// ============================================================================
// Report
// ============================================================================

/// How the skirmish ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every enemy died.
    Victory,
    /// The player died.
    Defeat,
    /// Time ran out.
    #[default]
    Timeout,
}

/// Tally of a finished skirmish.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// How it ended.
    pub outcome: Outcome,
    /// Combat ticks run.
    pub ticks: u64,
    /// Simulated seconds.
    pub sim_seconds: f32,
    /// Player health at the end.
    pub player_health: f32,
    /// Enemies still standing.
    pub enemies_alive: usize,
    /// Health damage dealt by the player.
    pub damage_dealt: f32,
    /// Health damage taken by the player.
    pub damage_taken: f32,
    /// Player hits that landed.
    pub hits_dealt: u32,
    /// Enemy hits that landed on the player.
    pub hits_taken: u32,
    /// Enemy hits the player negated.
    pub negated: u32,
    /// Enemies staggered by the player.
    pub staggers: u32,
    /// Enemies killed by the player.
    pub kills: u32,
    /// Bodies gibbed.
    pub gibs: u32,
    /// Player combos started.
    pub combos_started: u32,
    /// Player combos finished.
    pub combos_completed: u32,
    /// Player combos that lapsed or were interrupted.
    pub combos_broken: u32,
    /// Most combo steps the player reached.
    pub best_combo: usize,
    /// Frames whose backlog the clock discarded.
    pub dropped_frames: u32,
}

impl Report {
    /// Folds a batch of events into the tally.
    pub fn record(&mut self, player: EntityId, events: &[CombatEvent]) {
        for event in events {
            match *event {
                CombatEvent::Hit {
                    target,
                    health_damage,
                    ..
                } if target == player => {
                    self.hits_taken += 1;
                    self.damage_taken += health_damage;
                },
                CombatEvent::Hit {
                    attacker,
                    health_damage,
                    ..
                } if attacker == player => {
                    self.hits_dealt += 1;
                    self.damage_dealt += health_damage;
                },
                CombatEvent::Negated { target, .. } if target == player => self.negated += 1,
                CombatEvent::Staggered { attacker, .. } if attacker == player => self.staggers += 1,
                CombatEvent::Killed { attacker, .. } if attacker == player => self.kills += 1,
                CombatEvent::Gibbed { .. } => self.gibs += 1,
                CombatEvent::Combo { entity, event } if entity == player => match event {
                    ComboEvent::Started { .. } => self.combos_started += 1,
                    ComboEvent::Completed { .. } => self.combos_completed += 1,
                    ComboEvent::Broken { .. } => self.combos_broken += 1,
                    ComboEvent::Advanced { .. } | ComboEvent::Reset => {},
                },
                _ => {},
            }
        }
    }
}

// ============================================================================
// Skirmish
// ============================================================================

/// A running skirmish.
#[derive(Debug)]
pub struct Skirmish {
    arena: CombatArena,
    scenario: ScenarioConfig,
    player: EntityId,
    enemies: Vec<EntityId>,
    hesitation: Vec<f32>,
    strike_ready: bool,
    rng: fastrand::Rng,
    report: Report,
}

impl Skirmish {
    /// Builds the arena, loading RON catalog overrides, and spawns everyone.
    pub fn new(config: &SimConfig) -> Result<Self> {
        let combat = config.combat.clone();
        let defense = DefenseMachine::from_config(&combat);
        let telegraph = match &config.pattern_catalog {
            Some(path) => TelegraphMachine::new(
                PatternCatalog::load(path)
                    .with_context(|| format!("loading pattern catalog {}", path.display()))?,
            ),
            None => TelegraphMachine::from_config(&combat),
        };
        let combo = match &config.combo_catalog {
            Some(path) => ComboTracker::new(
                ComboCatalog::load(path)
                    .with_context(|| format!("loading combo catalog {}", path.display()))?,
            ),
            None => ComboTracker::from_config(&combat),
        };
        let mut rng = combat
            .rng_seed
            .map_or_else(fastrand::Rng::new, |seed| fastrand::Rng::with_seed(seed ^ 0x5eed));
        let mut arena = CombatArena::with_machines(combat, defense, telegraph, combo)
            .context("building combat arena")?;

        let scenario = config.scenario.clone();
        let player = arena.spawn(
            Vitals::new(scenario.player_health, Vec2::ZERO, PLAYER_TEAM)
                .with_armor(scenario.player_armor),
        );

        let count = scenario.enemies.max(1);
        let mut enemies = Vec::with_capacity(count as usize);
        for i in 0..count {
            let angle = TAU * i as f32 / count as f32;
            let position = from_heading(angle) * scenario.spawn_radius;
            enemies.push(arena.spawn(
                Vitals::new(scenario.enemy_health, position, ENEMY_TEAM)
                    .with_facing(normalize_angle(angle + PI)),
            ));
        }

        let hesitation = (0..count)
            .map(|_| rng.f32() * MAX_ENEMY_HESITATION)
            .collect();
        info!(enemies = count, genre = %arena.config().genre(), "skirmish ready");

        Ok(Self {
            arena,
            scenario,
            player,
            enemies,
            hesitation,
            strike_ready: false,
            rng,
            report: Report::default(),
        })
    }

    /// The arena being driven.
    #[must_use]
    pub fn arena(&self) -> &CombatArena {
        &self.arena
    }

    /// The player entity.
    #[must_use]
    pub fn player(&self) -> EntityId {
        self.player
    }

    /// Whether the player or every enemy is dead.
    #[must_use]
    pub fn is_over(&self) -> bool {
        !self.player_alive() || self.arena.alive_on_team(ENEMY_TEAM) == 0
    }

    /// Runs frames through the fixed-step clock until the skirmish ends.
    pub fn run(mut self) -> Result<Report> {
        let mut clock = FixedStep::new(self.arena.config().tick_rate);
        let frame_dt = self.scenario.frame_dt;
        let mut elapsed = 0.0;

        while elapsed < self.scenario.duration_secs && !self.is_over() {
            elapsed += frame_dt;
            for _ in 0..clock.accumulate(frame_dt) {
                self.step(clock.fixed_dt())?;
                if self.is_over() {
                    break;
                }
            }
        }

        Ok(self.finish(clock.dropped()))
    }

    /// Runs one combat tick with both sides acting first.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        self.drive_enemies(dt)?;
        let mut events = self.drive_player()?;
        events.extend(self.arena.tick(dt));

        for event in &events {
            if let CombatEvent::Combo { entity, event } = event {
                if *entity == self.player {
                    debug!(?event, "player combo");
                    if matches!(event, ComboEvent::Started { .. } | ComboEvent::Advanced { .. }) {
                        self.strike_ready = true;
                    }
                }
            }
        }
        self.report.record(self.player, &events);
        Ok(())
    }

    fn finish(mut self, dropped_frames: u32) -> Report {
        let ticks = self.arena.ticks();
        let player_alive = self.player_alive();
        let report = &mut self.report;
        report.ticks = ticks;
        report.sim_seconds = ticks as f32 * self.arena.config().tick_dt();
        report.player_health = self.arena.vitals(self.player).map_or(0.0, |v| v.health);
        report.enemies_alive = self.arena.alive_on_team(ENEMY_TEAM);
        report.best_combo = self.arena.combo_state(self.player).map_or(0, ComboState::best_step);
        report.dropped_frames = dropped_frames;
        report.outcome = if !player_alive {
            Outcome::Defeat
        } else if report.enemies_alive == 0 {
            Outcome::Victory
        } else {
            Outcome::Timeout
        };
        info!(
            outcome = ?report.outcome,
            ticks,
            kills = report.kills,
            damage_dealt = report.damage_dealt,
            damage_taken = report.damage_taken,
            "skirmish finished"
        );
        self.report
    }

    fn player_alive(&self) -> bool {
        self.arena.vitals(self.player).is_some_and(Vitals::is_alive)
    }

    fn player_position(&self) -> Vec2 {
        self.arena.vitals(self.player).map_or(Vec2::ZERO, |v| v.position)
    }

    fn hesitate(&mut self) -> f32 {
        self.rng.f32() * MAX_ENEMY_HESITATION
    }

    // ------------------------------------------------------------------
    // Enemies
    // ------------------------------------------------------------------

    fn drive_enemies(&mut self, dt: f32) -> Result<()> {
        if !self.player_alive() {
            return Ok(());
        }
        let target = self.player_position();

        for i in 0..self.enemies.len() {
            let id = self.enemies[i];
            let attacking = self
                .arena
                .telegraph_state(id)
                .is_some_and(TelegraphState::is_attacking);
            let Some(vitals) = self.arena.vitals_mut(id).filter(|v| v.is_alive()) else {
                continue;
            };

            let offset = target - vitals.position;
            if offset.length_squared() > f32::EPSILON {
                vitals.facing = heading(offset);
            }
            if attacking {
                continue;
            }
            if offset.length() > self.scenario.enemy_stop_distance {
                vitals.position += direction_between(vitals.position, target)
                    * self.scenario.enemy_speed
                    * dt;
            }

            self.hesitation[i] -= dt;
            if self.hesitation[i] <= 0.0 && self.arena.attack(id, target)? {
                self.hesitation[i] = self.hesitate();
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Player
    // ------------------------------------------------------------------

    /// Nearest living enemy and its distance.
    fn nearest_enemy(&self) -> Option<(EntityId, f32)> {
        let origin = self.player_position();
        self.enemies
            .iter()
            .filter_map(|&id| {
                let v = self.arena.vitals(id).filter(|v| v.is_alive())?;
                Some((id, origin.distance(v.position)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Enemy whose windup is about to cover the player.
    fn incoming_threat(&self) -> Option<Vec2> {
        let position = self.player_position();
        self.enemies.iter().find_map(|&id| {
            let vitals = self.arena.vitals(id).filter(|v| v.is_alive())?;
            let state = self.arena.telegraph_state(id)?;
            let pattern = state.pattern()?;
            let imminent = state.phase() == TelegraphPhase::Windup
                && state.progress() >= self.scenario.reaction_progress;
            (imminent && pattern.contains(vitals.position, state.direction(), position))
                .then_some(vitals.position)
        })
    }

    fn drive_player(&mut self) -> Result<Vec<CombatEvent>> {
        let mut events = Vec::new();
        let player = self.player;
        let Some(me) = self.arena.vitals(player).copied().filter(Vitals::is_alive) else {
            return Ok(events);
        };

        let nearest = self.nearest_enemy();
        if let Some((enemy, _)) = nearest {
            if let Some(v) = self.arena.vitals(enemy) {
                let facing = heading(v.position - me.position);
                if let Some(vitals) = self.arena.vitals_mut(player) {
                    vitals.facing = facing;
                }
            }
        }

        if let Some(source) = self.incoming_threat() {
            self.defend(source, me)?;
        } else if self
            .arena
            .defense_state(player)
            .is_some_and(|d| d.maneuver() == Maneuver::Block && d.phase() == DefensePhase::Active)
        {
            self.arena.cancel_block(player)?;
        }

        let Some((enemy, distance)) = nearest else {
            return Ok(events);
        };
        if distance > self.scenario.reach {
            return Ok(events);
        }

        let combo_active = self.arena.combo_state(player).is_some_and(ComboState::is_active);
        if !combo_active {
            self.strike_ready = false;
            self.arena.start_combo(player, self.scenario.weapon)?;
        } else if self.strike_ready {
            self.strike_ready = false;
            events.extend(
                self.arena
                    .player_strike(player, enemy, self.scenario.strike_damage)?,
            );
            self.arena.buffer_combo(player)?;
        }
        Ok(events)
    }

    /// Parry first, then block, then dodge away.
    fn defend(&mut self, source: Vec2, me: Vitals) -> Result<()> {
        let player = self.player;
        if self.arena.defense_state(player).is_some_and(DefenseState::is_busy) {
            return Ok(());
        }
        let away = direction_between(source, me.position);
        if me.health_fraction() < self.scenario.dodge_below {
            self.arena.dodge(player, away)?;
            return Ok(());
        }
        if !self.arena.parry(player)? && !self.arena.block(player)? {
            self.arena.dodge(player, away)?;
        }
        Ok(())
    }
}
