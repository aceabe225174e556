//! Defensive maneuvers: dodge, parry and block.
//!
//! Each maneuver runs Inactive → Windup → Active → Recovery → Inactive.
//! Only the first step is caller-triggered; the rest are timed and driven by
//! [`DefenseMachine::update`].
//!
//! - Dodge: invulnerable while Active, one-shot movement impulse on entry
//! - Parry: perfect window at the tail of Active negates and grants a counter
//! - Block: held while Active, reduces frontal damage, drains stamina

use crate::config::CombatConfig;
use crate::genre::Genre;
use crate::phase::{PhaseStep, TimedPhase, Transition};
use riposte_common::{angle_difference, from_heading, Vec2};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::{debug, trace};

// ============================================================================
// Maneuvers and phases
// ============================================================================

/// Defensive maneuver in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Maneuver {
    /// Nothing in progress.
    #[default]
    None,
    /// Evasive roll with i-frames.
    Dodge,
    /// Timed deflection.
    Parry,
    /// Held guard.
    Block,
}

/// Phase of a defensive maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DefensePhase {
    /// Ready for a new maneuver.
    #[default]
    Inactive,
    /// Startup frames.
    Windup,
    /// Maneuver is effective.
    Active,
    /// Grace period before the cooldown starts.
    Recovery,
}

// ============================================================================
// Presets
// ============================================================================

/// Dodge tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DodgeTuning {
    /// Windup seconds.
    pub windup: f32,
    /// Invulnerable Active seconds.
    pub iframes: f32,
    /// Recovery seconds.
    pub recovery: f32,
    /// Cooldown seconds, starting when Recovery ends.
    pub cooldown: f32,
    /// Stamina deducted on trigger.
    pub stamina_cost: f32,
    /// Distance covered during the i-frames.
    pub distance: f32,
}

/// Parry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParryTuning {
    /// Windup seconds.
    pub windup: f32,
    /// Active seconds.
    pub active: f32,
    /// Recovery seconds.
    pub recovery: f32,
    /// Cooldown seconds.
    pub cooldown: f32,
    /// Stamina deducted on trigger.
    pub stamina_cost: f32,
    /// Trailing seconds of Active that count as a perfect parry.
    pub perfect_window: f32,
    /// Fraction of damage that still lands on an imperfect parry.
    pub damage_taken: f32,
    /// Damage multiplier of the counter buff.
    pub counter_multiplier: f32,
    /// Lifetime of the counter buff.
    pub counter_duration: f32,
    /// Lifetime of the backstab window.
    pub backstab_duration: f32,
}

/// Block tuning. Active has no duration: it lasts until cancelled or out of
/// stamina.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockTuning {
    /// Windup seconds.
    pub windup: f32,
    /// Recovery seconds.
    pub recovery: f32,
    /// Cooldown seconds.
    pub cooldown: f32,
    /// Stamina deducted on trigger.
    pub stamina_cost: f32,
    /// Fraction of damage removed inside the arc.
    pub reduction: f32,
    /// Full width of the guarded arc in radians.
    pub arc: f32,
    /// Stamina drained per second while Active.
    pub drain_per_second: f32,
}

/// Per-genre stamina and maneuver numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefensePreset {
    /// Stamina pool size.
    pub max_stamina: f32,
    /// Stamina regained per second while not blocking.
    pub stamina_regen: f32,
    /// Dodge numbers.
    pub dodge: DodgeTuning,
    /// Parry numbers.
    pub parry: ParryTuning,
    /// Block numbers.
    pub block: BlockTuning,
}

impl Default for DefensePreset {
    fn default() -> Self {
        Self::for_genre(Genre::Fantasy)
    }
}

impl DefensePreset {
    /// Static preset table.
    #[must_use]
    pub fn for_genre(genre: Genre) -> Self {
        let base = Self {
            max_stamina: 100.0,
            stamina_regen: 20.0,
            dodge: DodgeTuning {
                windup: 0.05,
                iframes: 0.25,
                recovery: 0.15,
                cooldown: 0.6,
                stamina_cost: 20.0,
                distance: 3.0,
            },
            parry: ParryTuning {
                windup: 0.05,
                active: 0.3,
                recovery: 0.25,
                cooldown: 0.8,
                stamina_cost: 15.0,
                perfect_window: 0.1,
                damage_taken: 0.3,
                counter_multiplier: 1.5,
                counter_duration: 2.0,
                backstab_duration: 1.5,
            },
            block: BlockTuning {
                windup: 0.1,
                recovery: 0.2,
                cooldown: 0.3,
                stamina_cost: 5.0,
                reduction: 0.7,
                arc: PI * 2.0 / 3.0,
                drain_per_second: 10.0,
            },
        };

        match genre {
            Genre::Fantasy => base,
            Genre::SciFi => Self {
                max_stamina: 120.0,
                stamina_regen: 25.0,
                dodge: DodgeTuning {
                    distance: 4.0,
                    cooldown: 0.5,
                    ..base.dodge
                },
                block: BlockTuning {
                    reduction: 0.8,
                    arc: PI * 5.0 / 6.0,
                    drain_per_second: 15.0,
                    ..base.block
                },
                ..base
            },
            Genre::Horror => Self {
                max_stamina: 80.0,
                stamina_regen: 12.0,
                dodge: DodgeTuning {
                    iframes: 0.2,
                    cooldown: 0.9,
                    stamina_cost: 25.0,
                    ..base.dodge
                },
                parry: ParryTuning {
                    perfect_window: 0.08,
                    ..base.parry
                },
                ..base
            },
            Genre::Cyberpunk => Self {
                stamina_regen: 30.0,
                dodge: DodgeTuning {
                    windup: 0.03,
                    iframes: 0.2,
                    cooldown: 0.4,
                    distance: 4.5,
                    ..base.dodge
                },
                parry: ParryTuning {
                    counter_multiplier: 1.75,
                    ..base.parry
                },
                ..base
            },
            Genre::PostApocalyptic => Self {
                max_stamina: 90.0,
                stamina_regen: 15.0,
                block: BlockTuning {
                    reduction: 0.6,
                    drain_per_second: 8.0,
                    ..base.block
                },
                parry: ParryTuning {
                    damage_taken: 0.4,
                    counter_multiplier: 2.0,
                    ..base.parry
                },
                ..base
            },
        }
    }

    fn stamina_cost(&self, maneuver: Maneuver) -> f32 {
        match maneuver {
            Maneuver::None => 0.0,
            Maneuver::Dodge => self.dodge.stamina_cost,
            Maneuver::Parry => self.parry.stamina_cost,
            Maneuver::Block => self.block.stamina_cost,
        }
    }

    fn windup(&self, maneuver: Maneuver) -> f32 {
        match maneuver {
            Maneuver::None => 0.0,
            Maneuver::Dodge => self.dodge.windup,
            Maneuver::Parry => self.parry.windup,
            Maneuver::Block => self.block.windup,
        }
    }

    fn recovery(&self, maneuver: Maneuver) -> f32 {
        match maneuver {
            Maneuver::None => 0.0,
            Maneuver::Dodge => self.dodge.recovery,
            Maneuver::Parry => self.parry.recovery,
            Maneuver::Block => self.block.recovery,
        }
    }

    fn cooldown(&self, maneuver: Maneuver) -> f32 {
        match maneuver {
            Maneuver::None => 0.0,
            Maneuver::Dodge => self.dodge.cooldown,
            Maneuver::Parry => self.parry.cooldown,
            Maneuver::Block => self.block.cooldown,
        }
    }
}

// ============================================================================
// Per-entity state
// ============================================================================

/// Per-maneuver cooldown timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldowns {
    /// Dodge seconds left.
    pub dodge: f32,
    /// Parry seconds left.
    pub parry: f32,
    /// Block seconds left.
    pub block: f32,
}

impl Cooldowns {
    /// Seconds left for a maneuver.
    #[must_use]
    pub fn get(&self, maneuver: Maneuver) -> f32 {
        match maneuver {
            Maneuver::None => 0.0,
            Maneuver::Dodge => self.dodge,
            Maneuver::Parry => self.parry,
            Maneuver::Block => self.block,
        }
    }

    fn set(&mut self, maneuver: Maneuver, seconds: f32) {
        match maneuver {
            Maneuver::None => {},
            Maneuver::Dodge => self.dodge = seconds,
            Maneuver::Parry => self.parry = seconds,
            Maneuver::Block => self.block = seconds,
        }
    }

    fn tick(&mut self, dt: f32) {
        self.dodge = (self.dodge - dt).max(0.0);
        self.parry = (self.parry - dt).max(0.0);
        self.block = (self.block - dt).max(0.0);
    }
}

/// Defense state owned by one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseState {
    maneuver: Maneuver,
    phase: TimedPhase<DefensePhase>,
    /// Current stamina.
    pub stamina: f32,
    /// Stamina pool size.
    pub max_stamina: f32,
    /// Stamina regained per second while not blocking.
    pub stamina_regen: f32,
    cooldowns: Cooldowns,
    counter_multiplier: f32,
    counter_timer: f32,
    backstab_timer: f32,
    /// Facing angle in radians, used for a directionless dodge.
    pub facing: f32,
    dodge_direction: Vec2,
    dodge_impulse: Option<Vec2>,
}

impl DefenseState {
    /// Creates a rested state with a full stamina pool.
    #[must_use]
    pub fn new(preset: &DefensePreset) -> Self {
        Self {
            maneuver: Maneuver::None,
            phase: TimedPhase::held(DefensePhase::Inactive),
            stamina: preset.max_stamina,
            max_stamina: preset.max_stamina,
            stamina_regen: preset.stamina_regen,
            cooldowns: Cooldowns::default(),
            counter_multiplier: 1.0,
            counter_timer: 0.0,
            backstab_timer: 0.0,
            facing: 0.0,
            dodge_direction: Vec2::ZERO,
            dodge_impulse: None,
        }
    }

    /// Maneuver in progress.
    #[must_use]
    pub fn maneuver(&self) -> Maneuver {
        self.maneuver
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> DefensePhase {
        self.phase.phase()
    }

    /// Progress through the current phase, or `-1.0` when inactive.
    ///
    /// A held block reports `1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.phase() == DefensePhase::Inactive {
            -1.0
        } else {
            self.phase.progress()
        }
    }

    /// Seconds left in the current timed phase.
    #[must_use]
    pub fn phase_remaining(&self) -> f32 {
        self.phase.remaining()
    }

    /// Whether incoming damage is ignored (dodge i-frames).
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.maneuver == Maneuver::Dodge && self.phase() == DefensePhase::Active
    }

    /// Whether a maneuver is in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.maneuver != Maneuver::None
    }

    /// Cooldown timers.
    #[must_use]
    pub fn cooldowns(&self) -> Cooldowns {
        self.cooldowns
    }

    /// Whether a perfect-parry counter buff is pending.
    #[must_use]
    pub fn has_counter_buff(&self) -> bool {
        self.counter_timer > 0.0
    }

    /// Whether the backstab bonus window is open.
    #[must_use]
    pub fn is_backstab_window(&self) -> bool {
        self.backstab_timer > 0.0
    }
}

// ============================================================================
// Machine
// ============================================================================

/// Stateless driver for [`DefenseState`]s sharing one preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefenseMachine {
    preset: DefensePreset,
}

impl DefenseMachine {
    /// Creates a machine for a preset.
    #[must_use]
    pub fn new(preset: DefensePreset) -> Self {
        Self { preset }
    }

    /// Creates a machine for the configured genre.
    #[must_use]
    pub fn from_config(config: &CombatConfig) -> Self {
        Self::new(DefensePreset::for_genre(config.genre()))
    }

    /// Active preset.
    #[must_use]
    pub fn preset(&self) -> &DefensePreset {
        &self.preset
    }

    /// Fresh state for a newly spawned entity.
    #[must_use]
    pub fn spawn_state(&self) -> DefenseState {
        DefenseState::new(&self.preset)
    }

    fn try_start(&self, state: &mut DefenseState, maneuver: Maneuver) -> bool {
        if state.is_busy() {
            return false;
        }
        if state.cooldowns.get(maneuver) > 0.0 {
            return false;
        }
        let cost = self.preset.stamina_cost(maneuver);
        if state.stamina < cost {
            return false;
        }

        state.stamina -= cost;
        state.maneuver = maneuver;
        state.phase.enter(DefensePhase::Windup, self.preset.windup(maneuver));
        debug!(?maneuver, stamina = state.stamina, "maneuver started");
        true
    }

    /// Starts a dodge towards `direction`.
    ///
    /// A zero direction dodges backwards relative to the state's facing.
    pub fn initiate_dodge(&self, state: &mut DefenseState, direction: Vec2) -> bool {
        if !self.try_start(state, Maneuver::Dodge) {
            return false;
        }
        state.dodge_direction = direction
            .try_normalize()
            .unwrap_or_else(|| from_heading(state.facing + PI));
        state.dodge_impulse = None;
        true
    }

    /// Starts a parry.
    pub fn initiate_parry(&self, state: &mut DefenseState) -> bool {
        self.try_start(state, Maneuver::Parry)
    }

    /// Raises a block.
    pub fn initiate_block(&self, state: &mut DefenseState) -> bool {
        self.try_start(state, Maneuver::Block)
    }

    /// Lowers a block, forcing Recovery.
    ///
    /// Returns `false` when no block is raised or it is already recovering.
    pub fn cancel_block(&self, state: &mut DefenseState) -> bool {
        if state.maneuver != Maneuver::Block
            || !matches!(state.phase(), DefensePhase::Windup | DefensePhase::Active)
        {
            return false;
        }
        state.phase.enter(DefensePhase::Recovery, self.preset.block.recovery);
        true
    }

    fn next_phase(&self, maneuver: Maneuver, phase: DefensePhase) -> PhaseStep<DefensePhase> {
        match (phase, maneuver) {
            (DefensePhase::Windup, Maneuver::Dodge) => {
                PhaseStep::Timed(DefensePhase::Active, self.preset.dodge.iframes)
            },
            (DefensePhase::Windup, Maneuver::Parry) => {
                PhaseStep::Timed(DefensePhase::Active, self.preset.parry.active)
            },
            (DefensePhase::Windup, Maneuver::Block) => PhaseStep::Held(DefensePhase::Active),
            (DefensePhase::Active, m) => {
                PhaseStep::Timed(DefensePhase::Recovery, self.preset.recovery(m))
            },
            _ => PhaseStep::Held(DefensePhase::Inactive),
        }
    }

    fn on_transition(&self, state: &mut DefenseState, transition: Transition<DefensePhase>) {
        match transition.to {
            DefensePhase::Active if state.maneuver == Maneuver::Dodge => {
                let iframes = self.preset.dodge.iframes;
                let speed = if iframes > 0.0 {
                    self.preset.dodge.distance / iframes
                } else {
                    self.preset.dodge.distance
                };
                state.dodge_impulse = Some(state.dodge_direction * speed);
            },
            DefensePhase::Inactive => {
                let maneuver = state.maneuver;
                state.cooldowns.set(maneuver, self.preset.cooldown(maneuver));
                state.maneuver = Maneuver::None;
                trace!(?maneuver, "maneuver finished");
            },
            _ => {},
        }
    }

    /// Advances timers, cooldowns, stamina and buffs by `dt` seconds.
    pub fn update(&self, state: &mut DefenseState, dt: f32) {
        let dt = dt.max(0.0);

        state.cooldowns.tick(dt);
        state.counter_timer = (state.counter_timer - dt).max(0.0);
        if state.counter_timer <= 0.0 {
            state.counter_multiplier = 1.0;
        }
        state.backstab_timer = (state.backstab_timer - dt).max(0.0);

        let maneuver = state.maneuver;
        if let Some(transition) = state.phase.advance(dt, |p| self.next_phase(maneuver, p)) {
            self.on_transition(state, transition);
        }

        if state.maneuver == Maneuver::Block && state.phase() == DefensePhase::Active {
            state.stamina -= self.preset.block.drain_per_second * dt;
            if state.stamina <= 0.0 {
                state.stamina = 0.0;
                state.phase.enter(DefensePhase::Recovery, self.preset.block.recovery);
                debug!("block broken, out of stamina");
            }
        } else {
            state.stamina = (state.stamina + state.stamina_regen * dt).min(state.max_stamina);
        }
    }

    /// Whether a parry is inside its perfect window.
    #[must_use]
    pub fn is_perfect_parry(&self, state: &DefenseState) -> bool {
        state.maneuver == Maneuver::Parry
            && state.phase() == DefensePhase::Active
            && state.phase.remaining() <= self.preset.parry.perfect_window
    }

    /// Routes incoming damage through the defense.
    ///
    /// Returns the damage that lands and whether the hit was negated.
    /// Priority is invulnerability, then parry, then block.
    pub fn process_incoming_damage(
        &self,
        state: &mut DefenseState,
        damage: f32,
        attacker_angle: f32,
        defender_facing: f32,
    ) -> (f32, bool) {
        if state.is_invulnerable() {
            trace!(damage, "dodged");
            return (0.0, true);
        }

        if state.maneuver == Maneuver::Parry && state.phase() == DefensePhase::Active {
            if self.is_perfect_parry(state) {
                let parry = &self.preset.parry;
                state.counter_multiplier = parry.counter_multiplier;
                state.counter_timer = parry.counter_duration;
                state.backstab_timer = parry.backstab_duration;
                debug!(damage, "perfect parry");
                return (0.0, true);
            }
            return (damage * self.preset.parry.damage_taken, false);
        }

        if state.maneuver == Maneuver::Block && state.phase() == DefensePhase::Active {
            let offset = angle_difference(attacker_angle, defender_facing).abs();
            if offset <= self.preset.block.arc / 2.0 {
                return (damage * (1.0 - self.preset.block.reduction), false);
            }
        }

        (damage, false)
    }

    /// Consumes the counter buff, returning its multiplier or `1.0`.
    pub fn take_counter_multiplier(&self, state: &mut DefenseState) -> f32 {
        let multiplier = self.counter_multiplier(state);
        state.counter_multiplier = 1.0;
        state.counter_timer = 0.0;
        multiplier
    }

    /// Perfect-parry counter multiplier without consuming it.
    #[must_use]
    pub fn counter_multiplier(&self, state: &DefenseState) -> f32 {
        if state.counter_timer <= 0.0 {
            return 1.0;
        }
        state.counter_multiplier
    }

    /// Whether the backstab bonus window is open.
    #[must_use]
    pub fn is_backstab_window(&self, state: &DefenseState) -> bool {
        state.is_backstab_window()
    }

    /// Takes the dodge impulse set when the dodge became Active.
    pub fn take_dodge_impulse(&self, state: &mut DefenseState) -> Option<Vec2> {
        state.dodge_impulse.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn setup() -> (DefenseMachine, DefenseState) {
        let machine = DefenseMachine::default();
        let state = machine.spawn_state();
        (machine, state)
    }

    /// Steps through Windup into Active.
    fn activate(machine: &DefenseMachine, state: &mut DefenseState) {
        let windup = state.phase_remaining();
        machine.update(state, windup);
        assert_eq!(state.phase(), DefensePhase::Active);
    }

    #[test]
    fn test_dodge_enters_windup_and_deducts_stamina() {
        let (machine, mut state) = setup();
        assert!(machine.initiate_dodge(&mut state, Vec2::X));
        assert_eq!(state.maneuver(), Maneuver::Dodge);
        assert_eq!(state.phase(), DefensePhase::Windup);
        assert!((state.stamina - 80.0).abs() < EPS);
    }

    #[test]
    fn test_dodge_retrigger_fails() {
        let (machine, mut state) = setup();
        assert!(machine.initiate_dodge(&mut state, Vec2::X));
        assert!(!machine.initiate_dodge(&mut state, Vec2::X));
        activate(&machine, &mut state);
        assert!(!machine.initiate_dodge(&mut state, Vec2::X));
        assert!(!machine.initiate_parry(&mut state));
    }

    #[test]
    fn test_dodge_impulse_scaled_to_iframes() {
        let (machine, mut state) = setup();
        machine.initiate_dodge(&mut state, Vec2::new(3.0, 4.0));
        assert!(machine.take_dodge_impulse(&mut state).is_none());

        activate(&machine, &mut state);
        let impulse = machine.take_dodge_impulse(&mut state).expect("impulse on Active");
        let dodge = machine.preset().dodge;
        assert!((impulse.length() - dodge.distance / dodge.iframes).abs() < EPS);
        assert!((impulse.normalize() - Vec2::new(0.6, 0.8)).length() < EPS);
        assert!(machine.take_dodge_impulse(&mut state).is_none());
    }

    #[test]
    fn test_zero_direction_dodges_backwards() {
        let (machine, mut state) = setup();
        state.facing = 0.0;
        machine.initiate_dodge(&mut state, Vec2::ZERO);
        activate(&machine, &mut state);
        let impulse = machine.take_dodge_impulse(&mut state).expect("impulse");
        assert!(impulse.x < 0.0);
        assert!(impulse.y.abs() < EPS);
    }

    #[test]
    fn test_dodge_iframes_negate_damage() {
        let (machine, mut state) = setup();
        machine.initiate_dodge(&mut state, Vec2::Y);
        assert_eq!(machine.process_incoming_damage(&mut state, 40.0, 0.0, 0.0), (40.0, false));

        activate(&machine, &mut state);
        assert!(state.is_invulnerable());
        assert_eq!(machine.process_incoming_damage(&mut state, 40.0, 0.0, 0.0), (0.0, true));
    }

    #[test]
    fn test_full_cycle_starts_cooldown() {
        let (machine, mut state) = setup();
        let dodge = machine.preset().dodge;
        machine.initiate_dodge(&mut state, Vec2::X);

        machine.update(&mut state, dodge.windup);
        machine.update(&mut state, dodge.iframes);
        assert_eq!(state.phase(), DefensePhase::Recovery);
        machine.update(&mut state, dodge.recovery);
        assert_eq!(state.phase(), DefensePhase::Inactive);
        assert_eq!(state.maneuver(), Maneuver::None);
        assert!((state.cooldowns().dodge - dodge.cooldown).abs() < EPS);

        assert!(!machine.initiate_dodge(&mut state, Vec2::X));
        assert!(machine.initiate_parry(&mut state));
    }

    #[test]
    fn test_cooldown_expires() {
        let (machine, mut state) = setup();
        machine.initiate_dodge(&mut state, Vec2::X);
        for _ in 0..4 {
            machine.update(&mut state, 1.0);
        }
        assert_eq!(state.phase(), DefensePhase::Inactive);
        assert_eq!(state.cooldowns().dodge, 0.0);
        assert!(machine.initiate_dodge(&mut state, Vec2::X));
    }

    #[test]
    fn test_large_delta_transitions_once() {
        let (machine, mut state) = setup();
        machine.initiate_parry(&mut state);
        machine.update(&mut state, 100.0);
        assert_eq!(state.phase(), DefensePhase::Active);
        machine.update(&mut state, 100.0);
        assert_eq!(state.phase(), DefensePhase::Recovery);
    }

    #[test]
    fn test_insufficient_stamina_rejected_without_mutation() {
        let (machine, mut state) = setup();
        state.stamina = 10.0;
        let before = state.clone();
        assert!(!machine.initiate_dodge(&mut state, Vec2::X));
        assert_eq!(state, before);
    }

    #[test]
    fn test_perfect_parry_negates_and_buffs() {
        let (machine, mut state) = setup();
        let parry = machine.preset().parry;
        machine.initiate_parry(&mut state);
        activate(&machine, &mut state);

        machine.update(&mut state, parry.active - parry.perfect_window / 2.0);
        assert!(machine.is_perfect_parry(&state));
        assert_eq!(machine.process_incoming_damage(&mut state, 50.0, 0.0, 0.0), (0.0, true));
        assert!(state.has_counter_buff());
        assert!(machine.is_backstab_window(&state));

        let counter = machine.take_counter_multiplier(&mut state);
        assert!((counter - parry.counter_multiplier).abs() < EPS);
        assert_eq!(machine.take_counter_multiplier(&mut state), 1.0);
    }

    #[test]
    fn test_early_parry_takes_thirty_percent() {
        let (machine, mut state) = setup();
        machine.initiate_parry(&mut state);
        activate(&machine, &mut state);

        assert!(!machine.is_perfect_parry(&state));
        let (damage, negated) = machine.process_incoming_damage(&mut state, 100.0, 0.0, 0.0);
        assert!((damage - 30.0).abs() < EPS);
        assert!(!negated);
        assert!(!state.has_counter_buff());
    }

    #[test]
    fn test_parry_windup_offers_no_protection() {
        let (machine, mut state) = setup();
        machine.initiate_parry(&mut state);
        assert_eq!(machine.process_incoming_damage(&mut state, 100.0, 0.0, 0.0), (100.0, false));
    }

    #[test]
    fn test_backstab_window_expires() {
        let (machine, mut state) = setup();
        let parry = machine.preset().parry;
        machine.initiate_parry(&mut state);
        activate(&machine, &mut state);
        machine.update(&mut state, parry.active - 0.01);
        machine.process_incoming_damage(&mut state, 10.0, 0.0, 0.0);
        assert!(state.is_backstab_window());

        machine.update(&mut state, parry.backstab_duration + 0.01);
        assert!(!state.is_backstab_window());
        assert!(state.has_counter_buff());
        machine.update(&mut state, parry.counter_duration);
        assert!(!state.has_counter_buff());
        assert_eq!(machine.take_counter_multiplier(&mut state), 1.0);
    }

    #[test]
    fn test_block_inside_arc_only() {
        let (machine, mut state) = setup();
        let block = machine.preset().block;
        machine.initiate_block(&mut state);
        activate(&machine, &mut state);

        let facing = 0.5;
        let (front, _) = machine.process_incoming_damage(&mut state, 100.0, facing + 0.2, facing);
        assert!((front - 100.0 * (1.0 - block.reduction)).abs() < EPS);

        let edge = facing + block.arc / 2.0 - 0.01;
        let (edge_damage, _) = machine.process_incoming_damage(&mut state, 100.0, edge, facing);
        assert!(edge_damage < 100.0);

        let (behind, negated) =
            machine.process_incoming_damage(&mut state, 100.0, facing + PI, facing);
        assert_eq!(behind, 100.0);
        assert!(!negated);
    }

    #[test]
    fn test_block_arc_wraps_around_pi() {
        let (machine, mut state) = setup();
        machine.initiate_block(&mut state);
        activate(&machine, &mut state);

        let (damage, _) = machine.process_incoming_damage(&mut state, 100.0, -PI + 0.1, PI - 0.1);
        assert!(damage < 100.0);
    }

    #[test]
    fn test_block_is_held_and_drains() {
        let (machine, mut state) = setup();
        machine.initiate_block(&mut state);
        activate(&machine, &mut state);
        let start = state.stamina;

        machine.update(&mut state, 1.0);
        assert_eq!(state.phase(), DefensePhase::Active);
        assert!((start - state.stamina - machine.preset().block.drain_per_second).abs() < EPS);
        assert_eq!(state.progress(), 1.0);
    }

    #[test]
    fn test_transition_tick_still_drains_and_regenerates() {
        let (machine, mut state) = setup();
        machine.initiate_block(&mut state);
        let raised = state.stamina;
        let windup = machine.preset().block.windup;

        machine.update(&mut state, windup);
        assert_eq!(state.phase(), DefensePhase::Active);
        let drained = machine.preset().block.drain_per_second * windup;
        assert!((raised - drained - state.stamina).abs() < EPS);

        let (machine, mut state) = setup();
        machine.initiate_parry(&mut state);
        let before = state.stamina;
        let windup = machine.preset().parry.windup;
        machine.update(&mut state, windup);
        assert_eq!(state.phase(), DefensePhase::Active);
        assert!((state.stamina - before - state.stamina_regen * windup).abs() < EPS);
    }

    #[test]
    fn test_block_breaks_at_zero_stamina() {
        let (machine, mut state) = setup();
        machine.initiate_block(&mut state);
        activate(&machine, &mut state);
        state.stamina = 1.0;

        machine.update(&mut state, 0.5);
        assert_eq!(state.stamina, 0.0);
        assert_eq!(state.phase(), DefensePhase::Recovery);
    }

    #[test]
    fn test_cancel_block_forces_recovery() {
        let (machine, mut state) = setup();
        assert!(!machine.cancel_block(&mut state));
        machine.initiate_block(&mut state);
        activate(&machine, &mut state);

        assert!(machine.cancel_block(&mut state));
        assert_eq!(state.phase(), DefensePhase::Recovery);
        assert!(!machine.cancel_block(&mut state));

        machine.update(&mut state, machine.preset().block.recovery);
        assert_eq!(state.phase(), DefensePhase::Inactive);
        assert!(state.cooldowns().block > 0.0);
    }

    #[test]
    fn test_stamina_regenerates_when_idle() {
        let (machine, mut state) = setup();
        state.stamina = 50.0;
        machine.update(&mut state, 1.0);
        assert!((state.stamina - 70.0).abs() < EPS);
        machine.update(&mut state, 10.0);
        assert_eq!(state.stamina, state.max_stamina);
    }

    #[test]
    fn test_progress_reports_inactive() {
        let (machine, mut state) = setup();
        assert_eq!(state.progress(), -1.0);
        machine.initiate_parry(&mut state);
        assert!((0.0..=1.0).contains(&state.progress()));
    }

    #[test]
    fn test_genre_presets_differ() {
        let fantasy = DefensePreset::for_genre(Genre::Fantasy);
        for genre in Genre::ALL.into_iter().skip(1) {
            assert_ne!(DefensePreset::for_genre(genre), fantasy);
        }
        assert!((fantasy.parry.damage_taken - 0.3).abs() < EPS);
    }
}
