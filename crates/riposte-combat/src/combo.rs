//! Combo chains.
//!
//! A chain is an ordered list of steps. After each hit the attacker has a
//! window `[window_start, window_end]` (seconds since that hit) in which a
//! buffered follow-up input advances the chain. Letting the window lapse
//! breaks the combo; finishing the last step completes it.

use crate::catalog::RonCatalog;
use crate::config::CombatConfig;
use crate::genre::Genre;
use crate::phase::{PhaseStep, TimedPhase};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ============================================================================
// Catalog data
// ============================================================================

/// Weapon family a chain is authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeaponType {
    /// Balanced blade.
    #[default]
    Sword,
    /// Fast, short chains.
    Dagger,
    /// Slow, heavy chains.
    Hammer,
    /// Long reach.
    Spear,
    /// Fists and kicks.
    Unarmed,
}

/// Multipliers a combo applies to an outgoing attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboMultipliers {
    /// Damage multiplier.
    pub damage: f32,
    /// Attack speed multiplier.
    pub speed: f32,
    /// Reach multiplier.
    pub range: f32,
    /// Knockback multiplier.
    pub knockback: f32,
}

impl Default for ComboMultipliers {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ComboMultipliers {
    /// No modification.
    pub const IDENTITY: Self = Self {
        damage: 1.0,
        speed: 1.0,
        range: 1.0,
        knockback: 1.0,
    };
}

/// Cosmetic feedback magnitudes for a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepEffects {
    /// Screen shake strength.
    pub screen_shake: f32,
    /// Hit pause in seconds.
    pub hit_pause: f32,
}

/// One hit of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboStep {
    /// Multipliers while this step is current.
    pub multipliers: ComboMultipliers,
    /// Earliest follow-up time after this hit.
    pub window_start: f32,
    /// Latest follow-up time after this hit.
    pub window_end: f32,
    /// Chance in `[0, 1]` that this hit staggers.
    #[serde(default)]
    pub stagger_chance: f32,
    /// Feedback magnitudes.
    #[serde(default)]
    pub effects: StepEffects,
}

impl ComboStep {
    /// Creates a step with a damage multiplier and follow-up window.
    #[must_use]
    pub fn new(damage: f32, window_start: f32, window_end: f32) -> Self {
        Self {
            multipliers: ComboMultipliers {
                damage,
                ..ComboMultipliers::IDENTITY
            },
            window_start: window_start.max(0.0),
            window_end: window_end.max(window_start),
            stagger_chance: 0.0,
            effects: StepEffects::default(),
        }
    }

    /// Set speed, range and knockback multipliers.
    #[must_use]
    pub fn with_modifiers(mut self, speed: f32, range: f32, knockback: f32) -> Self {
        self.multipliers.speed = speed;
        self.multipliers.range = range;
        self.multipliers.knockback = knockback;
        self
    }

    /// Set stagger chance.
    #[must_use]
    pub fn with_stagger(mut self, chance: f32) -> Self {
        self.stagger_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Set feedback magnitudes.
    #[must_use]
    pub fn with_effects(mut self, screen_shake: f32, hit_pause: f32) -> Self {
        self.effects = StepEffects {
            screen_shake,
            hit_pause,
        };
        self
    }
}

/// Ordered steps for one weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboChain {
    /// Chain name.
    pub name: String,
    /// Weapon this chain is used with.
    pub weapon: WeaponType,
    /// Steps in order.
    pub steps: Vec<ComboStep>,
}

impl ComboChain {
    /// Creates a chain.
    #[must_use]
    pub fn new(name: impl Into<String>, weapon: WeaponType, steps: Vec<ComboStep>) -> Self {
        Self {
            name: name.into(),
            weapon,
            steps,
        }
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the chain has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// All chains available in a genre.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboCatalog {
    /// Chains in priority order.
    pub chains: Vec<ComboChain>,
}

impl RonCatalog for ComboCatalog {}

impl ComboCatalog {
    /// Creates a catalog.
    #[must_use]
    pub fn new(chains: Vec<ComboChain>) -> Self {
        Self { chains }
    }

    /// Static chain table for a genre.
    ///
    /// Every genre shares the base chains. Genres retune their windows
    /// (tempo) and damage (power) by fixed factors.
    #[must_use]
    pub fn for_genre(genre: Genre) -> Self {
        let (tempo, power) = match genre {
            Genre::Fantasy => (1.0, 1.0),
            Genre::SciFi => (0.9, 1.1),
            Genre::Horror => (1.25, 1.2),
            Genre::Cyberpunk => (0.75, 0.9),
            Genre::PostApocalyptic => (1.1, 1.15),
        };

        let chains = Self::base_chains()
            .into_iter()
            .map(|mut chain| {
                for step in &mut chain.steps {
                    step.window_start *= tempo;
                    step.window_end *= tempo;
                    step.multipliers.damage *= power;
                }
                chain
            })
            .collect();
        Self { chains }
    }

    fn base_chains() -> Vec<ComboChain> {
        vec![
            ComboChain::new(
                "sword_flurry",
                WeaponType::Sword,
                vec![
                    ComboStep::new(1.0, 0.15, 0.6).with_effects(0.1, 0.02),
                    ComboStep::new(1.2, 0.15, 0.6)
                        .with_stagger(0.1)
                        .with_effects(0.15, 0.03),
                    ComboStep::new(1.8, 0.2, 0.8)
                        .with_modifiers(0.9, 1.2, 1.5)
                        .with_stagger(0.4)
                        .with_effects(0.4, 0.08),
                ],
            ),
            ComboChain::new(
                "dagger_dance",
                WeaponType::Dagger,
                vec![
                    ComboStep::new(0.8, 0.05, 0.4).with_modifiers(1.3, 1.0, 0.5),
                    ComboStep::new(0.9, 0.05, 0.4).with_modifiers(1.4, 1.0, 0.5),
                    ComboStep::new(1.0, 0.05, 0.4).with_modifiers(1.5, 1.0, 0.5),
                    ComboStep::new(1.6, 0.1, 0.5)
                        .with_modifiers(1.2, 1.0, 1.0)
                        .with_stagger(0.25)
                        .with_effects(0.2, 0.05),
                ],
            ),
            ComboChain::new(
                "hammer_quake",
                WeaponType::Hammer,
                vec![
                    ComboStep::new(1.3, 0.4, 1.1)
                        .with_modifiers(0.7, 1.0, 1.5)
                        .with_stagger(0.3)
                        .with_effects(0.3, 0.06),
                    ComboStep::new(2.2, 0.5, 1.3)
                        .with_modifiers(0.6, 1.4, 2.5)
                        .with_stagger(0.8)
                        .with_effects(0.7, 0.12),
                ],
            ),
            ComboChain::new(
                "spear_lunge",
                WeaponType::Spear,
                vec![
                    ComboStep::new(1.0, 0.2, 0.7).with_modifiers(1.0, 1.3, 1.0),
                    ComboStep::new(1.4, 0.25, 0.8)
                        .with_modifiers(1.0, 1.5, 1.5)
                        .with_stagger(0.2)
                        .with_effects(0.2, 0.04),
                ],
            ),
            ComboChain::new(
                "brawler",
                WeaponType::Unarmed,
                vec![
                    ComboStep::new(0.7, 0.1, 0.45),
                    ComboStep::new(0.8, 0.1, 0.45),
                    ComboStep::new(1.5, 0.15, 0.6)
                        .with_modifiers(1.0, 1.0, 2.0)
                        .with_stagger(0.5)
                        .with_effects(0.25, 0.05),
                ],
            ),
        ]
    }

    /// Index of the chain to use for `weapon`.
    ///
    /// Falls back to the first non-empty chain when no chain matches.
    #[must_use]
    pub fn select(&self, weapon: WeaponType) -> Option<usize> {
        self.chains
            .iter()
            .position(|c| c.weapon == weapon && !c.is_empty())
            .or_else(|| self.chains.iter().position(|c| !c.is_empty()))
    }

    /// Chain at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ComboChain> {
        self.chains.get(index)
    }
}

// ============================================================================
// Per-entity state
// ============================================================================

/// Lifecycle of a combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComboStatus {
    /// No combo.
    #[default]
    None,
    /// Chain in progress.
    Active,
    /// Window lapsed or interrupted; clears on the next update.
    Broken,
}

/// Combo state owned by one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboState {
    chain: Option<usize>,
    step: usize,
    phase: TimedPhase<ComboStatus>,
    buffered: bool,
    /// Hits landed during the current or last combo.
    pub hits: u32,
    /// Damage dealt during the current or last combo.
    pub total_damage: f32,
    best_step: usize,
}

impl Default for ComboState {
    fn default() -> Self {
        Self {
            chain: None,
            step: 0,
            phase: TimedPhase::held(ComboStatus::None),
            buffered: false,
            hits: 0,
            total_damage: 0.0,
            best_step: 0,
        }
    }
}

impl ComboState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Combo lifecycle status.
    #[must_use]
    pub fn status(&self) -> ComboStatus {
        self.phase.phase()
    }

    /// Whether a chain is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status() == ComboStatus::Active
    }

    /// Catalog index of the selected chain.
    #[must_use]
    pub fn chain(&self) -> Option<usize> {
        self.chain
    }

    /// Zero-based current step.
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Seconds since the last successful step.
    #[must_use]
    pub fn since_step(&self) -> f32 {
        self.phase.elapsed()
    }

    /// Whether a follow-up input is waiting for the window to open.
    #[must_use]
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Most steps reached by any combo of this entity.
    #[must_use]
    pub fn best_step(&self) -> usize {
        self.best_step
    }

    fn record_reached(&mut self) {
        self.best_step = self.best_step.max(self.step + 1);
    }

    fn clear(&mut self) {
        self.chain = None;
        self.step = 0;
        self.buffered = false;
        self.phase.hold(ComboStatus::None);
    }
}

/// Notable changes reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ComboEvent {
    /// First step entered.
    Started {
        /// Catalog index of the chain.
        chain: usize,
        /// Feedback for the opening hit.
        effects: StepEffects,
    },
    /// Moved to a later step.
    Advanced {
        /// New zero-based step.
        step: usize,
        /// Feedback for the step.
        effects: StepEffects,
    },
    /// Last step finished.
    Completed {
        /// Catalog index of the chain.
        chain: usize,
        /// Hits landed during the combo.
        hits: u32,
        /// Damage dealt during the combo.
        total_damage: f32,
    },
    /// Window lapsed or interrupted.
    Broken {
        /// Steps reached before the break.
        reached: usize,
    },
    /// Broken combo cleared.
    Reset,
}

// ============================================================================
// Tracker
// ============================================================================

/// Stateless driver for [`ComboState`]s sharing one catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComboTracker {
    catalog: ComboCatalog,
}

impl ComboTracker {
    /// Creates a tracker over a catalog.
    #[must_use]
    pub fn new(catalog: ComboCatalog) -> Self {
        Self { catalog }
    }

    /// Creates a tracker with the configured genre's catalog.
    #[must_use]
    pub fn from_config(config: &CombatConfig) -> Self {
        Self::new(ComboCatalog::for_genre(config.genre()))
    }

    /// Chain catalog.
    #[must_use]
    pub fn catalog(&self) -> &ComboCatalog {
        &self.catalog
    }

    /// Step the state is currently on, if a chain is active.
    #[must_use]
    pub fn current_step(&self, state: &ComboState) -> Option<&ComboStep> {
        if !state.is_active() {
            return None;
        }
        self.catalog.get(state.chain?)?.steps.get(state.step)
    }

    /// Starts a chain for `weapon`, returning the `Started` event.
    pub fn begin(&self, state: &mut ComboState, weapon: WeaponType) -> Option<ComboEvent> {
        if state.is_active() {
            return None;
        }
        let index = self.catalog.select(weapon)?;
        let first = *self.catalog.get(index)?.steps.first()?;

        state.chain = Some(index);
        state.step = 0;
        state.buffered = false;
        state.hits = 0;
        state.total_damage = 0.0;
        state.phase.enter(ComboStatus::Active, first.window_end);
        state.record_reached();
        debug!(chain = index, ?weapon, "combo started");
        Some(ComboEvent::Started {
            chain: index,
            effects: first.effects,
        })
    }

    /// Starts a chain for `weapon`.
    ///
    /// Rejected while a combo is active or when the catalog has no chains.
    pub fn initiate_combo(&self, state: &mut ComboState, weapon: WeaponType) -> bool {
        self.begin(state, weapon).is_some()
    }

    /// Buffers a follow-up input. Only valid while a combo is active.
    pub fn buffer_input(&self, state: &mut ComboState) -> bool {
        if !state.is_active() {
            return false;
        }
        state.buffered = true;
        true
    }

    /// Advances the combo by `dt` seconds.
    pub fn update(&self, state: &mut ComboState, dt: f32) -> Option<ComboEvent> {
        let dt = dt.max(0.0);
        match state.status() {
            ComboStatus::None => None,
            ComboStatus::Broken => {
                state.phase.advance(dt, |_| PhaseStep::Held(ComboStatus::None))?;
                state.clear();
                Some(ComboEvent::Reset)
            },
            ComboStatus::Active => {
                let Some(step) = self.current_step(state).copied() else {
                    state.clear();
                    return Some(ComboEvent::Reset);
                };

                let elapsed = state.phase.elapsed() + dt;
                if state.buffered && elapsed >= step.window_start && elapsed <= step.window_end {
                    return Some(self.next_step(state));
                }

                state
                    .phase
                    .advance(dt, |_| PhaseStep::Timed(ComboStatus::Broken, 0.0))?;
                Some(Self::on_broken(state))
            },
        }
    }

    fn next_step(&self, state: &mut ComboState) -> ComboEvent {
        state.buffered = false;
        let chain = state.chain.and_then(|i| self.catalog.get(i).map(|c| (i, c)));
        let Some((index, chain)) = chain else {
            state.clear();
            return ComboEvent::Reset;
        };

        match chain.steps.get(state.step + 1) {
            Some(next) => {
                state.step += 1;
                state.phase.enter(ComboStatus::Active, next.window_end);
                state.record_reached();
                trace!(step = state.step, "combo advanced");
                ComboEvent::Advanced {
                    step: state.step,
                    effects: next.effects,
                }
            },
            None => {
                let event = ComboEvent::Completed {
                    chain: index,
                    hits: state.hits,
                    total_damage: state.total_damage,
                };
                debug!(chain = index, hits = state.hits, "combo completed");
                state.clear();
                event
            },
        }
    }

    fn on_broken(state: &mut ComboState) -> ComboEvent {
        state.buffered = false;
        state.record_reached();
        trace!(reached = state.step + 1, "combo broken");
        ComboEvent::Broken {
            reached: state.step + 1,
        }
    }

    /// Breaks an active combo immediately.
    pub fn break_combo(&self, state: &mut ComboState) -> bool {
        if !state.is_active() {
            return false;
        }
        state.phase.enter(ComboStatus::Broken, 0.0);
        Self::on_broken(state);
        true
    }

    /// Multipliers for the current step, identity when no combo is active.
    #[must_use]
    pub fn multipliers(&self, state: &ComboState) -> ComboMultipliers {
        self.current_step(state)
            .map_or(ComboMultipliers::IDENTITY, |s| s.multipliers)
    }

    /// Adds a landed hit to the combo's score counters.
    pub fn record_hit(&self, state: &mut ComboState, damage: f32) -> bool {
        if !state.is_active() {
            return false;
        }
        state.hits += 1;
        state.total_damage += damage.max(0.0);
        true
    }

    /// Rolls the current step's stagger chance.
    pub fn roll_stagger(&self, state: &ComboState, rng: &mut fastrand::Rng) -> bool {
        self.current_step(state)
            .is_some_and(|s| s.stagger_chance > 0.0 && rng.f32() < s.stagger_chance)
    }
}
