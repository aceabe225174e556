//! Telegraphed enemy attacks.
//!
//! An attack announces itself (Windup), deals damage once (Active), then
//! rests (Cooldown) before the attacker may start another. Hit tests are
//! shape-specific and run against broadphase candidates.

use crate::catalog::RonCatalog;
use crate::config::CombatConfig;
use crate::genre::Genre;
use crate::phase::{PhaseStep, TimedPhase, Transition};
use crate::spatial::{SpatialEntity, SpatialGrid};
use riposte_common::{
    angle_difference, direction_between, heading, EntityId, Vec2, COINCIDENT_EPSILON,
};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::{debug, trace};

// ============================================================================
// Shapes and patterns
// ============================================================================

/// Area an attack covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackShape {
    /// Wedge of `angle` radians out to `range`.
    Cone,
    /// Disc of radius `range` around the attacker.
    Circle,
    /// Rectangle `range` long and `width` wide along the attack direction.
    Line,
    /// Annulus between `range - width` and `range`.
    Ring,
}

impl AttackShape {
    /// Radius of the circle around the attacker that encloses the shape.
    #[must_use]
    pub fn query_radius(self, range: f32, width: f32) -> f32 {
        match self {
            Self::Cone | Self::Circle | Self::Ring => range,
            Self::Line => range.hypot(width / 2.0),
        }
    }
}

/// One entry of a pattern catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackPattern {
    /// Pattern name.
    pub name: String,
    /// Covered area.
    pub shape: AttackShape,
    /// Reach in world units.
    pub range: f32,
    /// Full cone angle in radians (cones only).
    #[serde(default)]
    pub angle: f32,
    /// Line width or ring thickness.
    #[serde(default)]
    pub width: f32,
    /// Windup seconds.
    pub windup: f32,
    /// Active seconds.
    pub active: f32,
    /// Cooldown seconds.
    pub cooldown: f32,
    /// Damage per target.
    pub base_damage: f32,
    /// Knockback force multiplier.
    #[serde(default = "default_knockback")]
    pub knockback: f32,
}

fn default_knockback() -> f32 {
    1.0
}

impl AttackPattern {
    /// Creates a pattern with default timing and no damage.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: AttackShape, range: f32) -> Self {
        Self {
            name: name.into(),
            shape,
            range: range.max(0.0),
            angle: PI / 2.0,
            width: 1.0,
            windup: 0.6,
            active: 0.15,
            cooldown: 0.8,
            base_damage: 0.0,
            knockback: 1.0,
        }
    }

    /// Set cone angle.
    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set line width or ring thickness.
    #[must_use]
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width.max(0.0);
        self
    }

    /// Set phase durations.
    #[must_use]
    pub fn with_timing(mut self, windup: f32, active: f32, cooldown: f32) -> Self {
        self.windup = windup;
        self.active = active;
        self.cooldown = cooldown;
        self
    }

    /// Set damage and knockback.
    #[must_use]
    pub fn with_damage(mut self, damage: f32, knockback: f32) -> Self {
        self.base_damage = damage;
        self.knockback = knockback;
        self
    }

    /// Broadphase radius for this pattern.
    #[must_use]
    pub fn query_radius(&self) -> f32 {
        self.shape.query_radius(self.range, self.width)
    }

    /// Whether `target` lies inside the pattern cast from `origin` along
    /// the unit vector `direction`.
    #[must_use]
    pub fn contains(&self, origin: Vec2, direction: Vec2, target: Vec2) -> bool {
        let offset = target - origin;
        let distance = offset.length();

        match self.shape {
            AttackShape::Cone => {
                if distance > self.range {
                    return false;
                }
                if distance < COINCIDENT_EPSILON {
                    return true;
                }
                angle_difference(heading(offset), heading(direction)).abs() <= self.angle / 2.0
            },
            AttackShape::Circle => distance <= self.range,
            AttackShape::Line => {
                let along = offset.dot(direction);
                let across = offset.perp_dot(direction).abs();
                (0.0..=self.range).contains(&along) && across <= self.width / 2.0
            },
            AttackShape::Ring => distance >= self.range - self.width && distance <= self.range,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Ordered set of patterns an attacker chooses from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternCatalog {
    /// Patterns in priority order.
    pub patterns: Vec<AttackPattern>,
}

impl RonCatalog for PatternCatalog {}

impl PatternCatalog {
    /// Creates a catalog.
    #[must_use]
    pub fn new(patterns: Vec<AttackPattern>) -> Self {
        Self { patterns }
    }

    /// Static pattern table for a genre.
    #[must_use]
    pub fn for_genre(genre: Genre) -> Self {
        use AttackShape::{Circle, Cone, Line, Ring};

        let patterns = match genre {
            Genre::Fantasy => vec![
                AttackPattern::new("sword_slash", Cone, 2.5)
                    .with_angle(PI / 2.0)
                    .with_timing(0.6, 0.15, 0.8)
                    .with_damage(15.0, 1.0),
                AttackPattern::new("ground_slam", Circle, 3.0)
                    .with_timing(1.0, 0.2, 1.5)
                    .with_damage(25.0, 2.0),
                AttackPattern::new("spear_thrust", Line, 5.0)
                    .with_width(1.0)
                    .with_timing(0.7, 0.15, 1.0)
                    .with_damage(18.0, 1.2),
                AttackPattern::new("arcane_nova", Ring, 7.0)
                    .with_width(2.0)
                    .with_timing(1.2, 0.25, 2.0)
                    .with_damage(20.0, 1.5),
            ],
            Genre::SciFi => vec![
                AttackPattern::new("plasma_swipe", Cone, 3.0)
                    .with_angle(PI / 3.0)
                    .with_timing(0.5, 0.1, 0.7)
                    .with_damage(18.0, 1.0),
                AttackPattern::new("laser_beam", Line, 10.0)
                    .with_width(0.6)
                    .with_timing(0.9, 0.3, 1.5)
                    .with_damage(30.0, 0.5),
                AttackPattern::new("emp_pulse", Ring, 8.0)
                    .with_width(1.5)
                    .with_timing(1.1, 0.2, 2.5)
                    .with_damage(22.0, 2.5),
            ],
            Genre::Horror => vec![
                AttackPattern::new("claw_rake", Cone, 2.0)
                    .with_angle(PI * 2.0 / 3.0)
                    .with_timing(0.8, 0.2, 0.9)
                    .with_damage(20.0, 1.0),
                AttackPattern::new("tendril_lash", Line, 6.0)
                    .with_width(0.8)
                    .with_timing(1.0, 0.2, 1.2)
                    .with_damage(22.0, 1.8),
                AttackPattern::new("dread_scream", Circle, 5.0)
                    .with_timing(1.5, 0.3, 3.0)
                    .with_damage(15.0, 3.0),
            ],
            Genre::Cyberpunk => vec![
                AttackPattern::new("mono_wire", Cone, 2.8)
                    .with_angle(PI / 4.0)
                    .with_timing(0.35, 0.1, 0.5)
                    .with_damage(16.0, 0.8),
                AttackPattern::new("rail_shot", Line, 12.0)
                    .with_width(0.5)
                    .with_timing(0.8, 0.1, 1.4)
                    .with_damage(35.0, 1.5),
                AttackPattern::new("shock_field", Circle, 3.5)
                    .with_timing(0.9, 0.25, 1.8)
                    .with_damage(20.0, 2.0),
            ],
            Genre::PostApocalyptic => vec![
                AttackPattern::new("pipe_swing", Cone, 2.2)
                    .with_angle(PI * 0.6)
                    .with_timing(0.7, 0.15, 0.9)
                    .with_damage(20.0, 1.5),
                AttackPattern::new("shotgun_blast", Cone, 6.0)
                    .with_angle(PI / 3.0)
                    .with_timing(0.9, 0.1, 1.6)
                    .with_damage(28.0, 2.0),
                AttackPattern::new("molotov", Circle, 4.0)
                    .with_timing(1.2, 0.4, 2.2)
                    .with_damage(18.0, 0.5),
                AttackPattern::new("scrap_mine", Ring, 5.0)
                    .with_width(1.0)
                    .with_timing(1.4, 0.2, 2.5)
                    .with_damage(26.0, 2.5),
            ],
        };
        Self { patterns }
    }

    /// Whether the catalog has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Looks up a pattern by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttackPattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// Picks a pattern for a target `distance` away.
    ///
    /// The covering pattern with the shortest range wins, earlier entries
    /// breaking ties. With nothing in range the longest-range pattern is
    /// used. Only an empty catalog yields `None`.
    #[must_use]
    pub fn select(&self, distance: f32) -> Option<&AttackPattern> {
        self.patterns
            .iter()
            .filter(|p| p.range >= distance)
            .min_by(|a, b| a.range.total_cmp(&b.range))
            .or_else(|| {
                self.patterns
                    .iter()
                    .rev()
                    .max_by(|a, b| a.range.total_cmp(&b.range))
            })
    }
}

// ============================================================================
// Per-entity state
// ============================================================================

/// Phase of a telegraphed attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TelegraphPhase {
    /// Ready to attack.
    #[default]
    Inactive,
    /// Announcing the attack.
    Windup,
    /// Damaging.
    Active,
    /// Resting.
    Cooldown,
}

/// Telegraph state owned by one attacker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegraphState {
    pattern: Option<AttackPattern>,
    phase: TimedPhase<TelegraphPhase>,
    direction: Vec2,
    has_hit: bool,
}

impl Default for TelegraphState {
    fn default() -> Self {
        Self {
            pattern: None,
            phase: TimedPhase::held(TelegraphPhase::Inactive),
            direction: Vec2::X,
            has_hit: false,
        }
    }
}

impl TelegraphState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> TelegraphPhase {
        self.phase.phase()
    }

    /// Progress through the current phase, or `-1.0` when inactive.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.phase() == TelegraphPhase::Inactive {
            -1.0
        } else {
            self.phase.progress()
        }
    }

    /// Pattern of the current or last attack.
    #[must_use]
    pub fn pattern(&self) -> Option<&AttackPattern> {
        self.pattern.as_ref()
    }

    /// Unit attack direction.
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    /// Whether the damage pass for this Active phase already ran.
    #[must_use]
    pub fn has_hit(&self) -> bool {
        self.has_hit
    }

    /// Whether an attack is in progress (including cooldown).
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.phase() != TelegraphPhase::Inactive
    }

    /// Drops any attack in progress.
    pub fn reset(&mut self) {
        self.phase.hold(TelegraphPhase::Inactive);
        self.has_hit = false;
    }
}

/// A target caught by a strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelegraphHit {
    /// Attacking entity.
    pub attacker: EntityId,
    /// Entity hit.
    pub target: EntityId,
    /// Raw damage before defense and armor.
    pub damage: f32,
    /// Knockback force multiplier.
    pub knockback: f32,
}

// ============================================================================
// Machine
// ============================================================================

/// Stateless driver for [`TelegraphState`]s sharing one catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelegraphMachine {
    catalog: PatternCatalog,
}

impl TelegraphMachine {
    /// Creates a machine over a catalog.
    #[must_use]
    pub fn new(catalog: PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Creates a machine with the configured genre's catalog.
    #[must_use]
    pub fn from_config(config: &CombatConfig) -> Self {
        Self::new(PatternCatalog::for_genre(config.genre()))
    }

    /// Pattern catalog.
    #[must_use]
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Starts an attack at `target_pos`.
    ///
    /// Rejected unless the attacker is alive and idle, or when the catalog
    /// is empty.
    pub fn initiate_attack(
        &self,
        state: &mut TelegraphState,
        attacker_pos: Vec2,
        target_pos: Vec2,
        attacker_health: f32,
    ) -> bool {
        if attacker_health <= 0.0 || state.is_attacking() {
            return false;
        }
        let distance = attacker_pos.distance(target_pos);
        let Some(pattern) = self.catalog.select(distance) else {
            return false;
        };

        let direction = direction_between(attacker_pos, target_pos);
        if direction != Vec2::ZERO {
            state.direction = direction;
        }
        state.phase.enter(TelegraphPhase::Windup, pattern.windup);
        state.has_hit = false;
        state.pattern = Some(pattern.clone());
        debug!(pattern = %pattern.name, distance, "attack telegraphed");
        true
    }

    fn next_phase(
        pattern: Option<&AttackPattern>,
        phase: TelegraphPhase,
    ) -> PhaseStep<TelegraphPhase> {
        match (phase, pattern) {
            (TelegraphPhase::Windup, Some(p)) => PhaseStep::Timed(TelegraphPhase::Active, p.active),
            (TelegraphPhase::Active, Some(p)) => {
                PhaseStep::Timed(TelegraphPhase::Cooldown, p.cooldown)
            },
            _ => PhaseStep::Held(TelegraphPhase::Inactive),
        }
    }

    /// Advances the attack by `dt` seconds.
    ///
    /// A dead attacker is forced back to Inactive.
    pub fn update(
        &self,
        state: &mut TelegraphState,
        dt: f32,
        attacker_health: f32,
    ) -> Option<Transition<TelegraphPhase>> {
        if attacker_health <= 0.0 {
            if state.is_attacking() {
                trace!("attacker dead, telegraph reset");
            }
            state.reset();
            return None;
        }

        let transition = state
            .phase
            .advance(dt, |p| Self::next_phase(state.pattern.as_ref(), p))?;
        if transition.to == TelegraphPhase::Active {
            state.has_hit = false;
        }
        Some(transition)
    }

    /// Runs the single damage pass of an Active phase over `candidates`.
    ///
    /// Returns nothing outside Active or once the pass already ran. The
    /// attacker never hits itself.
    pub fn strike(
        &self,
        state: &mut TelegraphState,
        attacker: EntityId,
        attacker_pos: Vec2,
        candidates: impl IntoIterator<Item = SpatialEntity>,
    ) -> Vec<TelegraphHit> {
        if state.phase() != TelegraphPhase::Active || state.has_hit {
            return Vec::new();
        }
        let Some(pattern) = state.pattern.as_ref() else {
            return Vec::new();
        };
        state.has_hit = true;

        let hits: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.id != attacker)
            .filter(|c| pattern.contains(attacker_pos, state.direction, c.position))
            .map(|c| TelegraphHit {
                attacker,
                target: c.id,
                damage: pattern.base_damage,
                knockback: pattern.knockback,
            })
            .collect();
        trace!(pattern = %pattern.name, hits = hits.len(), "strike");
        hits
    }

    /// [`strike`](Self::strike) with candidates drawn from a grid.
    pub fn strike_grid(
        &self,
        state: &mut TelegraphState,
        attacker: EntityId,
        attacker_pos: Vec2,
        grid: &SpatialGrid,
    ) -> Vec<TelegraphHit> {
        let radius = state.pattern.as_ref().map_or(0.0, AttackPattern::query_radius);
        let candidates = grid.query_entities(attacker_pos.x, attacker_pos.y, radius);
        self.strike(state, attacker, attacker_pos, candidates)
    }
}
