//! Damage resolution.
//!
//! Turns a raw hit into health and armor loss:
//! - Difficulty scaling
//! - Armor absorption (armor soaks a fraction of its value per hit)
//! - Kill check
//! - Knockback direction
//! - Gib threshold for overkill

use riposte_common::{direction_between, Vec2};
use serde::{Deserialize, Serialize};

/// Health below which a dead body is gibbed instead of ragdolled.
pub const DEFAULT_GIB_THRESHOLD: f32 = -50.0;

/// Fraction of current armor that soaks each hit by default.
pub const DEFAULT_ARMOR_ABSORPTION: f32 = 0.5;

// ============================================================================
// Difficulty
// ============================================================================

/// Player-selected difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    /// Half damage.
    Easy,
    /// Unscaled.
    #[default]
    Normal,
    /// +50% damage.
    Hard,
    /// Double damage.
    Nightmare,
}

impl Difficulty {
    /// Multiplier applied to incoming damage.
    #[must_use]
    pub const fn scale(self) -> f32 {
        match self {
            Self::Easy => 0.5,
            Self::Normal => 1.0,
            Self::Hard => 1.5,
            Self::Nightmare => 2.0,
        }
    }
}

// ============================================================================
// Events and results
// ============================================================================

/// Input of one damage resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Target's health before the hit.
    pub current_health: f32,
    /// Target's armor before the hit.
    pub current_armor: f32,
    /// Damage before difficulty and armor.
    pub raw_damage: f32,
    /// Target position.
    pub target: Vec2,
    /// Attacker or projectile position.
    pub source: Vec2,
}

impl DamageEvent {
    /// Creates an event with both positions at the origin.
    #[must_use]
    pub fn new(current_health: f32, current_armor: f32, raw_damage: f32) -> Self {
        Self {
            current_health,
            current_armor,
            raw_damage,
            target: Vec2::ZERO,
            source: Vec2::ZERO,
        }
    }

    /// Sets target and source positions.
    #[must_use]
    pub fn between(mut self, target: Vec2, source: Vec2) -> Self {
        self.target = target;
        self.source = source;
        self
    }
}

/// Output of one damage resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageResult {
    /// Health to subtract (never negative).
    pub health_damage: f32,
    /// Armor to subtract (never negative, never above current armor).
    pub armor_damage: f32,
    /// Whether the hit brings health to zero or below.
    pub killed: bool,
    /// Unit vector from source to target, or zero when they coincide.
    pub direction: Vec2,
}

impl DamageResult {
    /// Knockback impulse for a given force.
    #[must_use]
    pub fn knockback(&self, force: f32) -> Vec2 {
        self.direction * force
    }
}

/// Resolves one hit.
///
/// `armor_absorption` is the fraction of current armor that soaks damage.
/// When the soak covers the whole hit, armor pays `scaled / absorption`
/// (capped at current armor) and health is untouched. Otherwise armor is
/// depleted and health takes whatever the soak missed.
#[must_use]
pub fn resolve(event: &DamageEvent, difficulty_scale: f32, armor_absorption: f32) -> DamageResult {
    let scaled = (event.raw_damage * difficulty_scale).max(0.0);
    let armor = event.current_armor.max(0.0);

    let (health_damage, armor_damage) = if armor > 0.0 && armor_absorption > 0.0 {
        let absorbed = armor * armor_absorption;
        if absorbed >= scaled {
            (0.0, (scaled / armor_absorption).min(armor))
        } else {
            (scaled - absorbed, armor)
        }
    } else {
        (scaled, 0.0)
    };

    DamageResult {
        health_damage,
        armor_damage,
        killed: event.current_health - health_damage <= 0.0,
        direction: direction_between(event.source, event.target),
    }
}

/// Whether a body at `final_health` should be gibbed.
#[must_use]
pub fn should_gib(final_health: f32, threshold: f32) -> bool {
    final_health < threshold
}

// ============================================================================
// Resolver
// ============================================================================

/// [`resolve`] bound to one run's difficulty and armor settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageResolver {
    /// Damage multiplier from difficulty.
    pub difficulty_scale: f32,
    /// Fraction of armor that soaks each hit.
    pub armor_absorption: f32,
    /// Final health below which a body gibs.
    pub gib_threshold: f32,
}

impl Default for DamageResolver {
    fn default() -> Self {
        Self {
            difficulty_scale: Difficulty::Normal.scale(),
            armor_absorption: DEFAULT_ARMOR_ABSORPTION,
            gib_threshold: DEFAULT_GIB_THRESHOLD,
        }
    }
}

impl DamageResolver {
    /// Creates a resolver for a difficulty with default armor settings.
    #[must_use]
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty_scale: difficulty.scale(),
            ..Default::default()
        }
    }

    /// Sets the armor absorption fraction.
    #[must_use]
    pub fn with_armor_absorption(mut self, fraction: f32) -> Self {
        self.armor_absorption = fraction.max(0.0);
        self
    }

    /// Sets the gib threshold.
    #[must_use]
    pub fn with_gib_threshold(mut self, threshold: f32) -> Self {
        self.gib_threshold = threshold;
        self
    }

    /// Resolves one hit with this resolver's settings.
    #[must_use]
    pub fn resolve(&self, event: &DamageEvent) -> DamageResult {
        resolve(event, self.difficulty_scale, self.armor_absorption)
    }

    /// Whether a body at `final_health` should be gibbed.
    #[must_use]
    pub fn should_gib(&self, final_health: f32) -> bool {
        should_gib(final_health, self.gib_threshold)
    }
}
