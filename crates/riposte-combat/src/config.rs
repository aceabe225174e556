//! Caller-owned combat configuration.
//!
//! One [`CombatConfig`] is built per run and handed to every machine's
//! constructor. Missing fields take their defaults when deserialized.

use crate::damage::{DamageResolver, Difficulty, DEFAULT_ARMOR_ABSORPTION, DEFAULT_GIB_THRESHOLD};
use crate::genre::Genre;
use riposte_common::{CombatError, CombatResult};
use serde::{Deserialize, Serialize};

/// Tuning shared by every combat system of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Genre id selecting presets and catalogs.
    pub genre: String,
    /// Player-selected difficulty.
    pub difficulty: Difficulty,
    /// Fraction of armor that soaks each hit.
    pub armor_absorption: f32,
    /// Final health below which bodies gib.
    pub gib_threshold: f32,
    /// Spatial grid cell size, about twice the average entity radius.
    pub cell_size: f32,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Speed imparted by a knockback multiplier of 1.
    pub knockback_force: f32,
    /// Damage multiplier while a backstab window is open.
    pub backstab_multiplier: f32,
    /// Seed for stagger rolls; random when absent.
    pub rng_seed: Option<u64>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            genre: Genre::default().id().to_string(),
            difficulty: Difficulty::Normal,
            armor_absorption: DEFAULT_ARMOR_ABSORPTION,
            gib_threshold: DEFAULT_GIB_THRESHOLD,
            cell_size: 4.0,
            tick_rate: 60,
            knockback_force: 6.0,
            backstab_multiplier: 2.0,
            rng_seed: None,
        }
    }
}

impl CombatConfig {
    /// Parsed genre, falling back to the default for unknown ids.
    #[must_use]
    pub fn genre(&self) -> Genre {
        Genre::from_id(&self.genre)
    }

    /// Damage resolver for this run.
    #[must_use]
    pub fn resolver(&self) -> DamageResolver {
        DamageResolver::new(self.difficulty)
            .with_armor_absorption(self.armor_absorption)
            .with_gib_threshold(self.gib_threshold)
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Checks values that would make the simulation degenerate.
    pub fn validate(&self) -> CombatResult<()> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(CombatError::InvalidCellSize(self.cell_size));
        }
        if self.tick_rate == 0 {
            return Err(CombatError::Config("tick_rate must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.armor_absorption) {
            return Err(CombatError::Config(format!(
                "armor_absorption {} outside [0, 1]",
                self.armor_absorption
            )));
        }
        Ok(())
    }
}
