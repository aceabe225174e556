//! Simulator configuration.
//!
//! Wraps the combat tuning with the parameters of a scripted skirmish.
//! Configuration is read from a TOML file; anything missing takes its default.

use riposte_combat::{CombatConfig, WeaponType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration file read when no path is given.
pub const CONFIG_FILE: &str = "riposte.toml";

const CONFIG_HEADER: &str = "# Riposte skirmish configuration. Missing keys take their defaults.";

/// Top-level simulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RON pattern catalog replacing the genre's built-in one.
    pub pattern_catalog: Option<PathBuf>,
    /// RON combo catalog replacing the genre's built-in one.
    pub combo_catalog: Option<PathBuf>,
    /// Print the final report as JSON on stdout.
    pub json_report: bool,
    /// Combat tuning handed to every machine.
    pub combat: CombatConfig,
    /// Skirmish layout and actor tuning.
    pub scenario: ScenarioConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pattern_catalog: None,
            combo_catalog: None,
            json_report: false,
            combat: CombatConfig::default(),
            scenario: ScenarioConfig::default(),
        }
    }
}

/// One player against a ring of telegraphing enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Simulated seconds before the skirmish is called.
    pub duration_secs: f32,
    /// Presentation frame length fed to the fixed-step clock.
    pub frame_dt: f32,
    /// Enemies spawned around the player.
    pub enemies: u32,
    /// Distance of the enemy ring from the player.
    pub spawn_radius: f32,
    /// Enemy walking speed in units per second.
    pub enemy_speed: f32,
    /// Enemies stop walking inside this distance.
    pub enemy_stop_distance: f32,
    /// Player maximum health.
    pub player_health: f32,
    /// Player starting armor.
    pub player_armor: f32,
    /// Enemy maximum health.
    pub enemy_health: f32,
    /// Player weapon, selecting the combo chain.
    pub weapon: WeaponType,
    /// Base damage of a player strike before combo scaling.
    pub strike_damage: f32,
    /// Player strike reach.
    pub reach: f32,
    /// Telegraph windup progress at which the player reacts.
    pub reaction_progress: f32,
    /// Health fraction below which the player dodges instead of parrying.
    pub dodge_below: f32,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30.0,
            frame_dt: 1.0 / 30.0,
            enemies: 3,
            spawn_radius: 6.0,
            enemy_speed: 2.5,
            enemy_stop_distance: 1.8,
            player_health: 150.0,
            player_armor: 50.0,
            enemy_health: 60.0,
            weapon: WeaponType::Sword,
            strike_damage: 12.0,
            reach: 2.5,
            reaction_progress: 0.8,
            dodge_below: 0.3,
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    ///
    /// Returns the default config if the file is missing or unreadable.
    /// Relative catalog paths are resolved against the file's directory so a
    /// config and its catalogs can travel together.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Config file {} not found, using defaults", path.display());
                return Self::default();
            },
            Err(e) => {
                warn!("Failed to read config file {}: {e}", path.display());
                return Self::default();
            },
        };

        let mut config: Self = match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse config file {}: {e}", path.display());
                return Self::default();
            },
        };

        if let Some(base) = path.parent() {
            config.resolve_catalogs(base);
        }
        info!(
            genre = %config.combat.genre(),
            difficulty = ?config.combat.difficulty,
            "Loaded config from {}",
            path.display()
        );
        config.log_catalogs();
        config
    }

    /// Save configuration to a specific path.
    ///
    /// Catalog paths are written as stored.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let body = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, format!("{CONFIG_HEADER}\n{body}"))?;

        info!(genre = %self.combat.genre(), "Saved config to {}", path.display());
        Ok(())
    }

    /// Joins relative catalog paths onto `base`.
    fn resolve_catalogs(&mut self, base: &Path) {
        for catalog in [&mut self.pattern_catalog, &mut self.combo_catalog]
            .into_iter()
            .flatten()
        {
            if catalog.is_relative() {
                *catalog = base.join(&*catalog);
            }
        }
    }

    fn log_catalogs(&self) {
        let catalogs = [
            ("pattern", self.pattern_catalog.as_deref()),
            ("combo", self.combo_catalog.as_deref()),
        ];
        for (kind, path) in catalogs {
            match path {
                Some(path) if path.is_file() => {
                    info!("Overriding {kind} catalog with {}", path.display());
                },
                Some(path) => {
                    warn!("{kind} catalog {} does not exist", path.display());
                },
                None => debug!("Using built-in {kind} catalog"),
            }
        }
    }

    /// Clamp scenario values to sensible ranges.
    ///
    /// Combat tuning is checked separately when the arena is built.
    pub fn validate(&mut self) {
        let s = &mut self.scenario;
        s.duration_secs = s.duration_secs.clamp(1.0, 3600.0);
        s.frame_dt = s.frame_dt.clamp(1.0 / 240.0, 0.25);
        s.enemies = s.enemies.clamp(1, 64);
        s.spawn_radius = s.spawn_radius.max(1.0);
        s.enemy_speed = s.enemy_speed.max(0.0);
        s.enemy_stop_distance = s.enemy_stop_distance.max(0.5);
        s.player_health = s.player_health.max(1.0);
        s.player_armor = s.player_armor.max(0.0);
        s.enemy_health = s.enemy_health.max(1.0);
        s.strike_damage = s.strike_damage.max(0.0);
        s.reach = s.reach.max(0.5);
        s.reaction_progress = s.reaction_progress.clamp(0.0, 1.0);
        s.dodge_below = s.dodge_below.clamp(0.0, 1.0);
    }
}
