//! # Riposte Sim
//!
//! Headless skirmish runner for the Riposte combat core:
//! - TOML configuration with scenario parameters
//! - Fixed-step clock decoupling frames from combat ticks
//! - Scripted player and enemy behavior
//! - Summary report

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod skirmish;
pub mod timing;

pub use config::{ScenarioConfig, SimConfig, CONFIG_FILE};
pub use skirmish::{Outcome, Report, Skirmish};
pub use timing::FixedStep;
