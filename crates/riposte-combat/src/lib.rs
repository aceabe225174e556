//! # Riposte Combat
//!
//! Real-time combat resolution for an action game.
//!
//! This crate decides, every simulation tick, who can attack, who can defend,
//! which areas are dangerous and how much a hit actually deals:
//! - Spatial grid broadphase for proximity queries
//! - Damage resolution (difficulty, armor, knockback, gibs)
//! - Defensive maneuvers (dodge, parry, block)
//! - Telegraphed enemy attacks with shaped hit tests
//! - Combo chains with timing windows and input buffering
//! - Genre presets and RON catalogs
//! - An arena composing all of the above

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod catalog;
pub mod combo;
pub mod config;
pub mod damage;
pub mod defense;
pub mod genre;
pub mod phase;
pub mod spatial;
pub mod store;
pub mod telegraph;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::arena::*;
    pub use crate::catalog::*;
    pub use crate::combo::*;
    pub use crate::config::*;
    pub use crate::damage::*;
    pub use crate::defense::*;
    pub use crate::genre::*;
    pub use crate::phase::*;
    pub use crate::spatial::*;
    pub use crate::store::*;
    pub use crate::telegraph::*;
}

pub use prelude::*;
