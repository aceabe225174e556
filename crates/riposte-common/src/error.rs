//! Error types for the combat core.
//!
//! Gameplay preconditions (wrong phase, no stamina, on cooldown) are boolean
//! rejections and never show up here. These variants cover construction and
//! data-loading failures only.

use crate::EntityId;
use thiserror::Error;

/// Top-level error type for combat construction and data loading.
#[derive(Debug, Error)]
pub enum CombatError {
    /// Spatial grid built with a non-positive or non-finite cell size.
    #[error("invalid spatial cell size: {0} (must be finite and > 0)")]
    InvalidCellSize(f32),

    /// Operation referenced an entity the store does not know.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Pattern or combo catalog could not be decoded.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Configuration could not be decoded.
    #[error("config error: {0}")]
    Config(String),

    /// IO errors while reading config or catalog files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for combat construction and loading.
pub type CombatResult<T> = Result<T, CombatError>;
