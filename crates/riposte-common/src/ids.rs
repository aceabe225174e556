//! Entity identifiers shared by every combat subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter backing [`EntityId::next`].
static NEXT_ENTITY: AtomicU64 = AtomicU64::new(1);

/// Stable identifier for a combat-capable entity.
///
/// Ids are plain integers so they can key dense or hashed component stores
/// and cross thread boundaries freely. `0` is reserved as [`EntityId::NULL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Reserved "no entity" id.
    pub const NULL: Self = Self(0);

    /// Allocates a fresh id from the process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ENTITY.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw id, e.g. one handed out by an external entity store.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this id refers to an entity at all.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
