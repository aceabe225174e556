//! RON-backed static data tables.

use riposte_common::{CombatError, CombatResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Catalog data that can be authored as RON.
pub trait RonCatalog: Serialize + DeserializeOwned + Sized {
    /// Parses a catalog from RON text.
    fn from_ron(text: &str) -> CombatResult<Self> {
        ron::from_str(text).map_err(|e| CombatError::Catalog(e.to_string()))
    }

    /// Renders the catalog as pretty RON.
    fn to_ron(&self) -> CombatResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CombatError::Catalog(e.to_string()))
    }

    /// Reads and parses a RON file.
    fn load(path: impl AsRef<Path>) -> CombatResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }
}
