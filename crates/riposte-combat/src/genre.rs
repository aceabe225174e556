//! Genre identifiers.
//!
//! Genre is cosmetic configuration: it picks which static tables (defense
//! preset, attack patterns, combo chains) apply. Unknown ids fall back to the
//! default genre instead of failing.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Setting a run is themed after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    /// Swords and sorcery (the default).
    #[default]
    Fantasy,
    /// Energy weapons and shields.
    SciFi,
    /// Slow, heavy monsters.
    Horror,
    /// Fast, fragile combatants.
    Cyberpunk,
    /// Scavenged gear and brutal hits.
    PostApocalyptic,
}

impl Genre {
    /// Every genre, in table order.
    pub const ALL: [Self; 5] = [
        Self::Fantasy,
        Self::SciFi,
        Self::Horror,
        Self::Cyberpunk,
        Self::PostApocalyptic,
    ];

    /// Parses a genre id, falling back to [`Genre::Fantasy`] for unknown ids.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "fantasy" => Self::Fantasy,
            "scifi" | "sci-fi" => Self::SciFi,
            "horror" => Self::Horror,
            "cyberpunk" => Self::Cyberpunk,
            "postapoc" | "post-apocalyptic" | "postapocalyptic" => Self::PostApocalyptic,
            other => {
                debug!(genre = other, "unknown genre id, using default");
                Self::default()
            },
        }
    }

    /// Canonical id string.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Fantasy => "fantasy",
            Self::SciFi => "sci-fi",
            Self::Horror => "horror",
            Self::Cyberpunk => "cyberpunk",
            Self::PostApocalyptic => "post-apocalyptic",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
