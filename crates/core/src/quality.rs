//! Quality tiers, their credit costs, and the output size each tier allows.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/* --------------------------------------------------------------------------
Quality tier
-------------------------------------------------------------------------- */

/// A named credit-cost / resolution bucket.
///
/// Serialized with the user-facing labels (`"SD"`, `"HD"`, `"HD+"`, `"4K"`),
/// which are also the values stored in the `quality` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "HD+")]
    HdPlus,
    #[serde(rename = "4K")]
    UltraHd,
}

/// All tiers in ascending order of cost.
pub const ALL_TIERS: &[QualityTier] = &[
    QualityTier::Sd,
    QualityTier::Hd,
    QualityTier::HdPlus,
    QualityTier::UltraHd,
];

impl QualityTier {
    /// Credits charged for one generation at this tier.
    pub fn cost(self) -> i32 {
        match self {
            Self::Sd => 1,
            Self::Hd => 2,
            Self::HdPlus => 3,
            Self::UltraHd => 4,
        }
    }

    /// Longest output edge, in pixels, this tier may produce.
    pub fn max_dimension(self) -> u32 {
        match self {
            Self::Sd => 512,
            Self::Hd => 1024,
            Self::HdPlus => 1536,
            Self::UltraHd => 2048,
        }
    }

    /// The label used in requests, responses and database rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sd => "SD",
            Self::Hd => "HD",
            Self::HdPlus => "HD+",
            Self::UltraHd => "4K",
        }
    }

    /// Parse from the stored label.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        ALL_TIERS
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown quality tier '{name}'. Valid tiers: {}",
                    ALL_TIERS
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
