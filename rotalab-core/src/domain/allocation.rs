//! Allocation vector and the role tags that drive position sizing.

use super::Asset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How an allocation entry is consumed by the position sizer.
///
/// Assigned per asset at configuration time; never inferred from the
/// position of the entry in the vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationRole {
    /// Capital is spread evenly over the long candidate list.
    #[default]
    LongContributor,
    /// Capital is split between the short list and the hedge assets.
    ShortSource,
    /// Capital goes straight to the hedge assets.
    Hedge,
}

impl fmt::Display for AllocationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongContributor => write!(f, "long_contributor"),
            Self::ShortSource => write!(f, "short_source"),
            Self::Hedge => write!(f, "hedge"),
        }
    }
}

/// Non-negative capital fractions per asset (active assets + bond).
///
/// Rebuilt from zero every cycle; the entries of a complete cycle sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationVector {
    entries: BTreeMap<Asset, f64>,
}

impl AllocationVector {
    /// A vector with a zero entry for every given asset.
    pub fn zeroed<I, A>(assets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Asset>,
    {
        Self {
            entries: assets.into_iter().map(|a| (a.into(), 0.0)).collect(),
        }
    }

    pub fn add(&mut self, asset: &str, amount: f64) {
        *self.entries.entry(asset.to_string()).or_insert(0.0) += amount;
    }

    /// Entry for `asset`, 0 when the asset is not part of the vector.
    pub fn get(&self, asset: &str) -> f64 {
        self.entries.get(asset).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.entries.contains_key(asset)
    }

    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(a, w)| (a.as_str(), *w))
    }
}

impl fmt::Display for AllocationVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(a, w)| format!("{a}={w:.4}"))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
