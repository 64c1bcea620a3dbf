//! Target portfolio weights handed to the execution layer.

use super::Asset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Signed target weights as fractions of net asset value.
///
/// `targets` holds every order the execution layer should place today,
/// including explicit zeros for liquidations. `deferred` lists assets whose
/// order was withheld because they could not be traded today.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    pub targets: BTreeMap<Asset, f64>,
    pub deferred: Vec<Asset>,
}

impl PortfolioWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, asset: impl Into<Asset>, weight: f64) {
        self.targets.insert(asset.into(), weight);
    }

    pub fn defer(&mut self, asset: impl Into<Asset>) {
        self.deferred.push(asset.into());
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.targets.get(asset).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Sum of absolute weights (leverage of the target book).
    pub fn gross_exposure(&self) -> f64 {
        self.targets.values().map(|w| w.abs()).sum()
    }

    /// Sum of signed weights.
    pub fn net_exposure(&self) -> f64 {
        self.targets.values().sum()
    }

    /// Assets that end up with a non-zero target.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.targets
            .iter()
            .filter(|(_, w)| **w != 0.0)
            .map(|(a, w)| (a.as_str(), *w))
    }
}
