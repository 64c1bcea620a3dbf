//! Position sizing — allocation portions → signed target weights.
//!
//! The sizer is allocation-aware (reads role-tagged portions) but
//! signal-agnostic: it never decides which assets are candidates.

pub mod long_short;

pub use long_short::{LegWeights, Portions, PositionSizer, Rebalance};

use crate::domain::Asset;
use std::collections::BTreeSet;

/// Whether an asset can be traded today.
///
/// Queried before every order the sizer emits, including liquidations.
pub trait Tradability {
    fn can_trade(&self, asset: &str) -> bool;
}

impl<F> Tradability for F
where
    F: Fn(&str) -> bool,
{
    fn can_trade(&self, asset: &str) -> bool {
        self(asset)
    }
}

/// Every asset is tradable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTradable;

impl Tradability for AlwaysTradable {
    fn can_trade(&self, _asset: &str) -> bool {
        true
    }
}

/// Only the listed assets are tradable.
#[derive(Debug, Clone, Default)]
pub struct TradableSet(pub BTreeSet<Asset>);

impl TradableSet {
    pub fn new<I, A>(assets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Asset>,
    {
        Self(assets.into_iter().map(Into::into).collect())
    }
}

impl Tradability for TradableSet {
    fn can_trade(&self, asset: &str) -> bool {
        self.0.contains(asset)
    }
}
