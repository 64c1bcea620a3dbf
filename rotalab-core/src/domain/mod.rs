//! Domain types for rotalab

pub mod allocation;
pub mod price_history;
pub mod regime;
pub mod weights;

pub use allocation::{AllocationRole, AllocationVector};
pub use price_history::{PriceHistory, PriceHistoryError, PricePoint, PriceSeries};
pub use regime::{Mode, RegimeEntry, RegimeKey};
pub use weights::PortfolioWeights;

/// Asset identifier (ticker).
pub type Asset = String;

/// Lookback window length in trading periods.
pub type Channel = usize;
