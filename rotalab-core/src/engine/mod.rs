//! Allocation engine: inverse-volatility channel units and regime-driven routing.

pub mod allocation;
pub mod thresholds;
pub mod volatility;

pub use allocation::{reallocate, AllocationEngine, AllocationParams, Reallocation, RegimeEvent};
pub use thresholds::ChannelThresholds;
pub use volatility::{channel_units, inverse_volatility};
