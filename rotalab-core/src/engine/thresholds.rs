//! Entry/exit thresholds for one channel window.

use crate::stats::quantile;
use serde::{Deserialize, Serialize};

/// Breakout levels for a (asset, channel) pair on the current day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelThresholds {
    pub entry: f64,
    pub exit: f64,
}

impl ChannelThresholds {
    /// Quantiles of the trailing window (newest price included).
    pub fn from_window(window: &[f64], entry_quantile: f64, exit_quantile: f64) -> Option<Self> {
        Some(Self {
            entry: quantile(window, entry_quantile)?,
            exit: quantile(window, exit_quantile)?,
        })
    }
}
