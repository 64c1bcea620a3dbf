//! Inverse-volatility channel units.
//!
//! Each active asset receives `r = (invVol / Σ invVol) / num_channels`, the
//! capital it controls inside a single channel. The volatility base is the
//! same fixed window for every channel.

use crate::domain::{Asset, PriceHistory};
use crate::error::CycleError;
use crate::stats::{pct_change, sample_std};
use std::collections::BTreeMap;

/// `1 / stddev(pct_change(prices))`, or the offending volatility on failure.
///
/// Fails when the volatility is non-finite or not above `min_volatility`.
pub fn inverse_volatility(prices: &[f64], min_volatility: f64) -> Result<f64, f64> {
    let vol = sample_std(&pct_change(prices)).unwrap_or(f64::NAN);
    if !vol.is_finite() || vol <= min_volatility {
        return Err(vol);
    }
    Ok(1.0 / vol)
}

/// Per-asset capital unit for one channel.
pub fn channel_units(
    history: &PriceHistory,
    assets: &[Asset],
    window: usize,
    num_channels: usize,
    min_volatility: f64,
) -> Result<BTreeMap<Asset, f64>, CycleError> {
    let mut inv_vols = BTreeMap::new();
    for asset in assets {
        let prices = history
            .window(asset, window)
            .ok_or_else(|| CycleError::InsufficientHistory {
                asset: asset.clone(),
                required: window,
                available: history.depth(asset),
            })?;
        let inv = inverse_volatility(&prices, min_volatility).map_err(|volatility| {
            CycleError::DegenerateVolatility {
                asset: asset.clone(),
                volatility,
            }
        })?;
        inv_vols.insert(asset.clone(), inv);
    }

    let total: f64 = inv_vols.values().sum();
    let per_channel = 1.0 / num_channels as f64;
    Ok(inv_vols
        .into_iter()
        .map(|(asset, inv)| (asset, inv / total * per_channel))
        .collect())
}
