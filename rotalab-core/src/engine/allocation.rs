//! AllocationEngine — daily volatility-weighted allocation across channels.
//!
//! One `reallocate` call per cycle:
//! 1. validate history depth for every active asset
//! 2. compute inverse-volatility channel units over the fixed volatility window
//! 3. for every channel (configured order) and active asset: compute the
//!    entry/exit quantiles of the trailing window, update the regime, and
//!    route the asset's unit to itself (`In`) or to the bond (`Out`)
//!
//! The regime table is updated on a staged copy and committed only when the
//! whole cycle succeeds, so a failed day leaves yesterday's regimes intact.

use crate::channel_state::{ChannelState, Transition};
use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{AllocationVector, Asset, Channel, PriceHistory, RegimeKey};
use crate::error::CycleError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::thresholds::ChannelThresholds;
use super::volatility::channel_units;

/// Parameters of the allocation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationParams {
    pub active_assets: Vec<Asset>,
    pub bond_asset: Asset,
    pub channels: Vec<Channel>,
    pub entry_quantile: f64,
    pub exit_quantile: f64,
    pub volatility_window: usize,
    pub min_volatility: f64,
}

impl AllocationParams {
    /// Prices required per active asset.
    pub fn required_history(&self) -> usize {
        self.channels
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.volatility_window)
    }
}

impl From<&StrategyConfig> for AllocationParams {
    fn from(cfg: &StrategyConfig) -> Self {
        Self {
            active_assets: cfg.active_assets.clone(),
            bond_asset: cfg.hedge_asset.clone(),
            channels: cfg.channels.clone(),
            entry_quantile: cfg.entry_quantile,
            exit_quantile: cfg.exit_quantile,
            volatility_window: cfg.volatility_window,
            min_volatility: cfg.min_volatility,
        }
    }
}

/// A regime evaluation that flipped a key during the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeEvent {
    pub key: RegimeKey,
    pub transition: Transition,
    pub price: f64,
    pub thresholds: ChannelThresholds,
}

/// Output of one reallocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reallocation {
    pub allocation: AllocationVector,
    /// Entries and exits of this cycle, in evaluation order.
    pub events: Vec<RegimeEvent>,
    /// Keys `In` after the cycle.
    pub regimes_in: usize,
}

/// Run one allocation cycle against `state`.
///
/// `state` is only modified when the cycle succeeds.
pub fn reallocate(
    state: &mut ChannelState,
    history: &PriceHistory,
    params: &AllocationParams,
) -> Result<Reallocation, CycleError> {
    let required = params.required_history();
    for asset in &params.active_assets {
        let Some(series) = history.series(asset) else {
            return Err(CycleError::MissingHistory {
                asset: asset.clone(),
            });
        };
        let available = series.len();
        if available < required {
            return Err(CycleError::InsufficientHistory {
                asset: asset.clone(),
                required,
                available,
            });
        }
    }

    let units = channel_units(
        history,
        &params.active_assets,
        params.volatility_window,
        params.channels.len(),
        params.min_volatility,
    )?;

    let mut staged = state.clone();
    let mut allocation = AllocationVector::zeroed(
        params
            .active_assets
            .iter()
            .chain(std::iter::once(&params.bond_asset))
            .cloned(),
    );
    let mut events = Vec::new();

    for &channel in &params.channels {
        for asset in &params.active_assets {
            let key = RegimeKey::new(asset.clone(), channel);
            let (window, price) = match (history.window(asset, channel), history.latest_price(asset)) {
                (Some(w), Some(p)) => (w, p),
                _ => return Err(CycleError::ThresholdUnavailable { key }),
            };
            let thresholds = ChannelThresholds::from_window(
                &window,
                params.entry_quantile,
                params.exit_quantile,
            )
            .ok_or_else(|| CycleError::ThresholdUnavailable { key: key.clone() })?;

            let transition =
                staged.update(asset, channel, price, thresholds.entry, thresholds.exit)?;
            match transition {
                Transition::Entered => info!(regime = %key, price, entry = thresholds.entry, "entry"),
                Transition::Exited => info!(regime = %key, price, exit = thresholds.exit, "exit"),
                Transition::Held(_) => {}
            }
            if transition.flipped() {
                events.push(RegimeEvent {
                    key,
                    transition,
                    price,
                    thresholds,
                });
            }

            let unit = units.get(asset).copied().unwrap_or(0.0);
            if transition.mode().is_in() {
                allocation.add(asset, unit);
            } else {
                allocation.add(&params.bond_asset, unit);
            }
        }
    }

    let regimes_in = staged.count_in();
    *state = staged;
    debug!(%allocation, total = allocation.total(), regimes_in, "allocation");

    Ok(Reallocation {
        allocation,
        events,
        regimes_in,
    })
}

/// Owner of the regime table across cycles.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    params: AllocationParams,
    state: ChannelState,
}

impl AllocationEngine {
    /// Fresh engine: every regime `Out`.
    pub fn new(params: AllocationParams) -> Self {
        let state = ChannelState::new(&params.active_assets, &params.channels);
        Self { params, state }
    }

    /// Resume from a previously persisted regime table.
    ///
    /// The table must hold exactly the active asset × channel keys.
    pub fn with_state(params: AllocationParams, state: ChannelState) -> Result<Self, ConfigError> {
        let expected = ChannelState::new(&params.active_assets, &params.channels);
        let absent = |table: &ChannelState, key: &RegimeKey| table.mode(&key.asset, key.channel).is_none();
        if let Some((key, _)) = expected.iter().find(|(k, _)| absent(&state, k)) {
            return Err(ConfigError::RegimeTableMismatch(format!("missing {key}")));
        }
        if let Some((key, _)) = state.iter().find(|(k, _)| absent(&expected, k)) {
            return Err(ConfigError::RegimeTableMismatch(format!("unexpected {key}")));
        }
        Ok(Self { params, state })
    }

    pub fn params(&self) -> &AllocationParams {
        &self.params
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn reallocate(&mut self, history: &PriceHistory) -> Result<Reallocation, CycleError> {
        reallocate(&mut self.state, history, &self.params)
    }
}
