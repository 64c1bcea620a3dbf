//! Strategy configuration — every tunable of the rotation strategy.
//!
//! Deserialized from the `[strategy]` table of a run file. Missing fields
//! fall back to the defaults below; `validate()` must pass before the
//! configuration is used to build a strategy.

use crate::domain::{AllocationRole, Asset, Channel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one active asset is required")]
    NoActiveAssets,

    #[error("asset '{0}' is listed more than once")]
    DuplicateAsset(Asset),

    #[error("hedge asset '{0}' must not also be an active asset")]
    HedgeIsActive(Asset),

    #[error("at least one channel is required")]
    NoChannels,

    #[error("channel lengths must be >= 2 (got {0})")]
    ChannelTooShort(Channel),

    #[error("channel {0} is listed more than once")]
    DuplicateChannel(Channel),

    #[error("{name} must lie strictly between 0 and 1 (got {value})")]
    QuantileOutOfRange { name: &'static str, value: f64 },

    #[error("volatility_window must be >= 3 (got {0})")]
    VolatilityWindowTooShort(usize),

    #[error("min_volatility must be finite and >= 0 (got {0})")]
    InvalidMinVolatility(f64),

    #[error("{0} must be >= 1")]
    ZeroListSize(&'static str),

    #[error("short_split must lie in [0, 1] (got {0})")]
    ShortSplitOutOfRange(f64),

    #[error("role configured for '{0}', which is neither an active asset nor the hedge asset")]
    UnknownRoleAsset(Asset),

    #[error("regime table does not match the configured assets and channels: {0}")]
    RegimeTableMismatch(String),

    #[error("invalid schedule: {0}")]
    Schedule(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Configuration of the rotation strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Rotation candidates, each tracked over every channel.
    pub active_assets: Vec<Asset>,
    /// Bond/cash-equivalent that absorbs the capital of `Out` regimes.
    pub hedge_asset: Asset,
    /// Lookback lengths for the breakout quantiles.
    pub channels: Vec<Channel>,
    pub entry_quantile: f64,
    pub exit_quantile: f64,
    /// Prices used for the inverse-volatility weights (returns = window - 1).
    pub volatility_window: usize,
    /// Volatilities at or below this value fail the cycle.
    pub min_volatility: f64,
    pub long_list_size: usize,
    pub short_list_size: usize,
    /// Fraction of the short-source capital sent to the short list; the
    /// remainder goes to the hedge assets.
    pub short_split: f64,
    /// Assets receiving the hedge leg. Empty means `[hedge_asset]`.
    pub cash_equivalents: Vec<Asset>,
    /// Role per allocation entry; unlisted entries are long contributors.
    pub roles: BTreeMap<Asset, AllocationRole>,
    /// Industry codes removed from the factor universe.
    pub excluded_industries: Vec<u64>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert("DBC".to_string(), AllocationRole::ShortSource);
        Self {
            active_assets: ["VTI", "EFA", "ICF", "DBC"]
                .into_iter()
                .map(String::from)
                .collect(),
            hedge_asset: "IEF".into(),
            channels: vec![60, 120, 180, 252],
            entry_quantile: 0.60,
            exit_quantile: 0.10,
            volatility_window: 20,
            min_volatility: 1e-12,
            long_list_size: 20,
            short_list_size: 20,
            short_split: 0.5,
            cash_equivalents: Vec::new(),
            roles,
            excluded_industries: vec![10319042, 20532078],
        }
    }
}

impl StrategyConfig {
    /// Parse from a TOML document holding the strategy fields at top level.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_assets.is_empty() {
            return Err(ConfigError::NoActiveAssets);
        }
        let mut seen = BTreeSet::new();
        for asset in &self.active_assets {
            if !seen.insert(asset.as_str()) {
                return Err(ConfigError::DuplicateAsset(asset.clone()));
            }
        }
        if seen.contains(self.hedge_asset.as_str()) {
            return Err(ConfigError::HedgeIsActive(self.hedge_asset.clone()));
        }

        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen_channels = BTreeSet::new();
        for &c in &self.channels {
            if c < 2 {
                return Err(ConfigError::ChannelTooShort(c));
            }
            if !seen_channels.insert(c) {
                return Err(ConfigError::DuplicateChannel(c));
            }
        }

        for (name, value) in [
            ("entry_quantile", self.entry_quantile),
            ("exit_quantile", self.exit_quantile),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::QuantileOutOfRange { name, value });
            }
        }

        if self.volatility_window < 3 {
            return Err(ConfigError::VolatilityWindowTooShort(self.volatility_window));
        }
        if !self.min_volatility.is_finite() || self.min_volatility < 0.0 {
            return Err(ConfigError::InvalidMinVolatility(self.min_volatility));
        }
        if self.long_list_size == 0 {
            return Err(ConfigError::ZeroListSize("long_list_size"));
        }
        if self.short_list_size == 0 {
            return Err(ConfigError::ZeroListSize("short_list_size"));
        }
        if !(0.0..=1.0).contains(&self.short_split) {
            return Err(ConfigError::ShortSplitOutOfRange(self.short_split));
        }

        for asset in self.roles.keys() {
            if !seen.contains(asset.as_str()) && *asset != self.hedge_asset {
                return Err(ConfigError::UnknownRoleAsset(asset.clone()));
            }
        }
        Ok(())
    }

    /// Entries of the allocation vector: active assets followed by the hedge.
    pub fn allocation_assets(&self) -> Vec<Asset> {
        let mut assets = self.active_assets.clone();
        assets.push(self.hedge_asset.clone());
        assets
    }

    pub fn role_of(&self, asset: &str) -> AllocationRole {
        self.roles.get(asset).copied().unwrap_or_default()
    }

    /// Assets that receive the hedge leg of the short portion.
    pub fn hedge_assets(&self) -> Vec<Asset> {
        if self.cash_equivalents.is_empty() {
            vec![self.hedge_asset.clone()]
        } else {
            self.cash_equivalents.clone()
        }
    }

    /// Prices needed per active asset before a cycle can run.
    pub fn required_history(&self) -> usize {
        self.channels
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.volatility_window)
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    pub fn config_hash(&self) -> String {
        // BTreeMap fields keep the JSON key order stable.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
