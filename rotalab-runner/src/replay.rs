//! Daily replay — drives a `RotationStrategy` through historical data.
//!
//! For each trading day in range:
//! 1. cut prices at the day (no look-ahead) and pick the latest fundamentals
//! 2. skip the day while any allocation asset lacks the required history
//! 3. run the four phases with today's holdings and tradability
//! 4. apply the targets to the running book; deferred assets keep their weight
//!
//! A failed cycle is logged and recorded, and the replay moves on with the
//! regimes committed by the last successful reallocation.

use chrono::NaiveDate;
use rotalab_core::domain::{Asset, PriceHistory, RegimeEntry};
use rotalab_core::{CycleError, DayInputs, DayReport, RotationStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{RunConfig, RunId};
use crate::data_loader::{load_data, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] rotalab_core::ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("no trading days between {start} and {end}")]
    NoTradingDays { start: String, end: String },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// A day whose cycle failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Complete result of one replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config_hash: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub config: RunConfig,
    pub days: Vec<DayReport>,
    pub failures: Vec<CycleFailure>,
    /// Days the schedule skipped (half days with `half_days = false`).
    pub skipped: Vec<NaiveDate>,
    /// Days before every allocation asset had enough history.
    pub warmup_days: usize,
    /// Book after the last replayed day.
    pub final_weights: BTreeMap<Asset, f64>,
    pub final_regimes: Vec<RegimeEntry>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ReplayResult {
    pub fn mean_leverage(&self) -> f64 {
        if self.days.is_empty() {
            return 0.0;
        }
        self.days.iter().map(|d| d.diagnostics.leverage).sum::<f64>() / self.days.len() as f64
    }

    pub fn total_transitions(&self) -> usize {
        self.days.iter().map(|d| d.diagnostics.transitions).sum()
    }
}

/// Tradable today: the asset printed a price today. Names with no price
/// series at all fall back to the `tradable` flag of today's fundamentals.
struct DayTradability<'a> {
    prices: &'a PriceHistory,
    date: NaiveDate,
    listed: BTreeSet<&'a str>,
}

impl rotalab_core::Tradability for DayTradability<'_> {
    fn can_trade(&self, asset: &str) -> bool {
        match self.prices.series(asset) {
            Some(series) => series.has_observation(self.date),
            None => self.listed.contains(asset),
        }
    }
}

/// Load data per `[data]` and replay.
pub fn run_from_config(config: &RunConfig) -> Result<ReplayResult, RunError> {
    let data = load_data(&config.data, &config.strategy)?;
    run_replay(config, &data)
}

/// Replay pre-loaded data. No I/O.
pub fn run_replay(config: &RunConfig, data: &LoadedData) -> Result<ReplayResult, RunError> {
    let mut strategy = RotationStrategy::new(config.strategy.clone(), config.schedule.clone())?;
    let required = config.strategy.required_history();
    let allocation_assets = config.strategy.allocation_assets();

    let days: Vec<NaiveDate> = data
        .prices
        .dates()
        .into_iter()
        .filter(|d| config.data.start.map_or(true, |s| *d >= s))
        .filter(|d| config.data.end.map_or(true, |e| *d <= e))
        .collect();
    if days.is_empty() {
        let show = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        return Err(RunError::NoTradingDays {
            start: show(config.data.start),
            end: show(config.data.end),
        });
    }
    info!(
        run_id = %&config.run_id()[..12],
        days = days.len(),
        first = %days[0],
        last = %days[days.len() - 1],
        "replay started"
    );

    let mut book: BTreeMap<Asset, f64> = BTreeMap::new();
    let mut reports = Vec::new();
    let mut failures = Vec::new();
    let mut skipped = Vec::new();
    let mut warmup_days = 0;

    for date in days {
        let prices = data.prices.as_of(date);
        if allocation_assets.iter().any(|a| prices.depth(a) < required) {
            warmup_days += 1;
            debug!(%date, "warming up");
            continue;
        }

        let fundamentals = data.fundamentals.as_of(date);
        let held: BTreeSet<Asset> = book.keys().cloned().collect();
        let tradable = DayTradability {
            prices: &data.prices,
            date,
            listed: fundamentals
                .iter()
                .filter(|r| r.tradable)
                .map(|r| r.asset.as_str())
                .collect(),
        };
        let inputs = DayInputs {
            date,
            half_day: config.data.half_days.contains(&date),
            prices: &prices,
            fundamentals,
            held: &held,
            tradable: &tradable,
        };

        match strategy.run_day(&inputs) {
            Ok(Some(report)) => {
                apply_targets(&mut book, &report);
                reports.push(report);
            }
            Ok(None) => skipped.push(date),
            Err(e) => {
                warn!(%date, error = %e, "cycle failed");
                failures.push(failure(date, &e));
            }
        }
    }

    info!(
        completed = reports.len(),
        failed = failures.len(),
        skipped = skipped.len(),
        warmup_days,
        "replay finished"
    );

    Ok(ReplayResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config_hash: config.strategy.config_hash(),
        dataset_hash: data.dataset_hash.clone(),
        synthetic: data.synthetic,
        config: config.clone(),
        days: reports,
        failures,
        skipped,
        warmup_days,
        final_weights: book,
        final_regimes: strategy.engine().state().snapshot(),
    })
}

fn failure(date: NaiveDate, error: &CycleError) -> CycleFailure {
    CycleFailure {
        date,
        error: error.to_string(),
    }
}

/// Targets overwrite the book; zero targets close the position.
fn apply_targets(book: &mut BTreeMap<Asset, f64>, report: &DayReport) {
    for (asset, &weight) in &report.weights.targets {
        if weight == 0.0 {
            book.remove(asset);
        } else {
            book.insert(asset.clone(), weight);
        }
    }
}
