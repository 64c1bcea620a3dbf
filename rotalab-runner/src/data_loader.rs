//! Price and fundamentals loading for the runner.
//!
//! Inputs are long-format CSV files:
//! - prices: `date,asset,price`, one row per asset per trading day
//! - fundamentals: `date,asset,pe_ratio,ps_ratio,ebitda,enterprise_value,
//!   market_cap,total_debt,fcf_yield,total_assets,common_stock_equity,
//!   industry_code,tradable`; empty cells are missing values
//!
//! Rows may arrive in any order. Each asset's prices are sorted by date and
//! then validated (positive, finite, no duplicate dates).
//!
//! With `data.synthetic = true` nothing is read; deterministic synthetic data
//! is generated instead and the result is tagged as synthetic.

use chrono::NaiveDate;
use rotalab_core::domain::{Asset, PriceHistory, PriceHistoryError, PricePoint};
use rotalab_core::factors::{FundamentalInputs, FundamentalRecord};
use rotalab_core::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DataConfig;
use crate::synthetic;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("csv error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid price data: {0}")]
    Prices(#[from] PriceHistoryError),

    #[error("no price file configured and synthetic data is disabled")]
    NoPriceSource,

    #[error("no prices loaded for active asset '{0}'")]
    MissingAsset(Asset),
}

/// One row of the price file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub asset: Asset,
    pub price: f64,
}

/// One row of the fundamentals file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRow {
    pub date: NaiveDate,
    pub asset: Asset,
    pub pe_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ebitda: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_debt: Option<f64>,
    pub fcf_yield: Option<f64>,
    pub total_assets: Option<f64>,
    pub common_stock_equity: Option<f64>,
    pub industry_code: Option<u64>,
    /// Missing means tradable.
    pub tradable: Option<bool>,
}

impl FundamentalRow {
    pub fn into_record(self) -> (NaiveDate, FundamentalRecord) {
        (
            self.date,
            FundamentalRecord {
                asset: self.asset,
                inputs: FundamentalInputs {
                    pe_ratio: self.pe_ratio,
                    ps_ratio: self.ps_ratio,
                    ebitda: self.ebitda,
                    enterprise_value: self.enterprise_value,
                    market_cap: self.market_cap,
                    total_debt: self.total_debt,
                    fcf_yield: self.fcf_yield,
                    total_assets: self.total_assets,
                    common_stock_equity: self.common_stock_equity,
                },
                industry_code: self.industry_code,
                tradable: self.tradable.unwrap_or(true),
            },
        )
    }

    pub fn from_record(date: NaiveDate, record: &FundamentalRecord) -> Self {
        let f = &record.inputs;
        Self {
            date,
            asset: record.asset.clone(),
            pe_ratio: f.pe_ratio,
            ps_ratio: f.ps_ratio,
            ebitda: f.ebitda,
            enterprise_value: f.enterprise_value,
            market_cap: f.market_cap,
            total_debt: f.total_debt,
            fcf_yield: f.fcf_yield,
            total_assets: f.total_assets,
            common_stock_equity: f.common_stock_equity,
            industry_code: record.industry_code,
            tradable: Some(record.tradable),
        }
    }
}

/// Fundamentals snapshots keyed by publication date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FundamentalsBook {
    snapshots: BTreeMap<NaiveDate, Vec<FundamentalRecord>>,
}

impl FundamentalsBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, record: FundamentalRecord) {
        self.snapshots.entry(date).or_default().push(record);
    }

    /// Latest snapshot published on or before `date`.
    pub fn as_of(&self, date: NaiveDate) -> &[FundamentalRecord] {
        self.snapshots
            .range(..=date)
            .next_back()
            .map(|(_, records)| records.as_slice())
            .unwrap_or(&[])
    }

    pub fn snapshots(&self) -> impl Iterator<Item = (NaiveDate, &[FundamentalRecord])> {
        self.snapshots.iter().map(|(d, r)| (*d, r.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Loaded inputs plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub prices: PriceHistory,
    pub fundamentals: FundamentalsBook,
    /// BLAKE3 over all loaded values.
    pub dataset_hash: String,
    pub synthetic: bool,
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> LoadError + '_ {
    move |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

pub fn read_prices(path: &Path) -> Result<PriceHistory, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error(path))?;
    let mut points: BTreeMap<Asset, Vec<PricePoint>> = BTreeMap::new();
    for row in reader.deserialize::<PriceRow>() {
        let row = row.map_err(csv_error(path))?;
        points
            .entry(row.asset)
            .or_default()
            .push(PricePoint::new(row.date, row.price));
    }
    for series in points.values_mut() {
        series.sort_by_key(|p| p.date);
    }
    Ok(PriceHistory::from_points(points)?)
}

pub fn read_fundamentals(path: &Path) -> Result<FundamentalsBook, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error(path))?;
    let mut book = FundamentalsBook::new();
    for row in reader.deserialize::<FundamentalRow>() {
        let (date, record) = row.map_err(csv_error(path))?.into_record();
        book.insert(date, record);
    }
    Ok(book)
}

pub fn write_prices(path: &Path, prices: &PriceHistory) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;
    for asset in prices.assets() {
        let Some(series) = prices.series(asset) else {
            continue;
        };
        for p in series.points() {
            writer
                .serialize(PriceRow {
                    date: p.date,
                    asset: asset.to_string(),
                    price: p.price,
                })
                .map_err(csv_error(path))?;
        }
    }
    writer
        .flush()
        .map_err(|e| csv_error(path)(csv::Error::from(e)))
}

pub fn write_fundamentals(path: &Path, book: &FundamentalsBook) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;
    for (date, records) in book.snapshots() {
        for r in records {
            writer
                .serialize(FundamentalRow::from_record(date, r))
                .map_err(csv_error(path))?;
        }
    }
    writer
        .flush()
        .map_err(|e| csv_error(path)(csv::Error::from(e)))
}

/// Load everything the replay needs according to `[data]`.
pub fn load_data(data: &DataConfig, strategy: &StrategyConfig) -> Result<LoadedData, LoadError> {
    let (prices, fundamentals) = if data.synthetic {
        warn!("generating synthetic data, results will be tagged as synthetic");
        let start = data
            .start
            .unwrap_or_else(synthetic::default_start)
            // lookbacks need history before the first replayed day
            - chrono::Duration::days(2 * strategy.required_history() as i64);
        let end = data.end.unwrap_or_else(synthetic::default_end);
        synthetic::generate(strategy, data.synthetic_universe, start, end)?
    } else {
        let path = data.prices.as_deref().ok_or(LoadError::NoPriceSource)?;
        let prices = read_prices(path)?;
        let fundamentals = match &data.fundamentals {
            Some(p) => read_fundamentals(p)?,
            None => {
                warn!("no fundamentals file, candidate lists will be empty");
                FundamentalsBook::new()
            }
        };
        (prices, fundamentals)
    };

    for asset in strategy.allocation_assets() {
        if prices.series(&asset).is_none() {
            return Err(LoadError::MissingAsset(asset));
        }
    }

    let dataset_hash = compute_dataset_hash(&prices, &fundamentals);
    info!(
        assets = prices.len(),
        snapshots = fundamentals.len(),
        hash = %&dataset_hash[..12],
        "data loaded"
    );
    Ok(LoadedData {
        prices,
        fundamentals,
        dataset_hash,
        synthetic: data.synthetic,
    })
}

/// Deterministic BLAKE3 hash over prices and fundamentals, in asset order.
pub fn compute_dataset_hash(prices: &PriceHistory, fundamentals: &FundamentalsBook) -> String {
    let mut hasher = blake3::Hasher::new();
    for asset in prices.assets() {
        hasher.update(asset.as_bytes());
        if let Some(series) = prices.series(asset) {
            for p in series.points() {
                hasher.update(p.date.to_string().as_bytes());
                hasher.update(&p.price.to_le_bytes());
            }
        }
    }
    for (date, records) in fundamentals.snapshots() {
        hasher.update(date.to_string().as_bytes());
        for r in records {
            // field order is fixed by the struct, so JSON is stable
            hasher.update(serde_json::to_string(r).unwrap_or_default().as_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
