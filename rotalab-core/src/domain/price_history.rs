//! Price history — per-asset ordered (date, price) series.
//!
//! The host platform supplies one `PriceHistory` per cycle. Series are
//! validated on construction: prices must be finite and positive, dates
//! strictly ascending. Windows are taken from the newest end.

use super::Asset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// One observation of an asset's price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PriceHistoryError {
    #[error("invalid price {price} for '{asset}' on {date}")]
    InvalidPrice {
        asset: Asset,
        date: NaiveDate,
        price: f64,
    },

    #[error("prices for '{asset}' are not strictly ascending by date at {date}")]
    Unordered { asset: Asset, date: NaiveDate },
}

/// Ordered price series for a single asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a validated series. `asset` is only used for error messages.
    pub fn new(asset: &str, points: Vec<PricePoint>) -> Result<Self, PriceHistoryError> {
        for (i, p) in points.iter().enumerate() {
            if !p.price.is_finite() || p.price <= 0.0 {
                return Err(PriceHistoryError::InvalidPrice {
                    asset: asset.to_string(),
                    date: p.date,
                    price: p.price,
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(PriceHistoryError::Unordered {
                    asset: asset.to_string(),
                    date: p.date,
                });
            }
        }
        Ok(Self { points })
    }

    /// Build a series from bare prices on consecutive calendar days.
    ///
    /// Convenient for tests and benchmarks where dates carry no meaning.
    pub fn from_prices(
        asset: &str,
        start: NaiveDate,
        prices: &[f64],
    ) -> Result<Self, PriceHistoryError> {
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint::new(start + chrono::Duration::days(i as i64), price))
            .collect();
        Self::new(asset, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// The newest `n` prices, oldest first. `None` if fewer than `n` exist.
    pub fn window(&self, n: usize) -> Option<Vec<f64>> {
        if n == 0 || self.points.len() < n {
            return None;
        }
        Some(
            self.points[self.points.len() - n..]
                .iter()
                .map(|p| p.price)
                .collect(),
        )
    }

    /// Truncate to observations on or before `date`.
    pub fn as_of(&self, date: NaiveDate) -> PriceSeries {
        let end = self.points.partition_point(|p| p.date <= date);
        PriceSeries {
            points: self.points[..end].to_vec(),
        }
    }

    /// Whether the series has an observation dated exactly `date`.
    pub fn has_observation(&self, date: NaiveDate) -> bool {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .is_ok()
    }
}

/// Price series for every asset the cycle may touch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    series: BTreeMap<Asset, PriceSeries>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<Asset>, series: PriceSeries) {
        self.series.insert(asset.into(), series);
    }

    /// Build from raw points, validating each series.
    pub fn from_points(
        points: BTreeMap<Asset, Vec<PricePoint>>,
    ) -> Result<Self, PriceHistoryError> {
        let mut history = Self::new();
        for (asset, pts) in points {
            let series = PriceSeries::new(&asset, pts)?;
            history.insert(asset, series);
        }
        Ok(history)
    }

    pub fn series(&self, asset: &str) -> Option<&PriceSeries> {
        self.series.get(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|a| a.as_str())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of observations available for `asset` (0 if unknown).
    pub fn depth(&self, asset: &str) -> usize {
        self.series.get(asset).map_or(0, PriceSeries::len)
    }

    pub fn latest_price(&self, asset: &str) -> Option<f64> {
        self.series.get(asset)?.latest().map(|p| p.price)
    }

    pub fn window(&self, asset: &str, n: usize) -> Option<Vec<f64>> {
        self.series.get(asset)?.window(n)
    }

    /// View of the history as it stood at the end of `date`.
    pub fn as_of(&self, date: NaiveDate) -> PriceHistory {
        PriceHistory {
            series: self
                .series
                .iter()
                .map(|(asset, s)| (asset.clone(), s.as_of(date)))
                .collect(),
        }
    }

    /// Union of all observation dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let all: BTreeSet<NaiveDate> = self
            .series
            .values()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();
        all.into_iter().collect()
    }
}
