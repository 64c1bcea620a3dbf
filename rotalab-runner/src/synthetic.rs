//! Deterministic synthetic prices and fundamentals.
//!
//! A developer-only data source: every series is seeded from the BLAKE3
//! hash of its asset id, so the same config always yields the same data.
//! Results produced from it are tagged as synthetic.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rotalab_core::domain::{PriceHistory, PriceHistoryError, PricePoint, PriceSeries};
use rotalab_core::factors::{FundamentalInputs, FundamentalRecord};
use rotalab_core::StrategyConfig;

use crate::data_loader::FundamentalsBook;

/// Industry codes drawn for synthetic names. The first two match the
/// default exclusion list, so the screen has something to remove.
const INDUSTRIES: [u64; 6] = [10319042, 20532078, 30110010, 35201020, 45102010, 55105010];

pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 2).unwrap_or_default()
}

pub fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 12, 31).unwrap_or_default()
}

fn seeded(key: &str) -> StdRng {
    let seed: [u8; 32] = *blake3::hash(key.as_bytes()).as_bytes();
    StdRng::from_seed(seed)
}

/// Weekdays in `[start, end]`.
pub fn trading_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(current);
        }
        current += Duration::days(1);
    }
    days
}

/// Random walk with slowly rotating drift, so breakouts and breakdowns occur.
pub fn price_path(asset: &str, days: &[NaiveDate]) -> Vec<PricePoint> {
    let mut rng = seeded(asset);
    let cycle: f64 = rng.gen_range(120.0..360.0);
    let phase: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    let mut price: f64 = rng.gen_range(20.0..200.0);

    days.iter()
        .enumerate()
        .map(|(i, &date)| {
            let drift = 0.0015 * ((i as f64 / cycle) * std::f64::consts::TAU + phase).sin();
            let shock: f64 = rng.gen_range(-0.015..0.015);
            price *= 1.0 + drift + shock;
            PricePoint::new(date, price)
        })
        .collect()
}

fn fundamentals_for(asset: &str, month: NaiveDate) -> FundamentalRecord {
    let mut rng = seeded(&format!("{asset}:{}", month.format("%Y-%m")));
    let market_cap: f64 = rng.gen_range(500.0..50_000.0);
    FundamentalRecord {
        asset: asset.to_string(),
        inputs: FundamentalInputs {
            pe_ratio: Some(rng.gen_range(5.0..40.0)),
            ps_ratio: Some(rng.gen_range(0.3..10.0)),
            ebitda: Some(market_cap * rng.gen_range(0.02..0.2)),
            enterprise_value: Some(market_cap * rng.gen_range(0.9..1.6)),
            market_cap: Some(market_cap),
            total_debt: Some(market_cap * rng.gen_range(0.05..0.8)),
            fcf_yield: Some(rng.gen_range(-0.02..0.12)),
            total_assets: Some(market_cap * rng.gen_range(0.3..2.0)),
            common_stock_equity: Some(market_cap * rng.gen_range(0.2..0.9)),
        },
        industry_code: Some(INDUSTRIES[rng.gen_range(0..INDUSTRIES.len())]),
        tradable: rng.gen_bool(0.97),
    }
}

/// Names of the synthetic factor universe.
pub fn universe_names(size: usize) -> Vec<String> {
    (0..size).map(|i| format!("SYN{i:03}")).collect()
}

/// Prices for every allocation asset and universe name, plus monthly
/// fundamentals snapshots published on each month's first trading day.
pub fn generate(
    strategy: &StrategyConfig,
    universe: usize,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(PriceHistory, FundamentalsBook), PriceHistoryError> {
    let days = trading_days(start, end);
    let names = universe_names(universe);

    let mut prices = PriceHistory::new();
    for asset in strategy.allocation_assets().iter().chain(&names) {
        let series = PriceSeries::new(asset, price_path(asset, &days))?;
        prices.insert(asset.clone(), series);
    }

    let mut book = FundamentalsBook::new();
    let mut last_month = None;
    for &day in &days {
        let month = (day.year(), day.month());
        if last_month == Some(month) {
            continue;
        }
        last_month = Some(month);
        for name in &names {
            book.insert(day, fundamentals_for(name, day));
        }
    }
    Ok((prices, book))
}
