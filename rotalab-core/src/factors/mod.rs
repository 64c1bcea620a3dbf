//! Fundamental factor scoring.
//!
//! A factor is a plain function from one asset's fundamentals to a score.
//! Factors are registered in an ordered list, ranked independently across
//! the screened universe, and combined by summing ranks and re-ranking.

pub mod builtin;
pub mod scorer;

pub use scorer::{CandidateLists, FactorScorer, FactorScores, ScoredAsset};

use crate::domain::Asset;
use serde::{Deserialize, Serialize};

/// Raw fundamental fields for one asset on one day. Missing values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalInputs {
    pub pe_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ebitda: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_debt: Option<f64>,
    pub fcf_yield: Option<f64>,
    pub total_assets: Option<f64>,
    pub common_stock_equity: Option<f64>,
}

/// One member of the factor universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    pub asset: Asset,
    pub inputs: FundamentalInputs,
    pub industry_code: Option<u64>,
    /// Whether the asset belongs to today's tradable base universe.
    pub tradable: bool,
}

/// Signature shared by every factor. `None` means undefined for this asset.
pub type FactorFn = fn(&FundamentalInputs) -> Option<f64>;

#[derive(Debug, Clone, Copy)]
pub struct Factor {
    pub name: &'static str,
    pub compute: FactorFn,
}

impl Factor {
    pub const fn new(name: &'static str, compute: FactorFn) -> Self {
        Self { name, compute }
    }

    /// Evaluate, mapping non-finite results to `None`.
    pub fn evaluate(&self, inputs: &FundamentalInputs) -> Option<f64> {
        (self.compute)(inputs).filter(|v| v.is_finite())
    }
}

/// Ordered list of factors combined by the scorer.
#[derive(Debug, Clone, Default)]
pub struct FactorRegistry {
    factors: Vec<Factor>,
}

impl FactorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six value factors: earnings yield, sales yield, EBITDA yield,
    /// debt coverage, free-cash-flow yield, adjusted book-to-market.
    pub fn standard() -> Self {
        Self {
            factors: builtin::STANDARD.to_vec(),
        }
    }

    pub fn register(mut self, name: &'static str, compute: FactorFn) -> Self {
        self.factors.push(Factor::new(name, compute));
        self
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factors.iter().map(|f| f.name).collect()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_order() {
        let reg = FactorRegistry::standard();
        assert_eq!(
            reg.names(),
            vec![
                "earnings_yield",
                "sales_yield",
                "ebitda_yield",
                "debt_coverage",
                "fcf_yield",
                "adjusted_book_to_market",
            ]
        );
    }

    #[test]
    fn evaluate_drops_non_finite() {
        let f = Factor::new("inf", |_| Some(f64::INFINITY));
        assert_eq!(f.evaluate(&FundamentalInputs::default()), None);
    }

    #[test]
    fn register_appends() {
        let reg = FactorRegistry::new().register("const", |_| Some(1.0));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.factors()[0].evaluate(&FundamentalInputs::default()), Some(1.0));
    }
}
