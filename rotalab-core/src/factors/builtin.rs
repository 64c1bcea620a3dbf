//! Built-in value factors.

use super::{Factor, FundamentalInputs};

pub const STANDARD: [Factor; 6] = [
    Factor::new("earnings_yield", earnings_yield),
    Factor::new("sales_yield", sales_yield),
    Factor::new("ebitda_yield", ebitda_yield),
    Factor::new("debt_coverage", debt_coverage),
    Factor::new("fcf_yield", fcf_yield),
    Factor::new("adjusted_book_to_market", adjusted_book_to_market),
];

fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let den = den?;
    if den == 0.0 {
        return None;
    }
    Some(num? / den)
}

/// 1 / P/E
pub fn earnings_yield(f: &FundamentalInputs) -> Option<f64> {
    ratio(Some(1.0), f.pe_ratio)
}

/// 1 / P/S
pub fn sales_yield(f: &FundamentalInputs) -> Option<f64> {
    ratio(Some(1.0), f.ps_ratio)
}

/// EBITDA / EV
pub fn ebitda_yield(f: &FundamentalInputs) -> Option<f64> {
    ratio(f.ebitda, f.enterprise_value)
}

/// Market cap / total debt
pub fn debt_coverage(f: &FundamentalInputs) -> Option<f64> {
    ratio(f.market_cap, f.total_debt)
}

pub fn fcf_yield(f: &FundamentalInputs) -> Option<f64> {
    f.fcf_yield
}

/// (total assets + 0.1 · (market cap − common equity)) / market cap
pub fn adjusted_book_to_market(f: &FundamentalInputs) -> Option<f64> {
    let adj_book = f.total_assets? + 0.1 * (f.market_cap? - f.common_stock_equity?);
    ratio(Some(adj_book), f.market_cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::assert_approx;

    fn inputs() -> FundamentalInputs {
        FundamentalInputs {
            pe_ratio: Some(20.0),
            ps_ratio: Some(4.0),
            ebitda: Some(50.0),
            enterprise_value: Some(500.0),
            market_cap: Some(400.0),
            total_debt: Some(100.0),
            fcf_yield: Some(0.05),
            total_assets: Some(300.0),
            common_stock_equity: Some(200.0),
        }
    }

    #[test]
    fn ratios() {
        let f = inputs();
        assert_approx(earnings_yield(&f).unwrap(), 0.05, 1e-12);
        assert_approx(sales_yield(&f).unwrap(), 0.25, 1e-12);
        assert_approx(ebitda_yield(&f).unwrap(), 0.1, 1e-12);
        assert_approx(debt_coverage(&f).unwrap(), 4.0, 1e-12);
        assert_approx(fcf_yield(&f).unwrap(), 0.05, 1e-12);
        // (300 + 0.1 * (400 - 200)) / 400 = 320 / 400
        assert_approx(adjusted_book_to_market(&f).unwrap(), 0.8, 1e-12);
    }

    #[test]
    fn zero_denominator_is_undefined() {
        let f = FundamentalInputs {
            pe_ratio: Some(0.0),
            total_debt: Some(0.0),
            ..inputs()
        };
        assert_eq!(earnings_yield(&f), None);
        assert_eq!(debt_coverage(&f), None);
    }

    #[test]
    fn missing_field_is_undefined() {
        let f = FundamentalInputs {
            common_stock_equity: None,
            ..inputs()
        };
        assert_eq!(adjusted_book_to_market(&f), None);
    }
}
