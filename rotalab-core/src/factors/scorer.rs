//! FactorScorer — screen, rank, combine and select long/short candidates.

use super::{FactorRegistry, FundamentalRecord};
use crate::config::StrategyConfig;
use crate::domain::Asset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Combined score of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredAsset {
    pub asset: Asset,
    /// Sum of the per-factor ranks.
    pub combo: f64,
    /// Ordinal rank of `combo` (1 = worst).
    pub rank: usize,
}

/// Long and short candidate lists for one day. Disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateLists {
    /// Best first.
    pub long: Vec<Asset>,
    /// Worst last.
    pub short: Vec<Asset>,
}

impl CandidateLists {
    pub fn contains(&self, asset: &str) -> bool {
        self.long.iter().chain(self.short.iter()).any(|a| a == asset)
    }
}

/// Ranked universe, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    ranked: Vec<ScoredAsset>,
}

impl FactorScores {
    pub fn ranked(&self) -> &[ScoredAsset] {
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Top `long_k` as longs, bottom `short_k` as shorts.
    ///
    /// When the universe is smaller than both lists together, the short list
    /// only takes what the long list left over.
    pub fn select(&self, long_k: usize, short_k: usize) -> CandidateLists {
        let n = self.ranked.len();
        let long_n = long_k.min(n);
        let short_n = short_k.min(n - long_n);
        CandidateLists {
            long: self.ranked[..long_n].iter().map(|s| s.asset.clone()).collect(),
            short: self.ranked[n - short_n..]
                .iter()
                .map(|s| s.asset.clone())
                .collect(),
        }
    }
}

/// Ordinal ranks (1-based, ascending) of the defined values; ties keep input order.
fn ordinal_ranks(values: &[Option<f64>]) -> Vec<Option<usize>> {
    let mut idx: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    idx.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![None; values.len()];
    for (rank, (i, _)) in idx.into_iter().enumerate() {
        ranks[i] = Some(rank + 1);
    }
    ranks
}

#[derive(Debug, Clone)]
pub struct FactorScorer {
    registry: FactorRegistry,
    excluded_industries: BTreeSet<u64>,
}

impl FactorScorer {
    pub fn new(registry: FactorRegistry, excluded_industries: impl IntoIterator<Item = u64>) -> Self {
        Self {
            registry,
            excluded_industries: excluded_industries.into_iter().collect(),
        }
    }

    /// Standard six-factor scorer with the configured industry exclusions.
    pub fn from_config(cfg: &StrategyConfig) -> Self {
        Self::new(
            FactorRegistry::standard(),
            cfg.excluded_industries.iter().copied(),
        )
    }

    pub fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    /// Tradable and not in an excluded industry.
    pub fn passes_screen(&self, record: &FundamentalRecord) -> bool {
        record.tradable
            && !record
                .industry_code
                .is_some_and(|code| self.excluded_industries.contains(&code))
    }

    /// Rank every factor over the screened universe, sum the ranks, re-rank.
    ///
    /// Assets with any undefined factor are dropped from the result.
    pub fn score(&self, records: &[FundamentalRecord]) -> FactorScores {
        let mut universe: Vec<&FundamentalRecord> =
            records.iter().filter(|r| self.passes_screen(r)).collect();
        universe.sort_by(|a, b| a.asset.cmp(&b.asset));
        universe.dedup_by(|a, b| a.asset == b.asset);

        let mut combos: Vec<Option<f64>> = vec![Some(0.0); universe.len()];
        for factor in self.registry.factors() {
            let values: Vec<Option<f64>> =
                universe.iter().map(|r| factor.evaluate(&r.inputs)).collect();
            for (combo, rank) in combos.iter_mut().zip(ordinal_ranks(&values)) {
                *combo = match (*combo, rank) {
                    (Some(c), Some(r)) => Some(c + r as f64),
                    _ => None,
                };
            }
        }

        let combo_ranks = ordinal_ranks(&combos);
        let mut ranked: Vec<ScoredAsset> = universe
            .iter()
            .zip(combos.iter().zip(combo_ranks))
            .filter_map(|(r, (combo, rank))| {
                Some(ScoredAsset {
                    asset: r.asset.clone(),
                    combo: (*combo)?,
                    rank: rank?,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.rank.cmp(&a.rank));
        FactorScores { ranked }
    }

    pub fn candidates(
        &self,
        records: &[FundamentalRecord],
        long_k: usize,
        short_k: usize,
    ) -> CandidateLists {
        self.score(records).select(long_k, short_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FundamentalInputs;

    fn record(asset: &str, cap: Option<f64>) -> FundamentalRecord {
        FundamentalRecord {
            asset: asset.into(),
            inputs: FundamentalInputs {
                market_cap: cap,
                ..FundamentalInputs::default()
            },
            industry_code: None,
            tradable: true,
        }
    }

    fn cap_scorer() -> FactorScorer {
        FactorScorer::new(FactorRegistry::new().register("cap", |f| f.market_cap), [])
    }

    fn universe() -> Vec<FundamentalRecord> {
        vec![
            record("C", Some(3.0)),
            record("A", Some(1.0)),
            record("E", Some(5.0)),
            record("B", Some(2.0)),
            record("D", Some(4.0)),
        ]
    }

    #[test]
    fn ordinal_ranks_skip_undefined() {
        let r = ordinal_ranks(&[Some(3.0), None, Some(1.0), Some(3.0)]);
        assert_eq!(r, vec![Some(2), None, Some(1), Some(3)]);
    }

    #[test]
    fn ranks_best_first() {
        let scores = cap_scorer().score(&universe());
        let order: Vec<&str> = scores.ranked().iter().map(|s| s.asset.as_str()).collect();
        assert_eq!(order, vec!["E", "D", "C", "B", "A"]);
        assert_eq!(scores.ranked()[0].rank, 5);
    }

    #[test]
    fn select_top_and_bottom() {
        let lists = cap_scorer().candidates(&universe(), 2, 2);
        assert_eq!(lists.long, vec!["E", "D"]);
        assert_eq!(lists.short, vec!["B", "A"]);
    }

    #[test]
    fn small_universe_keeps_lists_disjoint() {
        let lists = cap_scorer().candidates(&universe(), 3, 3);
        assert_eq!(lists.long, vec!["E", "D", "C"]);
        assert_eq!(lists.short, vec!["B", "A"]);
        for a in &lists.long {
            assert!(!lists.short.contains(a));
        }
    }

    #[test]
    fn undefined_factor_drops_asset() {
        let mut u = universe();
        u.push(record("Z", None));
        let scores = cap_scorer().score(&u);
        assert_eq!(scores.len(), 5);
        assert!(scores.ranked().iter().all(|s| s.asset != "Z"));
    }

    #[test]
    fn screen_removes_excluded_industry_and_untradable() {
        let scorer = FactorScorer::new(FactorRegistry::new().register("cap", |f| f.market_cap), [42]);
        let mut u = universe();
        u[0].industry_code = Some(42); // C
        u[1].tradable = false; // A
        let scores = scorer.score(&u);
        let order: Vec<&str> = scores.ranked().iter().map(|s| s.asset.as_str()).collect();
        assert_eq!(order, vec!["E", "D", "B"]);
    }

    #[test]
    fn combined_rank_sums_factors() {
        // X wins on cap, Y wins on fcf twice as hard as Z; Y is best overall.
        let scorer = FactorScorer::new(
            FactorRegistry::new()
                .register("cap", |f| f.market_cap)
                .register("fcf", |f| f.fcf_yield)
                .register("fcf_again", |f| f.fcf_yield),
            [],
        );
        let mk = |asset: &str, cap: f64, fcf: f64| FundamentalRecord {
            asset: asset.into(),
            inputs: FundamentalInputs {
                market_cap: Some(cap),
                fcf_yield: Some(fcf),
                ..FundamentalInputs::default()
            },
            industry_code: None,
            tradable: true,
        };
        let scores = scorer.score(&[mk("X", 3.0, 0.01), mk("Y", 2.0, 0.09), mk("Z", 1.0, 0.05)]);
        // X: 3 + 1 + 1 = 5, Y: 2 + 3 + 3 = 8, Z: 1 + 2 + 2 = 5 (tie X/Z keeps asset order)
        let order: Vec<&str> = scores.ranked().iter().map(|s| s.asset.as_str()).collect();
        assert_eq!(order, vec!["Y", "Z", "X"]);
        assert_eq!(scores.ranked()[0].combo, 8.0);
    }

    #[test]
    fn duplicate_records_are_scored_once() {
        let mut u = universe();
        u.push(record("A", Some(1.0)));
        assert_eq!(cap_scorer().score(&u).len(), 5);
    }

    #[test]
    fn empty_universe_selects_nothing() {
        let lists = cap_scorer().candidates(&[], 20, 20);
        assert!(lists.long.is_empty());
        assert!(lists.short.is_empty());
    }
}
