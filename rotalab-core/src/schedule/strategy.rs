//! RotationStrategy — the daily cycle wired through the scheduler.
//!
//! Owns the allocation engine (and with it the regime table), the sizer and
//! the factor scorer. Per-day outputs live in a scratch area that is cleared
//! whenever a new day opens, so nothing leaks from one cycle into the next
//! except the committed regimes.

use super::{Phase, RebalanceScheduler, ScheduleConfig};
use crate::config::{ConfigError, StrategyConfig};
use crate::domain::{AllocationVector, Asset, PortfolioWeights, PriceHistory};
use crate::engine::{AllocationEngine, AllocationParams, Reallocation, RegimeEvent};
use crate::error::CycleError;
use crate::factors::{CandidateLists, FactorScorer, FundamentalRecord};
use crate::sizers::{LegWeights, PositionSizer, Rebalance, Tradability};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, info_span};

/// Candidates shown in the diagnostics record, per side.
const HEAD_LEN: usize = 10;

/// Everything one trading day needs. Prices must already be cut at `date`.
pub struct DayInputs<'a> {
    pub date: NaiveDate,
    pub half_day: bool,
    pub prices: &'a PriceHistory,
    pub fundamentals: &'a [FundamentalRecord],
    /// Assets currently carrying a non-zero position.
    pub held: &'a BTreeSet<Asset>,
    pub tradable: &'a dyn Tradability,
}

/// Summary recorded at the close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleDiagnostics {
    pub date: NaiveDate,
    /// Gross exposure of the target book.
    pub leverage: f64,
    pub long_portion: f64,
    pub short_portion: f64,
    pub hedge_portion: f64,
    pub legs: LegWeights,
    /// Weakest names of the long list, lowest combo rank first.
    pub long_head: Vec<Asset>,
    /// Weakest names of the short list, lowest combo rank first.
    pub short_head: Vec<Asset>,
    pub transitions: usize,
    pub regimes_in: usize,
    pub deferred: usize,
}

/// Full output of one completed day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub allocation: AllocationVector,
    pub events: Vec<RegimeEvent>,
    pub candidates: CandidateLists,
    pub weights: PortfolioWeights,
    pub diagnostics: CycleDiagnostics,
}

#[derive(Debug, Clone, Default)]
struct DayScratch {
    candidates: Option<CandidateLists>,
    reallocation: Option<Reallocation>,
    rebalance: Option<Rebalance>,
}

#[derive(Debug, Clone)]
pub struct RotationStrategy {
    config: StrategyConfig,
    engine: AllocationEngine,
    sizer: PositionSizer,
    scorer: FactorScorer,
    scheduler: RebalanceScheduler,
    hedge_assets: Vec<Asset>,
    today: DayScratch,
}

impl RotationStrategy {
    pub fn new(config: StrategyConfig, schedule: ScheduleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        schedule.validate()?;
        Ok(Self {
            engine: AllocationEngine::new(AllocationParams::from(&config)),
            sizer: PositionSizer::from_config(&config),
            scorer: FactorScorer::from_config(&config),
            scheduler: RebalanceScheduler::new(schedule),
            hedge_assets: config.hedge_assets(),
            today: DayScratch::default(),
            config,
        })
    }

    /// Replace the factor scorer (custom registries or screens).
    pub fn with_scorer(mut self, scorer: FactorScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &RebalanceScheduler {
        &self.scheduler
    }

    /// Open a day. Returns `false` when the schedule skips it.
    pub fn begin_day(&mut self, date: NaiveDate, half_day: bool) -> bool {
        self.today = DayScratch::default();
        self.scheduler.begin_day(date, half_day)
    }

    /// Phase 1: score the universe and pick today's long and short lists.
    pub fn prepare_candidates(
        &mut self,
        fundamentals: &[FundamentalRecord],
    ) -> Result<&CandidateLists, CycleError> {
        self.scheduler.advance(Phase::PrepareCandidates)?;
        let lists = self.scorer.candidates(
            fundamentals,
            self.config.long_list_size,
            self.config.short_list_size,
        );
        info!(
            universe = fundamentals.len(),
            long = lists.long.len(),
            short = lists.short.len(),
            "candidates prepared"
        );
        Ok(&*self.today.candidates.insert(lists))
    }

    /// Phase 2: update regimes and compute the allocation vector.
    pub fn reallocate(&mut self, prices: &PriceHistory) -> Result<&Reallocation, CycleError> {
        self.scheduler.advance(Phase::Reallocate)?;
        match self.engine.reallocate(prices) {
            Ok(r) => Ok(&*self.today.reallocation.insert(r)),
            Err(e) => {
                self.scheduler.abort_day();
                Err(e)
            }
        }
    }

    /// Phase 3: size today's target weights.
    pub fn rebalance(
        &mut self,
        held: &BTreeSet<Asset>,
        tradable: &dyn Tradability,
    ) -> Result<&Rebalance, CycleError> {
        self.scheduler.advance(Phase::Rebalance)?;
        let result = self.size(held, tradable);
        match result {
            Ok(r) => Ok(&*self.today.rebalance.insert(r)),
            Err(e) => {
                self.scheduler.abort_day();
                Err(e)
            }
        }
    }

    fn size(
        &self,
        held: &BTreeSet<Asset>,
        tradable: &dyn Tradability,
    ) -> Result<Rebalance, CycleError> {
        let reallocation = self.today.reallocation.as_ref().ok_or(CycleError::MissingPhaseOutput {
            phase: Phase::Rebalance,
            missing: "allocation",
        })?;
        let candidates = self.today.candidates.as_ref().ok_or(CycleError::MissingPhaseOutput {
            phase: Phase::Rebalance,
            missing: "candidates",
        })?;
        self.sizer.rebalance(
            &reallocation.allocation,
            candidates,
            &self.hedge_assets,
            held,
            tradable,
        )
    }

    /// Phase 4: assemble the day's report.
    pub fn record(&mut self, date: NaiveDate) -> Result<DayReport, CycleError> {
        self.scheduler.advance(Phase::Record)?;
        let scratch = std::mem::take(&mut self.today);
        let (Some(candidates), Some(reallocation), Some(rebalance)) =
            (scratch.candidates, scratch.reallocation, scratch.rebalance)
        else {
            self.scheduler.abort_day();
            return Err(CycleError::MissingPhaseOutput {
                phase: Phase::Record,
                missing: "rebalance",
            });
        };

        let diagnostics = CycleDiagnostics {
            date,
            leverage: rebalance.weights.gross_exposure(),
            long_portion: rebalance.portions.long,
            short_portion: rebalance.portions.short,
            hedge_portion: rebalance.portions.hedge,
            legs: rebalance.legs,
            long_head: candidates.long.iter().rev().take(HEAD_LEN).cloned().collect(),
            short_head: candidates.short.iter().rev().take(HEAD_LEN).cloned().collect(),
            transitions: reallocation.events.len(),
            regimes_in: reallocation.regimes_in,
            deferred: rebalance.weights.deferred.len(),
        };
        info!(
            %date,
            leverage = diagnostics.leverage,
            long_portion = diagnostics.long_portion,
            short_portion = diagnostics.short_portion,
            "cycle recorded"
        );

        Ok(DayReport {
            date,
            allocation: reallocation.allocation,
            events: reallocation.events,
            candidates,
            weights: rebalance.weights,
            diagnostics,
        })
    }

    /// Run all four phases for one day. `Ok(None)` when the day is skipped.
    pub fn run_day(&mut self, inputs: &DayInputs<'_>) -> Result<Option<DayReport>, CycleError> {
        let span = info_span!("cycle", date = %inputs.date);
        let _guard = span.enter();

        if !self.begin_day(inputs.date, inputs.half_day) {
            return Ok(None);
        }
        self.prepare_candidates(inputs.fundamentals)?;
        self.reallocate(inputs.prices)?;
        self.rebalance(inputs.held, inputs.tradable)?;
        self.record(inputs.date).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mode, PriceSeries};
    use crate::factors::FundamentalInputs;
    use crate::sizers::AlwaysTradable;
    use crate::stats::assert_approx;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            active_assets: vec!["A".into(), "B".into()],
            hedge_asset: "BOND".into(),
            channels: vec![5, 10],
            volatility_window: 5,
            long_list_size: 2,
            short_list_size: 2,
            roles: Default::default(),
            ..StrategyConfig::default()
        }
    }

    /// Choppy series that breaks out on the final day.
    fn breakout(n: usize) -> Vec<f64> {
        let mut v: Vec<f64> = (0..n - 1)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        v.push(110.0);
        v
    }

    fn prices(n: usize) -> PriceHistory {
        let mut h = PriceHistory::new();
        for asset in ["A", "B", "BOND"] {
            h.insert(asset, PriceSeries::from_prices(asset, date(1), &breakout(n)).unwrap());
        }
        h
    }

    fn fundamentals() -> Vec<FundamentalRecord> {
        (1..=6)
            .map(|i| {
                let x = i as f64;
                FundamentalRecord {
                    asset: format!("S{i}"),
                    inputs: FundamentalInputs {
                        pe_ratio: Some(30.0 - x),
                        ps_ratio: Some(8.0 - x),
                        ebitda: Some(10.0 * x),
                        enterprise_value: Some(500.0),
                        market_cap: Some(400.0),
                        total_debt: Some(110.0 - 10.0 * x),
                        fcf_yield: Some(0.01 * x),
                        total_assets: Some(100.0 * x),
                        common_stock_equity: Some(200.0),
                    },
                    industry_code: None,
                    tradable: true,
                }
            })
            .collect()
    }

    fn strategy() -> RotationStrategy {
        RotationStrategy::new(config(), ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn full_day_produces_report() {
        let mut s = strategy();
        let prices = prices(12);
        let fundamentals = fundamentals();
        let held = BTreeSet::new();
        let inputs = DayInputs {
            date: date(12),
            half_day: false,
            prices: &prices,
            fundamentals: &fundamentals,
            held: &held,
            tradable: &AlwaysTradable,
        };
        let report = s.run_day(&inputs).unwrap().unwrap();

        assert_eq!(report.candidates.long, vec!["S6", "S5"]);
        assert_eq!(report.candidates.short, vec!["S2", "S1"]);
        // every regime entered on the breakout, nothing left for the bond
        assert_eq!(s.engine().state().count_in(), 4);
        assert_eq!(report.allocation.get("BOND"), 0.0);
        assert_approx(report.allocation.total(), 1.0, 1e-9);
        // no short sources configured: all capital is long
        assert_approx(report.diagnostics.long_portion, 1.0, 1e-9);
        assert_approx(report.weights.get("S6").unwrap(), 0.5, 1e-9);
        assert_eq!(report.weights.get("S1"), Some(0.0));
        assert_eq!(report.diagnostics.transitions, 4);
        assert_eq!(report.diagnostics.long_head, vec!["S5", "S6"]);
        assert_eq!(report.diagnostics.short_head, vec!["S1", "S2"]);
        assert_eq!(s.scheduler().pending(), None);
    }

    #[test]
    fn diagnostics_heads_are_capped() {
        let mut cfg = config();
        cfg.long_list_size = 12;
        cfg.short_list_size = 12;
        let mut s = RotationStrategy::new(cfg, ScheduleConfig::default()).unwrap();
        let prices = prices(12);
        let fundamentals: Vec<FundamentalRecord> = (1..=30)
            .map(|i| FundamentalRecord {
                asset: format!("N{i:02}"),
                inputs: FundamentalInputs {
                    pe_ratio: Some(1.0 / i as f64),
                    ps_ratio: Some(1.0 / i as f64),
                    ebitda: Some(i as f64),
                    enterprise_value: Some(100.0),
                    market_cap: Some(100.0),
                    total_debt: Some(100.0 / i as f64),
                    fcf_yield: Some(i as f64),
                    total_assets: Some(i as f64),
                    common_stock_equity: Some(100.0),
                },
                industry_code: None,
                tradable: true,
            })
            .collect();
        let held = BTreeSet::new();
        let report = s
            .run_day(&DayInputs {
                date: date(12),
                half_day: false,
                prices: &prices,
                fundamentals: &fundamentals,
                held: &held,
                tradable: &AlwaysTradable,
            })
            .unwrap()
            .unwrap();
        let d = &report.diagnostics;
        assert_eq!(report.candidates.long[0], "N30");
        assert_eq!(d.long_head.len(), 10);
        // weakest longs: N19 is the 12th-best name
        assert_eq!(d.long_head[0], "N19");
        assert_eq!(d.short_head.len(), 10);
        assert_eq!(d.short_head[0], "N01");
    }

    #[test]
    fn short_source_funds_short_and_hedge_legs() {
        let mut cfg = config();
        cfg.roles.insert("B".into(), crate::domain::AllocationRole::ShortSource);
        let mut s = RotationStrategy::new(cfg, ScheduleConfig::default()).unwrap();
        let prices = prices(12);
        let fundamentals = fundamentals();
        let held = BTreeSet::new();
        let report = s
            .run_day(&DayInputs {
                date: date(12),
                half_day: false,
                prices: &prices,
                fundamentals: &fundamentals,
                held: &held,
                tradable: &AlwaysTradable,
            })
            .unwrap()
            .unwrap();
        let d = &report.diagnostics;
        assert_approx(d.long_portion + d.short_portion, 1.0, 1e-9);
        assert!(d.short_portion > 0.0);
        assert_approx(d.legs.short * 2.0, d.short_portion * 0.5, 1e-12);
        assert_approx(report.weights.get("BOND").unwrap(), d.short_portion * 0.5, 1e-12);
    }

    #[test]
    fn failed_reallocation_aborts_day_and_keeps_regimes() {
        let mut s = strategy();
        let short_prices = prices(6);
        let fundamentals = fundamentals();
        let held = BTreeSet::new();
        let err = s
            .run_day(&DayInputs {
                date: date(6),
                half_day: false,
                prices: &short_prices,
                fundamentals: &fundamentals,
                held: &held,
                tradable: &AlwaysTradable,
            })
            .unwrap_err();
        assert!(matches!(err, CycleError::InsufficientHistory { .. }));
        assert_eq!(s.engine().state().mode("A", 5), Some(Mode::Out));
        assert_eq!(s.scheduler().pending(), None);

        // a later day with enough data runs normally
        let prices = prices(12);
        let report = s
            .run_day(&DayInputs {
                date: date(12),
                half_day: false,
                prices: &prices,
                fundamentals: &fundamentals,
                held: &held,
                tradable: &AlwaysTradable,
            })
            .unwrap();
        assert!(report.is_some());
    }

    #[test]
    fn empty_universe_fails_the_rebalance() {
        let mut s = strategy();
        let prices = prices(12);
        let held = BTreeSet::new();
        let err = s
            .run_day(&DayInputs {
                date: date(12),
                half_day: false,
                prices: &prices,
                fundamentals: &[],
                held: &held,
                tradable: &AlwaysTradable,
            })
            .unwrap_err();
        assert!(matches!(err, CycleError::EmptyCandidates { .. }));
        // the reallocation already committed before sizing failed
        assert_eq!(s.engine().state().count_in(), 4);
    }

    #[test]
    fn phases_called_out_of_order() {
        let mut s = strategy();
        assert!(s.begin_day(date(12), false));
        let err = s.reallocate(&prices(12)).unwrap_err();
        assert_eq!(
            err,
            CycleError::PhaseOrder {
                expected: Phase::PrepareCandidates,
                attempted: Phase::Reallocate,
            }
        );
        assert_eq!(s.engine().state().count_in(), 0);
    }

    #[test]
    fn skipped_half_day() {
        let schedule = ScheduleConfig {
            half_days: false,
            ..ScheduleConfig::default()
        };
        let mut s = RotationStrategy::new(config(), schedule).unwrap();
        let prices = prices(12);
        let fundamentals = fundamentals();
        let held = BTreeSet::new();
        let out = s
            .run_day(&DayInputs {
                date: date(12),
                half_day: true,
                prices: &prices,
                fundamentals: &fundamentals,
                held: &held,
                tradable: &AlwaysTradable,
            })
            .unwrap();
        assert!(out.is_none());
        assert_eq!(s.engine().state().count_in(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = StrategyConfig {
            channels: Vec::new(),
            ..config()
        };
        assert_eq!(
            RotationStrategy::new(cfg, ScheduleConfig::default()).unwrap_err(),
            ConfigError::NoChannels
        );
    }
}
