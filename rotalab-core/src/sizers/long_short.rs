//! Long/short sizer driven by role-tagged allocation portions.
//!
//! - long portion  = Σ allocation entries tagged `LongContributor`
//! - short portion = Σ entries tagged `ShortSource`
//! - hedge portion = Σ entries tagged `Hedge`
//!
//! The short portion is split: `short_split` goes to the short list, the rest
//! joins the hedge portion on the hedge assets. Each leg is spread evenly
//! over its list, so the emitted magnitudes always add back up to the
//! allocated capital.

use super::Tradability;
use crate::config::StrategyConfig;
use crate::domain::{AllocationRole, AllocationVector, Asset, PortfolioWeights};
use crate::error::{CandidateSide, CycleError};
use crate::factors::CandidateLists;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Capital per role, summed from the allocation vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Portions {
    pub long: f64,
    pub short: f64,
    pub hedge: f64,
}

impl Portions {
    pub fn total(&self) -> f64 {
        self.long + self.short + self.hedge
    }
}

/// Per-asset weight magnitude of each leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LegWeights {
    pub long: f64,
    pub short: f64,
    pub hedge: f64,
}

/// Output of one rebalance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rebalance {
    pub portions: Portions,
    pub legs: LegWeights,
    pub weights: PortfolioWeights,
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    roles: BTreeMap<Asset, AllocationRole>,
    short_split: f64,
}

impl PositionSizer {
    pub fn new(roles: BTreeMap<Asset, AllocationRole>, short_split: f64) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&short_split),
            "short_split must be in [0, 1]"
        );
        Self { roles, short_split }
    }

    pub fn from_config(cfg: &StrategyConfig) -> Self {
        Self::new(cfg.roles.clone(), cfg.short_split)
    }

    pub fn role_of(&self, asset: &str) -> AllocationRole {
        self.roles.get(asset).copied().unwrap_or_default()
    }

    pub fn portions(&self, allocation: &AllocationVector) -> Portions {
        let mut p = Portions::default();
        for (asset, weight) in allocation.iter() {
            match self.role_of(asset) {
                AllocationRole::LongContributor => p.long += weight,
                AllocationRole::ShortSource => p.short += weight,
                AllocationRole::Hedge => p.hedge += weight,
            }
        }
        p
    }

    /// Spread each portion over its list. Every list must be non-empty.
    pub fn leg_weights(
        &self,
        portions: &Portions,
        n_long: usize,
        n_short: usize,
        n_hedge: usize,
    ) -> Result<LegWeights, CycleError> {
        for (n, side) in [
            (n_long, CandidateSide::Long),
            (n_short, CandidateSide::Short),
            (n_hedge, CandidateSide::Hedge),
        ] {
            if n == 0 {
                return Err(CycleError::EmptyCandidates { side });
            }
        }
        let short_leg = portions.short * self.short_split;
        let hedge_leg = portions.short - short_leg + portions.hedge;
        Ok(LegWeights {
            long: portions.long / n_long as f64,
            short: short_leg / n_short as f64,
            hedge: hedge_leg / n_hedge as f64,
        })
    }

    /// Target weights for today.
    ///
    /// Longs get `+legs.long`, shorts `-legs.short`, hedge assets `+legs.hedge`.
    /// Held assets outside all three lists are flattened to 0. Any order on a
    /// non-tradable asset is withheld and listed in `deferred`.
    pub fn rebalance(
        &self,
        allocation: &AllocationVector,
        candidates: &CandidateLists,
        hedge_assets: &[Asset],
        held: &BTreeSet<Asset>,
        tradable: &dyn Tradability,
    ) -> Result<Rebalance, CycleError> {
        let portions = self.portions(allocation);
        let legs = self.leg_weights(
            &portions,
            candidates.long.len(),
            candidates.short.len(),
            hedge_assets.len(),
        )?;

        let mut targeted: BTreeSet<&str> = BTreeSet::new();
        for asset in candidates
            .long
            .iter()
            .chain(&candidates.short)
            .chain(hedge_assets)
        {
            if !targeted.insert(asset.as_str()) {
                return Err(CycleError::OverlappingCandidates {
                    asset: asset.clone(),
                });
            }
        }

        info!(
            long_portion = portions.long,
            short_portion = portions.short,
            hedge_portion = portions.hedge,
            long_weight = legs.long,
            short_weight = legs.short,
            hedge_weight = legs.hedge,
            "sizing"
        );

        let mut weights = PortfolioWeights::new();
        let orders = candidates
            .long
            .iter()
            .map(|a| (a, legs.long))
            .chain(candidates.short.iter().map(|a| (a, -legs.short)))
            .chain(hedge_assets.iter().map(|a| (a, legs.hedge)));
        for (asset, weight) in orders {
            emit(&mut weights, tradable, asset, weight);
        }

        for asset in held {
            if !targeted.contains(asset.as_str()) {
                emit(&mut weights, tradable, asset, 0.0);
            }
        }

        Ok(Rebalance {
            portions,
            legs,
            weights,
        })
    }
}

fn emit(weights: &mut PortfolioWeights, tradable: &dyn Tradability, asset: &Asset, weight: f64) {
    if tradable.can_trade(asset) {
        debug!(%asset, weight, "target");
        weights.set(asset.clone(), weight);
    } else {
        warn!(%asset, weight, "not tradable today, order deferred");
        weights.defer(asset.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizers::{AlwaysTradable, TradableSet};
    use crate::stats::assert_approx;

    fn list(assets: &[&str]) -> Vec<Asset> {
        assets.iter().map(|a| a.to_string()).collect()
    }

    fn sizer() -> PositionSizer {
        let mut roles = BTreeMap::new();
        roles.insert("D".to_string(), AllocationRole::ShortSource);
        PositionSizer::new(roles, 0.5)
    }

    fn allocation() -> AllocationVector {
        let mut v = AllocationVector::zeroed(["A", "B", "C", "D", "BOND"]);
        v.add("A", 0.2);
        v.add("B", 0.1);
        v.add("C", 0.1);
        v.add("D", 0.2);
        v.add("BOND", 0.4);
        v
    }

    fn candidates() -> CandidateLists {
        CandidateLists {
            long: list(&["L1", "L2", "L3", "L4"]),
            short: list(&["S1", "S2"]),
        }
    }

    #[test]
    fn portions_follow_roles_not_positions() {
        let p = sizer().portions(&allocation());
        // bond counts as a long contributor by default
        assert_approx(p.long, 0.8, 1e-12);
        assert_approx(p.short, 0.2, 1e-12);
        assert_eq!(p.hedge, 0.0);
    }

    #[test]
    fn weights_for_each_leg() {
        let r = sizer()
            .rebalance(
                &allocation(),
                &candidates(),
                &list(&["BOND"]),
                &BTreeSet::new(),
                &AlwaysTradable,
            )
            .unwrap();
        assert_approx(r.legs.long, 0.2, 1e-12);
        assert_approx(r.legs.short, 0.05, 1e-12);
        assert_approx(r.legs.hedge, 0.1, 1e-12);
        assert_approx(r.weights.get("L1").unwrap(), 0.2, 1e-12);
        assert_approx(r.weights.get("S2").unwrap(), -0.05, 1e-12);
        assert_approx(r.weights.get("BOND").unwrap(), 0.1, 1e-12);
        assert_eq!(r.weights.len(), 7);
    }

    #[test]
    fn capital_is_conserved() {
        let c = candidates();
        let hedge = list(&["BOND", "SHY"]);
        let r = sizer()
            .rebalance(&allocation(), &c, &hedge, &BTreeSet::new(), &AlwaysTradable)
            .unwrap();
        let reconstructed = r.legs.long * c.long.len() as f64
            + r.legs.short * c.short.len() as f64
            + r.legs.hedge * hedge.len() as f64;
        assert_approx(reconstructed, r.portions.total(), 1e-12);
    }

    #[test]
    fn hedge_role_feeds_hedge_leg() {
        let mut roles = BTreeMap::new();
        roles.insert("D".to_string(), AllocationRole::ShortSource);
        roles.insert("BOND".to_string(), AllocationRole::Hedge);
        let s = PositionSizer::new(roles, 0.5);
        let r = s
            .rebalance(
                &allocation(),
                &candidates(),
                &list(&["BOND"]),
                &BTreeSet::new(),
                &AlwaysTradable,
            )
            .unwrap();
        assert_approx(r.portions.hedge, 0.4, 1e-12);
        assert_approx(r.legs.hedge, 0.5, 1e-12);
        assert_approx(r.legs.long, 0.1, 1e-12);
    }

    #[test]
    fn empty_short_list_is_an_error() {
        let c = CandidateLists {
            long: list(&["L1"]),
            short: Vec::new(),
        };
        let err = sizer()
            .rebalance(&allocation(), &c, &list(&["BOND"]), &BTreeSet::new(), &AlwaysTradable)
            .unwrap_err();
        assert_eq!(
            err,
            CycleError::EmptyCandidates {
                side: CandidateSide::Short
            }
        );
    }

    #[test]
    fn empty_long_and_hedge_lists_are_errors() {
        let c = CandidateLists {
            long: Vec::new(),
            short: list(&["S1"]),
        };
        let err = sizer()
            .rebalance(&allocation(), &c, &list(&["BOND"]), &BTreeSet::new(), &AlwaysTradable)
            .unwrap_err();
        assert!(matches!(err, CycleError::EmptyCandidates { side: CandidateSide::Long }));

        let err = sizer()
            .rebalance(&allocation(), &candidates(), &[], &BTreeSet::new(), &AlwaysTradable)
            .unwrap_err();
        assert!(matches!(err, CycleError::EmptyCandidates { side: CandidateSide::Hedge }));
    }

    #[test]
    fn overlapping_lists_are_rejected() {
        let c = CandidateLists {
            long: list(&["X", "L2"]),
            short: list(&["X"]),
        };
        let err = sizer()
            .rebalance(&allocation(), &c, &list(&["BOND"]), &BTreeSet::new(), &AlwaysTradable)
            .unwrap_err();
        assert_eq!(err, CycleError::OverlappingCandidates { asset: "X".into() });
    }

    #[test]
    fn stale_tradable_holding_is_flattened() {
        let held: BTreeSet<Asset> = list(&["OLD", "L1"]).into_iter().collect();
        let r = sizer()
            .rebalance(&allocation(), &candidates(), &list(&["BOND"]), &held, &AlwaysTradable)
            .unwrap();
        assert_eq!(r.weights.get("OLD"), Some(0.0));
        // still a candidate, so not flattened
        assert_approx(r.weights.get("L1").unwrap(), 0.2, 1e-12);
        assert!(r.weights.deferred.is_empty());
    }

    #[test]
    fn untradable_orders_are_deferred() {
        let held: BTreeSet<Asset> = list(&["OLD"]).into_iter().collect();
        let tradable = TradableSet::new(["L1", "L2", "L3", "S1", "S2", "BOND"]);
        let r = sizer()
            .rebalance(&allocation(), &candidates(), &list(&["BOND"]), &held, &tradable)
            .unwrap();
        assert_eq!(r.weights.get("OLD"), None);
        assert_eq!(r.weights.get("L4"), None);
        assert_eq!(r.weights.deferred, list(&["L4", "OLD"]));
        // denominators still count the deferred long
        assert_approx(r.legs.long, 0.2, 1e-12);
    }
}
