//! Cycle-scoped errors.
//!
//! Any of these aborts the current day's cycle only. Regime state committed
//! by the last successful reallocation stays valid for the next day.

use crate::domain::{Asset, RegimeKey};
use crate::schedule::Phase;
use std::fmt;
use thiserror::Error;

/// Which candidate set an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSide {
    Long,
    Short,
    Hedge,
}

impl fmt::Display for CandidateSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Hedge => write!(f, "hedge"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    #[error("no price history for '{asset}'")]
    MissingHistory { asset: Asset },

    #[error("insufficient history for '{asset}': need {required} prices, have {available}")]
    InsufficientHistory {
        asset: Asset,
        required: usize,
        available: usize,
    },

    #[error("degenerate volatility for '{asset}': {volatility}")]
    DegenerateVolatility { asset: Asset, volatility: f64 },

    #[error("cannot compute channel thresholds for {key}")]
    ThresholdUnavailable { key: RegimeKey },

    #[error("regime key {key} is not tracked")]
    UnknownRegime { key: RegimeKey },

    #[error("empty {side} candidate set")]
    EmptyCandidates { side: CandidateSide },

    #[error("asset '{asset}' appears more than once across the long, short and hedge sets")]
    OverlappingCandidates { asset: Asset },

    #[error("phase {attempted} out of order (expected {expected})")]
    PhaseOrder { expected: Phase, attempted: Phase },

    #[error("phase {attempted} called with no trading day open")]
    DayNotOpen { attempted: Phase },

    #[error("phase {phase} requires {missing} from an earlier phase today")]
    MissingPhaseOutput { phase: Phase, missing: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_asset() {
        let e = CycleError::InsufficientHistory {
            asset: "VTI".into(),
            required: 252,
            available: 100,
        };
        assert_eq!(
            e.to_string(),
            "insufficient history for 'VTI': need 252 prices, have 100"
        );
        let e = CycleError::EmptyCandidates {
            side: CandidateSide::Short,
        };
        assert_eq!(e.to_string(), "empty short candidate set");
    }
}
