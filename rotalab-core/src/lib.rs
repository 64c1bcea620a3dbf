//! Rotalab Core — regimes, allocation, factor scoring, sizing and schedule.
//!
//! This crate contains the daily cycle of the rotation strategy:
//! - Domain types (price histories, regimes, allocation vectors, weights)
//! - Per-(asset, channel) breakout regimes with explicit state
//! - Volatility-weighted allocation across channels
//! - Factor ranking into long and short candidate lists
//! - Role-driven long/short position sizing with a tradability gate
//! - Four-phase daily schedule

pub mod channel_state;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod factors;
pub mod schedule;
pub mod sizers;
pub mod stats;

pub use channel_state::{ChannelState, Transition};
pub use config::{ConfigError, StrategyConfig};
pub use engine::{AllocationEngine, AllocationParams, Reallocation};
pub use error::{CandidateSide, CycleError};
pub use factors::{CandidateLists, FactorRegistry, FactorScorer, FundamentalInputs, FundamentalRecord};
pub use schedule::{DayInputs, DayReport, Phase, RebalanceScheduler, RotationStrategy, ScheduleConfig};
pub use sizers::{AlwaysTradable, PositionSizer, Rebalance, TradableSet, Tradability};
