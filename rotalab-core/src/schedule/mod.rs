//! Daily rebalance schedule.
//!
//! Four phases per trading day, always in this order:
//! 1. `PrepareCandidates` before the open
//! 2. `Reallocate` shortly after the open
//! 3. `Rebalance` after the reallocation
//! 4. `Record` at the close
//!
//! The scheduler only enforces ordering; it never sleeps or reads a clock.
//! A failed phase closes the day, and the next `begin_day` starts fresh.

pub mod strategy;

pub use strategy::{CycleDiagnostics, DayInputs, DayReport, RotationStrategy};

use crate::config::ConfigError;
use crate::error::CycleError;
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PrepareCandidates,
    Reallocate,
    Rebalance,
    Record,
}

impl Phase {
    pub const ORDER: [Phase; 4] = [
        Phase::PrepareCandidates,
        Phase::Reallocate,
        Phase::Rebalance,
        Phase::Record,
    ];

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::PrepareCandidates => Some(Phase::Reallocate),
            Phase::Reallocate => Some(Phase::Rebalance),
            Phase::Rebalance => Some(Phase::Record),
            Phase::Record => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PrepareCandidates => "prepare_candidates",
            Phase::Reallocate => "reallocate",
            Phase::Rebalance => "rebalance",
            Phase::Record => "record",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock layout of a trading day. Times are `HH:MM` exchange time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub market_open: String,
    pub market_close: String,
    pub half_day_close: String,
    pub prepare_before_open_minutes: u32,
    pub reallocate_after_open_minutes: u32,
    pub rebalance_after_open_minutes: u32,
    /// Run the cycle on early-close days.
    pub half_days: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            market_open: "09:30".into(),
            market_close: "16:00".into(),
            half_day_close: "13:00".into(),
            prepare_before_open_minutes: 45,
            reallocate_after_open_minutes: 15,
            rebalance_after_open_minutes: 30,
            half_days: true,
        }
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ConfigError::Schedule(format!("{field} '{value}': {e}")))
}

impl ScheduleConfig {
    /// Phase times for one day, in phase order.
    pub fn timeline(&self, half_day: bool) -> Result<Vec<(Phase, NaiveTime)>, ConfigError> {
        let open = parse_time("market_open", &self.market_open)?;
        let close = if half_day {
            parse_time("half_day_close", &self.half_day_close)?
        } else {
            parse_time("market_close", &self.market_close)?
        };

        let prepare_offset = Duration::minutes(i64::from(self.prepare_before_open_minutes));
        if prepare_offset.num_seconds() > i64::from(open.num_seconds_from_midnight()) {
            return Err(ConfigError::Schedule(
                "prepare_before_open_minutes reaches into the previous day".into(),
            ));
        }
        let (prepare, _) = open.overflowing_sub_signed(prepare_offset);
        let (reallocate, _) = open.overflowing_add_signed(Duration::minutes(i64::from(
            self.reallocate_after_open_minutes,
        )));
        let (rebalance, _) = open.overflowing_add_signed(Duration::minutes(i64::from(
            self.rebalance_after_open_minutes,
        )));

        let timeline = vec![
            (Phase::PrepareCandidates, prepare),
            (Phase::Reallocate, reallocate),
            (Phase::Rebalance, rebalance),
            (Phase::Record, close),
        ];
        for pair in timeline.windows(2) {
            if pair[0].1 >= pair[1].1 {
                return Err(ConfigError::Schedule(format!(
                    "{} at {} is not before {} at {}",
                    pair[0].0,
                    pair[0].1.format("%H:%M"),
                    pair[1].0,
                    pair[1].1.format("%H:%M"),
                )));
            }
        }
        Ok(timeline)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeline(false)?;
        self.timeline(true)?;
        Ok(())
    }
}

/// Enforces the phase order within a trading day.
#[derive(Debug, Clone)]
pub struct RebalanceScheduler {
    config: ScheduleConfig,
    day: Option<NaiveDate>,
    next: Option<Phase>,
}

impl RebalanceScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            day: None,
            next: None,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Whether a cycle runs on a day of this kind.
    pub fn should_run(&self, half_day: bool) -> bool {
        !half_day || self.config.half_days
    }

    /// Open `date` for its four phases. Returns `false` (and opens nothing)
    /// when the day is skipped.
    pub fn begin_day(&mut self, date: NaiveDate, half_day: bool) -> bool {
        if let (Some(day), Some(pending)) = (self.day, self.next) {
            warn!(%day, %pending, "previous day left incomplete");
        }
        if !self.should_run(half_day) {
            info!(%date, "half day, cycle skipped");
            self.day = None;
            self.next = None;
            return false;
        }
        debug!(%date, half_day, "day opened");
        self.day = Some(date);
        self.next = Some(Phase::PrepareCandidates);
        true
    }

    /// Mark `phase` as started. Fails unless it is the next phase due today.
    pub fn advance(&mut self, phase: Phase) -> Result<(), CycleError> {
        let Some(expected) = self.next else {
            return Err(CycleError::DayNotOpen { attempted: phase });
        };
        if phase != expected {
            return Err(CycleError::PhaseOrder {
                expected,
                attempted: phase,
            });
        }
        self.next = phase.next();
        Ok(())
    }

    /// Close the day after a failure; remaining phases are skipped.
    pub fn abort_day(&mut self) {
        if let Some(day) = self.day {
            warn!(%day, pending = ?self.next, "cycle aborted");
        }
        self.next = None;
    }

    pub fn current_day(&self) -> Option<NaiveDate> {
        self.day
    }

    /// Phase due next, if a day is open.
    pub fn pending(&self) -> Option<Phase> {
        self.next
    }
}
