//! ChannelState — persistent regime table for every (asset, channel) pair.
//!
//! The table is closed over the configured active assets and channels: it is
//! populated once at strategy start (every key `Out`) and only ever updated in
//! place afterwards. It is the only state carried from one day to the next.
//!
//! Transition rule, evaluated once per key per cycle:
//! - `Out` and price >= entry threshold → `In`
//! - `In` and price <= exit threshold → `Out`
//! - otherwise unchanged

use crate::domain::{Asset, Channel, Mode, RegimeEntry, RegimeKey};
use crate::error::CycleError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a single `update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Entered,
    Exited,
    Held(Mode),
}

impl Transition {
    /// Mode after the update.
    pub fn mode(self) -> Mode {
        match self {
            Self::Entered => Mode::In,
            Self::Exited => Mode::Out,
            Self::Held(mode) => mode,
        }
    }

    pub fn flipped(self) -> bool {
        !matches!(self, Self::Held(_))
    }
}

/// Pure transition rule.
pub fn next_mode(current: Mode, price: f64, entry: f64, exit: f64) -> Mode {
    match current {
        Mode::Out if price >= entry => Mode::In,
        Mode::In if price <= exit => Mode::Out,
        other => other,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelState {
    modes: BTreeMap<RegimeKey, Mode>,
}

impl ChannelState {
    /// Table with every asset × channel key set to `Out`.
    pub fn new(assets: &[Asset], channels: &[Channel]) -> Self {
        let modes = assets
            .iter()
            .flat_map(|a| channels.iter().map(move |&c| (RegimeKey::new(a.clone(), c), Mode::Out)))
            .collect();
        Self { modes }
    }

    /// Restore a table from a snapshot taken with [`ChannelState::snapshot`].
    pub fn from_snapshot(entries: &[RegimeEntry]) -> Self {
        let modes = entries
            .iter()
            .map(|e| (RegimeKey::new(e.asset.clone(), e.channel), e.mode))
            .collect();
        Self { modes }
    }

    pub fn snapshot(&self) -> Vec<RegimeEntry> {
        self.modes
            .iter()
            .map(|(k, m)| RegimeEntry {
                asset: k.asset.clone(),
                channel: k.channel,
                mode: *m,
            })
            .collect()
    }

    pub fn mode(&self, asset: &str, channel: Channel) -> Option<Mode> {
        self.modes.get(&RegimeKey::new(asset, channel)).copied()
    }

    /// Apply the transition rule for one key and persist the result.
    pub fn update(
        &mut self,
        asset: &str,
        channel: Channel,
        price: f64,
        entry: f64,
        exit: f64,
    ) -> Result<Transition, CycleError> {
        let key = RegimeKey::new(asset, channel);
        let Some(mode) = self.modes.get_mut(&key) else {
            return Err(CycleError::UnknownRegime { key });
        };

        let before = *mode;
        let after = next_mode(before, price, entry, exit);
        *mode = after;

        Ok(match (before, after) {
            (Mode::Out, Mode::In) => Transition::Entered,
            (Mode::In, Mode::Out) => Transition::Exited,
            _ => Transition::Held(after),
        })
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Number of keys currently `In`.
    pub fn count_in(&self) -> usize {
        self.modes.values().filter(|m| m.is_in()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegimeKey, Mode)> {
        self.modes.iter().map(|(k, m)| (k, *m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ChannelState {
        ChannelState::new(&["VTI".to_string(), "EFA".to_string()], &[60, 120])
    }

    #[test]
    fn new_table_is_closed_and_all_out() {
        let s = state();
        assert_eq!(s.len(), 4);
        assert_eq!(s.count_in(), 0);
        assert_eq!(s.mode("VTI", 60), Some(Mode::Out));
        assert_eq!(s.mode("VTI", 180), None);
    }

    #[test]
    fn out_enters_at_entry_threshold() {
        let mut s = state();
        // price == entry counts as a breakout
        let t = s.update("VTI", 60, 105.0, 105.0, 90.0).unwrap();
        assert_eq!(t, Transition::Entered);
        assert_eq!(s.mode("VTI", 60), Some(Mode::In));
        // other keys untouched
        assert_eq!(s.mode("VTI", 120), Some(Mode::Out));
    }

    #[test]
    fn out_stays_out_below_entry() {
        let mut s = state();
        let t = s.update("VTI", 60, 104.9, 105.0, 90.0).unwrap();
        assert_eq!(t, Transition::Held(Mode::Out));
    }

    #[test]
    fn in_exits_at_exit_threshold() {
        let mut s = state();
        s.update("EFA", 120, 110.0, 100.0, 90.0).unwrap();
        let t = s.update("EFA", 120, 90.0, 100.0, 90.0).unwrap();
        assert_eq!(t, Transition::Exited);
        assert_eq!(s.mode("EFA", 120), Some(Mode::Out));
    }

    #[test]
    fn in_holds_between_thresholds() {
        let mut s = state();
        s.update("EFA", 60, 110.0, 100.0, 90.0).unwrap();
        let t = s.update("EFA", 60, 95.0, 100.0, 90.0).unwrap();
        assert_eq!(t, Transition::Held(Mode::In));
    }

    #[test]
    fn at_most_one_flip_per_call() {
        // Inverted thresholds: price satisfies both entry and exit. An OUT key
        // enters and must not exit within the same call.
        let mut s = state();
        let t = s.update("VTI", 60, 100.0, 90.0, 110.0).unwrap();
        assert_eq!(t, Transition::Entered);
        assert_eq!(s.mode("VTI", 60), Some(Mode::In));
    }

    #[test]
    fn repeated_identical_updates_are_idempotent() {
        let mut s = state();
        assert!(s.update("VTI", 60, 120.0, 100.0, 90.0).unwrap().flipped());
        for _ in 0..5 {
            let t = s.update("VTI", 60, 120.0, 100.0, 90.0).unwrap();
            assert_eq!(t, Transition::Held(Mode::In));
        }
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut s = state();
        let err = s.update("GLD", 60, 1.0, 1.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            CycleError::UnknownRegime {
                key: RegimeKey::new("GLD", 60)
            }
        );
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn snapshot_round_trip_preserves_modes() {
        let mut s = state();
        s.update("EFA", 120, 200.0, 100.0, 90.0).unwrap();
        let restored = ChannelState::from_snapshot(&s.snapshot());
        assert_eq!(restored, s);
        assert_eq!(restored.mode("EFA", 120), Some(Mode::In));
    }

    #[test]
    fn transition_accessors() {
        assert_eq!(Transition::Entered.mode(), Mode::In);
        assert_eq!(Transition::Exited.mode(), Mode::Out);
        assert!(!Transition::Held(Mode::In).flipped());
    }
}
