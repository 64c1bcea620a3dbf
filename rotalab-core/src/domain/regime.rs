//! Regime keys and modes for the channel-breakout state machine.

use super::{Asset, Channel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary regime of one (asset, channel) pair.
///
/// `Out` routes the channel's capital unit to the hedge asset, `In` routes it
/// to the asset itself. Every key starts `Out`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Out,
    In,
}

impl Mode {
    pub fn is_in(self) -> bool {
        self == Mode::In
    }

    /// Numeric encoding: OUT = 0, IN = 1.
    pub fn as_u8(self) -> u8 {
        match self {
            Mode::Out => 0,
            Mode::In => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Out => write!(f, "OUT"),
            Mode::In => write!(f, "IN"),
        }
    }
}

/// Key into the regime table: one per active asset × channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegimeKey {
    pub asset: Asset,
    pub channel: Channel,
}

impl RegimeKey {
    pub fn new(asset: impl Into<Asset>, channel: Channel) -> Self {
        Self {
            asset: asset.into(),
            channel,
        }
    }
}

impl fmt::Display for RegimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset, self.channel)
    }
}

/// Flat, serializable row of the regime table (for snapshots and reports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeEntry {
    pub asset: Asset,
    pub channel: Channel,
    pub mode: Mode,
}
