//! Serializable run configuration.
//!
//! One TOML file describes a full replay:
//!
//! ```toml
//! [strategy]        # rotation tunables (see rotalab_core::StrategyConfig)
//! [schedule]        # phase offsets and half-day policy
//! [data]            # price / fundamentals files or synthetic generation
//! [output]          # artifact directory and formats
//! [logging]         # default level and format
//! ```
//!
//! Every table and every field is optional; omitted values take defaults.

use chrono::NaiveDate;
use rotalab_core::config::ConfigError;
use rotalab_core::{ScheduleConfig, StrategyConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error("data: {0}")]
    Data(String),
}

/// Where the replay reads its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV with `date,asset,price` rows.
    pub prices: Option<PathBuf>,
    /// CSV with `date,asset,<fundamental fields>` rows.
    pub fundamentals: Option<PathBuf>,
    /// Generate deterministic synthetic data instead of reading files.
    pub synthetic: bool,
    /// Names in the synthetic factor universe.
    pub synthetic_universe: usize,
    /// First replayed day (inclusive). Earlier prices still feed the lookbacks.
    pub start: Option<NaiveDate>,
    /// Last replayed day (inclusive).
    pub end: Option<NaiveDate>,
    /// Early-close sessions.
    pub half_days: BTreeSet<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            prices: None,
            fundamentals: None,
            synthetic: false,
            synthetic_universe: 60,
            start: None,
            end: None,
            half_days: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub json: bool,
    pub csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            json: true,
            csv: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Everything needed to reproduce a replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub strategy: StrategyConfig,
    pub schedule: ScheduleConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

impl RunConfig {
    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.strategy.validate()?;
        self.schedule.validate()?;
        if !self.data.synthetic && self.data.prices.is_none() {
            return Err(RunConfigError::Data(
                "either data.prices or data.synthetic = true is required".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.data.start, self.data.end) {
            if start > end {
                return Err(RunConfigError::Data(format!(
                    "start {start} is after end {end}"
                )));
            }
        }
        if self.data.synthetic && self.data.synthetic_universe == 0 {
            return Err(RunConfigError::Data(
                "synthetic_universe must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Output and logging settings do not affect results and are excluded.
    pub fn run_id(&self) -> RunId {
        let mut hasher = blake3::Hasher::new();
        for part in [
            serde_json::to_string(&self.strategy),
            serde_json::to_string(&self.schedule),
            serde_json::to_string(&self.data),
        ] {
            hasher.update(part.unwrap_or_default().as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Annotated TOML with every default, for `rotalab config`.
    pub fn default_toml() -> String {
        let cfg = RunConfig {
            data: DataConfig {
                synthetic: true,
                ..DataConfig::default()
            },
            ..RunConfig::default()
        };
        toml::to_string_pretty(&cfg).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [strategy]
        active_assets = ["VTI", "EFA"]
        hedge_asset = "IEF"
        channels = [20, 40]

        [strategy.roles]
        EFA = "short_source"

        [schedule]
        half_days = false

        [data]
        prices = "data/prices.csv"
        start = "2020-01-02"
        half_days = ["2020-11-27"]

        [output]
        dir = "out"

        [logging]
        level = "debug"
    "#;

    #[test]
    fn parses_all_tables() {
        let cfg = RunConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.strategy.channels, vec![20, 40]);
        assert!(!cfg.schedule.half_days);
        assert_eq!(cfg.data.prices, Some(PathBuf::from("data/prices.csv")));
        assert_eq!(cfg.data.half_days.len(), 1);
        assert_eq!(cfg.output.dir, PathBuf::from("out"));
        assert!(cfg.output.json);
        assert_eq!(cfg.logging.level, "debug");
        // untouched strategy fields keep their defaults
        assert_eq!(cfg.strategy.volatility_window, 20);
    }

    #[test]
    fn run_id_deterministic() {
        let a = RunConfig::from_toml(SAMPLE).unwrap();
        let b = RunConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);
    }

    #[test]
    fn run_id_ignores_output_but_tracks_params() {
        let base = RunConfig::from_toml(SAMPLE).unwrap();
        let mut moved = base.clone();
        moved.output.dir = PathBuf::from("elsewhere");
        moved.logging.json = true;
        assert_eq!(base.run_id(), moved.run_id());

        let mut tuned = base.clone();
        tuned.strategy.entry_quantile = 0.7;
        assert_ne!(base.run_id(), tuned.run_id());
    }

    #[test]
    fn missing_data_source_is_rejected() {
        let err = RunConfig::from_toml("[strategy]\n").unwrap_err();
        assert!(matches!(err, RunConfigError::Data(_)));
    }

    #[test]
    fn invalid_strategy_is_rejected() {
        let err = RunConfig::from_toml(
            r#"
            [strategy]
            entry_quantile = 1.5
            [data]
            synthetic = true
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RunConfigError::Invalid(ConfigError::QuantileOutOfRange { .. })
        ));
    }

    #[test]
    fn default_toml_round_trips() {
        let text = RunConfig::default_toml();
        let cfg = RunConfig::from_toml(&text).unwrap();
        assert!(cfg.data.synthetic);
        assert_eq!(cfg.strategy, StrategyConfig::default());
    }
}
