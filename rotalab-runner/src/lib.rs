//! Rotalab Runner — daily replay, data loading, synthetic data, artifacts.
//!
//! This crate builds on `rotalab-core` to provide:
//! - TOML run configuration with content-addressed run ids
//! - CSV price and fundamentals loading, or deterministic synthetic data
//! - A day-by-day replay that feeds the rotation strategy one session at a time
//! - JSON and CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod replay;
pub mod synthetic;

pub use config::{DataConfig, LoggingConfig, OutputConfig, RunConfig, RunConfigError, RunId};
pub use data_loader::{load_data, FundamentalsBook, LoadError, LoadedData};
pub use export::{import_json, save_artifacts};
pub use replay::{
    run_from_config, run_replay, CycleFailure, ReplayResult, RunError, SCHEMA_VERSION,
};
