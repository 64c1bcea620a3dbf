//! Artifact export — JSON and CSV.
//!
//! - **JSON**: full `ReplayResult` with schema versioning
//! - **CSV**: daily target weights, allocation vectors and diagnostics for
//!   external analysis tools
//!
//! All persisted JSON includes a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::OutputConfig;
use crate::replay::{ReplayResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &ReplayResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize ReplayResult to JSON")
}

/// Deserialize a `ReplayResult`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ReplayResult> {
    let result: ReplayResult =
        serde_json::from_str(json).context("failed to deserialize ReplayResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: date, asset, weight, status. Deferred orders have an empty weight.
pub fn export_weights_csv(result: &ReplayResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "asset", "weight", "status"])?;
    for day in &result.days {
        let date = day.date.to_string();
        for (asset, weight) in &day.weights.targets {
            wtr.write_record([date.clone(), asset.clone(), format!("{weight:.8}"), "target".into()])?;
        }
        for asset in &day.weights.deferred {
            wtr.write_record([date.as_str(), asset.as_str(), "", "deferred"])?;
        }
    }
    finish(wtr)
}

/// Columns: date, asset, weight.
pub fn export_allocations_csv(result: &ReplayResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "asset", "weight"])?;
    for day in &result.days {
        let date = day.date.to_string();
        for (asset, weight) in day.allocation.iter() {
            wtr.write_record([date.clone(), asset.to_string(), format!("{weight:.8}")])?;
        }
    }
    finish(wtr)
}

/// One row per completed day. Head lists are `;`-joined.
pub fn export_diagnostics_csv(result: &ReplayResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "leverage",
        "long_portion",
        "short_portion",
        "hedge_portion",
        "long_weight",
        "short_weight",
        "hedge_weight",
        "transitions",
        "regimes_in",
        "deferred",
        "long_head",
        "short_head",
    ])?;
    for day in &result.days {
        let d = &day.diagnostics;
        wtr.write_record([
            &d.date.to_string(),
            &format!("{:.6}", d.leverage),
            &format!("{:.6}", d.long_portion),
            &format!("{:.6}", d.short_portion),
            &format!("{:.6}", d.hedge_portion),
            &format!("{:.8}", d.legs.long),
            &format!("{:.8}", d.legs.short),
            &format!("{:.8}", d.legs.hedge),
            &d.transitions.to_string(),
            &d.regimes_in.to_string(),
            &d.deferred.to_string(),
            &d.long_head.join(";"),
            &d.short_head.join(";"),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a replay.
///
/// Creates `run_{id}/` (first 12 hex chars of the run id) under `output.dir`
/// containing, as enabled:
/// - `result.json` — the full `ReplayResult`
/// - `weights.csv`, `allocations.csv`, `diagnostics.csv`
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &ReplayResult, output: &OutputConfig) -> Result<PathBuf> {
    let short_id = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output.dir.join(format!("run_{short_id}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    if output.json {
        write(&run_dir, "result.json", &export_json(result)?)?;
    }
    if output.csv {
        write(&run_dir, "weights.csv", &export_weights_csv(result)?)?;
        write(&run_dir, "allocations.csv", &export_allocations_csv(result)?)?;
        write(&run_dir, "diagnostics.csv", &export_diagnostics_csv(result)?)?;
    }
    Ok(run_dir)
}

fn write(dir: &Path, name: &str, body: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))
}
