//! Rotalab CLI — replay, synthetic data and config commands.
//!
//! Commands:
//! - `run` — replay the rotation strategy from a TOML config file
//! - `synth` — write deterministic synthetic prices and fundamentals as CSV
//! - `config` — print a complete default config

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rotalab_core::StrategyConfig;
use rotalab_runner::data_loader::{write_fundamentals, write_prices};
use rotalab_runner::{run_from_config, save_artifacts, LoggingConfig, ReplayResult, RunConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rotalab",
    about = "Rotalab CLI — channel-breakout asset rotation with factor long/short sleeves"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay the strategy day by day from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// First replayed day (YYYY-MM-DD). Overrides `data.start`.
        #[arg(long)]
        start: Option<String>,

        /// Last replayed day (YYYY-MM-DD). Overrides `data.end`.
        #[arg(long)]
        end: Option<String>,

        /// Use synthetic data regardless of `data.prices`.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Artifact directory. Overrides `output.dir`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write synthetic `prices.csv` and `fundamentals.csv`.
    Synth {
        /// Output directory.
        #[arg(long, default_value = "data")]
        out: PathBuf,

        /// Start date (YYYY-MM-DD). Defaults to 2018-01-02.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to 2020-12-31.
        #[arg(long)]
        end: Option<String>,

        /// Names in the factor universe.
        #[arg(long, default_value_t = 60)]
        universe: usize,
    },
    /// Print a config with every default filled in.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            start,
            end,
            synthetic,
            output_dir,
        } => run_cmd(config, start, end, synthetic, output_dir),
        Commands::Synth {
            out,
            start,
            end,
            universe,
        } => {
            init_tracing(&LoggingConfig::default());
            run_synth(out, start, end, universe)
        }
        Commands::Config => {
            print!("{}", RunConfig::default_toml());
            Ok(())
        }
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("dates must be YYYY-MM-DD")
}

fn run_cmd(
    config_path: PathBuf,
    start: Option<String>,
    end: Option<String>,
    synthetic: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = RunConfig::from_file(&config_path)?;
    if let Some(start) = parse_date(start.as_deref())? {
        config.data.start = Some(start);
    }
    if let Some(end) = parse_date(end.as_deref())? {
        config.data.end = Some(end);
    }
    if synthetic {
        config.data.synthetic = true;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    config.validate()?;
    init_tracing(&config.logging);
    tracing::info!(config = %config_path.display(), run_id = %config.run_id(), "config loaded");

    let result = run_from_config(&config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, &config.output)?;
    println!("Artifacts saved to: {}", run_dir.display());

    if result.days.is_empty() {
        bail!("no cycle completed; see the failures above");
    }
    Ok(())
}

fn run_synth(
    out: PathBuf,
    start: Option<String>,
    end: Option<String>,
    universe: usize,
) -> Result<()> {
    if universe == 0 {
        bail!("--universe must be at least 1");
    }
    let start = parse_date(start.as_deref())?.unwrap_or_else(rotalab_runner::synthetic::default_start);
    let end = parse_date(end.as_deref())?.unwrap_or_else(rotalab_runner::synthetic::default_end);
    if start > end {
        bail!("start {start} is after end {end}");
    }

    let strategy = StrategyConfig::default();
    let (prices, fundamentals) =
        rotalab_runner::synthetic::generate(&strategy, universe, start, end)?;

    std::fs::create_dir_all(&out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    let prices_path = out.join("prices.csv");
    let fundamentals_path = out.join("fundamentals.csv");
    write_prices(&prices_path, &prices)?;
    write_fundamentals(&fundamentals_path, &fundamentals)?;

    println!("Wrote {} series to {}", prices.len(), prices_path.display());
    println!(
        "Wrote {} snapshots to {}",
        fundamentals.len(),
        fundamentals_path.display()
    );
    Ok(())
}

fn print_summary(result: &ReplayResult) {
    println!();
    println!("=== Replay Result ===");
    println!(
        "Run:            {}",
        result.run_id.get(..12).unwrap_or(&result.run_id)
    );
    if let (Some(first), Some(last)) = (result.days.first(), result.days.last()) {
        println!("Period:         {} to {}", first.date, last.date);
    }
    println!(
        "Days:           {} completed, {} failed, {} skipped ({} warmup)",
        result.days.len(),
        result.failures.len(),
        result.skipped.len(),
        result.warmup_days
    );
    println!("Transitions:    {}", result.total_transitions());
    println!("Mean Leverage:  {:.3}", result.mean_leverage());

    if let Some(last) = result.days.last() {
        println!();
        println!("--- Last Allocation ---");
        for (asset, weight) in last.allocation.iter() {
            println!("{asset:<8} {:>7.2}%", weight * 100.0);
        }
    }

    println!();
    println!("--- Final Book ---");
    for (asset, weight) in &result.final_weights {
        println!("{asset:<8} {:>+8.4}", weight);
    }

    for failure in result.failures.iter().take(5) {
        println!("FAILED {}: {}", failure.date, failure.error);
    }
    if result.failures.len() > 5 {
        println!("... {} more failures", result.failures.len() - 5);
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
