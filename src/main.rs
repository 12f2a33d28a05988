//! cycle-avail-sim entry point: CLI wiring and config-driven orchestration.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cycle_avail_sim::config::ScenarioConfig;
use cycle_avail_sim::io::checkpoint::{load_checkpoints, save_checkpoints};
use cycle_avail_sim::io::export::{export_failures_csv, export_steps_csv};
use cycle_avail_sim::sim::metrics::Metric;

/// Monte Carlo availability simulator for a power-cycle block.
///
/// With neither --scenario nor --preset the baseline preset is used.
#[derive(Debug, Parser)]
#[command(name = "cycle-avail-sim", version)]
struct Cli {
    /// Load the scenario from a TOML file.
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, single_train, high_cycling).
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Override the master seed.
    #[arg(long)]
    seed: Option<u32>,

    /// Override the number of scenarios.
    #[arg(long, value_name = "N")]
    scenarios: Option<usize>,

    /// Read the dispatch schedule from CSV instead of the daily profile.
    #[arg(long, value_name = "CSV")]
    dispatch: Option<PathBuf>,

    /// Write scenario 0 step records to CSV.
    #[arg(long, value_name = "CSV")]
    telemetry_out: Option<PathBuf>,

    /// Write the failure logs of all scenarios to CSV.
    #[arg(long, value_name = "CSV")]
    failures_out: Option<PathBuf>,

    /// Resume from checkpoints saved by an earlier run.
    #[arg(long, value_name = "JSON")]
    checkpoint_in: Option<PathBuf>,

    /// Save per-scenario checkpoints after the run.
    #[arg(long, value_name = "JSON")]
    checkpoint_out: Option<PathBuf>,

    /// Roll each scenario back at its first new failure.
    #[arg(long)]
    stop_at_first_failure: bool,

    /// Run scenarios one after another instead of in parallel.
    #[arg(long)]
    sequential: bool,

    /// Print a named metric after the report; may be repeated.
    #[arg(long = "metric", value_name = "NAME")]
    metrics: Vec<Metric>,

    /// Do not print per-step records.
    #[arg(long, short)]
    quiet: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<ScenarioConfig> {
    let mut cfg = if let Some(path) = &cli.scenario {
        ScenarioConfig::from_toml_file(path)?
    } else if let Some(name) = &cli.preset {
        ScenarioConfig::from_preset(name)?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed {
        cfg.simulation.seed = seed;
    }
    if let Some(n) = cli.scenarios {
        cfg.simulation.num_scenarios = n;
    }
    if let Some(path) = &cli.dispatch {
        cfg.dispatch.file = Some(path.clone());
    }
    if cli.stop_at_first_failure {
        cfg.simulation.stop_at_first_failure = true;
    }

    let errors = cfg.validate();
    if !errors.is_empty() {
        let list: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("invalid scenario:\n  {}", list.join("\n  "));
    }
    Ok(cfg)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;

    let mut orchestrator = cfg
        .build_orchestrator()
        .context("failed to set up the plant")?;
    if let Some(path) = &cli.checkpoint_in {
        let checkpoints = load_checkpoints(path)
            .with_context(|| format!("failed to read checkpoints from {}", path.display()))?;
        info!(count = checkpoints.len(), "resuming from checkpoints");
        orchestrator = orchestrator
            .with_checkpoints(checkpoints)
            .with_context(|| format!("checkpoints in {} do not fit the plant", path.display()))?;
    }

    let n = cfg.simulation.num_scenarios;
    let done = if cli.sequential {
        orchestrator.run_all(n)?
    } else {
        orchestrator.run_all_parallel(n)?
    };
    info!(completed = done, requested = n, "simulation finished");

    let first = orchestrator.results().values().next();
    if !cli.quiet {
        for r in first.map(|r| r.records.as_slice()).unwrap_or_default() {
            println!("{r}");
        }
        println!();
    }

    let summary = orchestrator.summary();
    println!("{summary}");
    for metric in &cli.metrics {
        println!("{metric} = {:.6}", metric.evaluate(&summary));
    }

    if let Some(path) = &cli.telemetry_out {
        let records = first.map(|r| r.records.as_slice()).unwrap_or_default();
        export_steps_csv(records, path)
            .with_context(|| format!("failed to write telemetry to {}", path.display()))?;
        eprintln!("Telemetry written to {}", path.display());
    }
    if let Some(path) = &cli.failures_out {
        export_failures_csv(orchestrator.results().values().map(|r| &r.log), path)
            .with_context(|| format!("failed to write failures to {}", path.display()))?;
        eprintln!("Failure log written to {}", path.display());
    }
    if let Some(path) = &cli.checkpoint_out {
        save_checkpoints(orchestrator.checkpoints(), path)
            .with_context(|| format!("failed to write checkpoints to {}", path.display()))?;
        eprintln!("Checkpoints written to {}", path.display());
    }

    Ok(())
}
