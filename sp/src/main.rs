//! sp - search prefetch workbench
//!
//! CLI entry point for inspecting cache keys and replaying scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use searchprefetch::cli::{Cli, Command};
use searchprefetch::config::Config;
use searchprefetch::domain::SearchParams;
use searchprefetch::prefetch::{PrefetchCoordinator, build_key, validate};
use searchprefetch::scenario::{Observed, ReplayReport, Scenario, replay};
use searchprefetch::search::{SimulatedExecutor, StaticSalesLookup};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("searchprefetch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("searchprefetch.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Key { params } => cmd_key(&params),
        Command::Replay {
            scenario,
            settle_ms,
            json,
        } => cmd_replay(&config, &scenario, settle_ms, json).await,
    }
}

fn load_params(path: &Path) -> Result<SearchParams> {
    let content = fs::read_to_string(path).context(format!("Failed to read params file {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both
    serde_yaml::from_str(&content).context("Failed to parse params file")
}

fn cmd_key(path: &Path) -> Result<()> {
    let params = load_params(path)?;
    println!("{}", build_key(&params));

    match validate(&params) {
        Ok(()) => println!("{} prefetchable", "✓".green()),
        Err(reason) => println!("{} not prefetched: {}", "✗".yellow(), reason),
    }
    Ok(())
}

async fn cmd_replay(config: &Config, path: &Path, settle_ms: Option<u64>, json: bool) -> Result<()> {
    let mut scenario = Scenario::load(path)?;
    if let Some(ms) = settle_ms {
        scenario.settle_ms = ms;
    }

    let executor = Arc::new(SimulatedExecutor::new(&config.simulation));
    let lookup = Arc::new(StaticSalesLookup::new(&config.simulation));
    let handle = PrefetchCoordinator::spawn(config.prefetch.clone(), executor.clone(), lookup);

    let report = replay(&scenario, &handle).await?;
    handle.shutdown()?;
    info!(searches = executor.call_count(), "Replay finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize report")?);
    } else {
        print_report(&report, executor.call_count());
    }
    Ok(())
}

fn print_report(report: &ReplayReport, searches: usize) {
    for event in &report.events {
        let stamp = format!("{:>6}ms", event.at_ms).dimmed();
        let who = event.subscriber.cyan();
        match &event.observed {
            Observed::Started => println!("{} {} {}", stamp, who, "started".blue()),
            Observed::Ended => println!("{} {} {}", stamp, who, "ended".blue()),
            Observed::Completed { key, results } => {
                println!("{} {} {} {}", stamp, who, "completed".green().bold(), key);
                for r in results {
                    println!(
                        "           {} {:.2} {} (sold {} in 30d)",
                        r.name, r.price, r.currency, r.sales_count
                    );
                }
            }
        }
    }

    let m = &report.metrics;
    println!();
    println!("Searches executed: {}", searches.to_string().bold());
    println!(
        "Schedules: {} received, {} rejected, {} deduplicated, {} coalesced",
        m.schedules_received, m.schedules_rejected, m.schedules_deduplicated, m.debounces_superseded
    );
    println!(
        "Fetches: {} started, {} completed, {} failed, {} cancelled",
        m.fetches_started,
        m.fetches_completed.to_string().green(),
        m.fetches_failed.to_string().red(),
        m.fetches_cancelled
    );
    if report.snapshot.current_key.is_empty() {
        println!("Cached key: {}", "(none)".dimmed());
    } else {
        println!("Cached key: {}", report.snapshot.current_key);
    }
}
