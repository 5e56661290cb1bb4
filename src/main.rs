// =============================================================================
// Ticker Tracker: Main Entry Point
// =============================================================================
//
// Three front ends over the same samplers:
//   track : console loop on stdout until Ctrl-C
//   plot  : one bounded chart session written to an SVG file
//   serve : HTTP dashboard with the live label and chart
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod chart;
mod error;
mod quote;
mod runtime_config;
mod sampler;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::chart::SvgFileSurface;
use crate::quote::{PriceFetcher, YahooClient};
use crate::runtime_config::RuntimeConfig;
use crate::sampler::{ChartSampler, ChartSession, ConsoleSampler};
use crate::types::{SessionOutcome, Symbol};

const DEFAULT_CONFIG_PATH: &str = "ticker_config.json";

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "ticker-tracker", version, about = "Real-time stock price tracker")]
struct Cli {
    /// JSON config file; missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the latest price every interval until Ctrl-C.
    Track {
        symbol: String,
        /// Seconds between samples.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Sample for a fixed duration and draw a chart after every sample.
    Plot {
        symbol: String,
        /// Session length in seconds.
        #[arg(long)]
        duration: Option<u64>,
        /// Seconds between samples.
        #[arg(long)]
        interval: Option<u64>,
        /// SVG file to (re)write.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the HTTP dashboard.
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Write the default config file.
    InitConfig {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::InitConfig { path } = &cli.command {
        let path = path.clone().unwrap_or_else(|| cli.config.clone());
        RuntimeConfig::default().save(&path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // ── 2. Config ────────────────────────────────────────────────────────
    let mut config = RuntimeConfig::load(&cli.config).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();

    // ── 3. Shutdown signal ───────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    spawn_ctrl_c(shutdown.clone());

    match cli.command {
        Command::Track { symbol, interval } => {
            if let Some(secs) = interval {
                config.console_interval_secs = secs;
            }
            run_track(config, &symbol, shutdown).await
        }
        Command::Plot {
            symbol,
            duration,
            interval,
            output,
        } => {
            if let Some(secs) = duration {
                config.chart_duration_secs = secs;
            }
            if let Some(secs) = interval {
                config.chart_interval_secs = secs;
            }
            if let Some(path) = output {
                config.chart_output_path = path.display().to_string();
            }
            run_plot(config, &symbol, shutdown).await
        }
        Command::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            run_serve(config, shutdown).await
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Cancel `shutdown` on the first Ctrl-C.
fn spawn_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        warn!("Shutdown signal received, stopping gracefully");
        shutdown.cancel();
    });
}

fn build_fetcher(config: &RuntimeConfig) -> anyhow::Result<Arc<dyn PriceFetcher>> {
    let client = YahooClient::new(config).context("failed to build price client")?;
    Ok(Arc::new(client))
}

// =============================================================================
// track
// =============================================================================

async fn run_track(
    config: RuntimeConfig,
    symbol: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let symbol = Symbol::parse(symbol)?;
    config.validate()?;

    let sampler = ConsoleSampler::new(
        build_fetcher(&config)?,
        Duration::from_secs(config.console_interval_secs),
    );

    let mut out = std::io::stdout();
    let summary = sampler.run(&symbol, &mut out, &shutdown).await;

    info!(
        %symbol,
        cycles = summary.cycles,
        successes = summary.successes,
        failures = summary.failures,
        "tracking finished"
    );
    Ok(())
}

// =============================================================================
// plot
// =============================================================================

async fn run_plot(
    config: RuntimeConfig,
    symbol: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let symbol = Symbol::parse(symbol)?;
    config.validate()?;

    let sampler = ChartSampler::new(
        build_fetcher(&config)?,
        Duration::from_secs(config.chart_duration_secs),
        Duration::from_secs(config.chart_interval_secs),
    );
    let mut surface = SvgFileSurface::new(&config.chart_output_path, shutdown.child_token());

    let session = sampler.run(&symbol, &mut surface).await;
    print_session(&session, &surface);
    Ok(())
}

fn print_session(session: &ChartSession, surface: &SvgFileSurface) {
    match &session.outcome {
        SessionOutcome::Completed => {}
        SessionOutcome::CancelledByUser => println!("Plot closed by user."),
        SessionOutcome::AbortedOnError(e) => println!("Error fetching data: {e}"),
    }

    match session.summary() {
        Some(s) => println!(
            "{}: {} samples, open ${:.2}, last ${:.2}, high ${:.2}, low ${:.2}, change {:+.2} ({:+.2}%)",
            session.symbol, s.samples, s.open, s.last, s.high, s.low, s.change, s.change_pct
        ),
        None => println!("{}: no samples collected", session.symbol),
    }

    if surface.redraws() > 0 {
        println!("Chart written to {}", surface.path().display());
    }
}

// =============================================================================
// serve
// =============================================================================

async fn run_serve(config: RuntimeConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    config.validate()?;

    let fetcher = build_fetcher(&config)?;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, fetcher, shutdown.clone()));

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind dashboard on {bind_addr}"))?;
    info!(addr = %bind_addr, "Dashboard listening. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("dashboard server failed")?;

    info!("Ticker tracker shut down complete.");
    Ok(())
}
