// =============================================================================
// Signal Dashboard: Main Entry Point
// =============================================================================
//
// Loads the runtime config, starts the dashboard API, and runs the periodic
// fetch → compute → publish loop until Ctrl+C.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod refresh;
mod runtime_config;
mod signals;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{PriceSource, YahooFinanceClient};
use crate::refresh::{CycleObserver, RefreshContext, RefreshScheduler};
use crate::runtime_config::RuntimeConfig;

/// Periodically refreshes RSI and Bollinger signals for one equity and serves
/// them to a dashboard.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the JSON runtime config.
    #[arg(default_value = "runtime_config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Signal Dashboard: Starting Up                     ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Config ────────────────────────────────────────────────────────
    let mut config = RuntimeConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    if let Ok(symbol) = std::env::var("ANALYZER_SYMBOL") {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() {
            info!(symbol = %symbol, "symbol overridden from environment");
            config.symbol = symbol;
        }
    }

    config.validate().context("invalid runtime config")?;

    info!(
        symbol = %config.symbol,
        start = %config.start_date,
        end = %config.end_date,
        rsi_window = config.rsi_window,
        bb_window = config.bb_window,
        bb_k = config.bb_k,
        interval_secs = config.refresh_interval_seconds,
        "configuration ready"
    );

    let ctx = RefreshContext::from_config(&config);
    let refresh_interval = Duration::from_secs(config.refresh_interval_seconds);

    // ── 3. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 4. Price source ──────────────────────────────────────────────────
    let yahoo = match std::env::var("ANALYZER_YAHOO_BASE_URL") {
        Ok(url) => YahooFinanceClient::with_base_url(url),
        Err(_) => YahooFinanceClient::new(),
    }
    .context("failed to build Yahoo Finance client")?;
    info!(base_url = %yahoo.base_url(), "price source ready");
    let source: Arc<dyn PriceSource> = Arc::new(yahoo);

    // ── 5. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("ANALYZER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 6. Refresh loop (first tick fires immediately) ───────────────────
    let observer: Arc<dyn CycleObserver> = state.clone();
    let scheduler = RefreshScheduler::new(ctx, source, observer, refresh_interval);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let refresh_handle = tokio::spawn(scheduler.run_until(async {
        let _ = shutdown_rx.await;
    }));

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 7. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, waiting for the refresh loop");

    let _ = shutdown_tx.send(());
    match refresh_handle.await {
        Ok(cycle) => info!(
            phase = %cycle.phase(),
            completed = cycle.completed_cycles(),
            failed = cycle.failed_cycles(),
            last_rows = cycle.last_good().map(|a| a.len()),
            last_error = cycle.last_error(),
            "refresh loop stopped"
        ),
        Err(e) => error!(error = %e, "refresh loop task panicked"),
    }

    info!("Signal Dashboard shut down complete.");
    Ok(())
}
