//! Trader's Dojo - Entry Point
//!
//! Initializes configuration, logging, the profile store and the dojo
//! engine. Runs until `quit`, stdin EOF or SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path from the first argument) + validate
//! 2. Init tracing (JSON structured logging on stderr)
//! 3. Open the profile store (JSON file, or in-memory when ephemeral)
//! 4. Restore the session and generate the mock chart
//! 5. Spawn metrics + health servers when enabled
//! 6. Spawn the config watcher when hot reload is enabled
//! 7. Spawn console input + renderer
//! 8. Spawn the DojoEngine loop (event-driven tokio::select!)
//! 9. Wait for SIGINT or engine exit, then shut down (save -> exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use trading_dojo::adapters::console;
use trading_dojo::adapters::metrics::{HealthServer, HealthState, SessionMetrics};
use trading_dojo::adapters::persistence::{FileProfileStore, MemoryProfileStore};
use trading_dojo::adapters::random::SeededRandom;
use trading_dojo::config::{self, AppConfig};
use trading_dojo::ports::ProfileStore;
use trading_dojo::usecases::{
    DeskSettings, DojoEngine, EngineTiming, MarketDesk, SessionSettings, TradeSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        asset = %config.session.asset,
        seeded = config.app.rng_seed.is_some(),
        "Starting Trader's Dojo"
    );

    // ── 3. Open the profile store ───────────────────────────
    if config.persistence.ephemeral {
        warn!("Ephemeral mode: progress is not written to disk");
        run_dojo(MemoryProfileStore::new(), config, config_path).await
    } else {
        let store = FileProfileStore::new(&config.persistence.data_dir, &config.persistence.storage_key)
            .context("Failed to open profile store")?;
        info!(path = %store.path().display(), "Profile store opened");
        run_dojo(store, config, config_path).await
    }
}

/// Wire the engine over `store` and run until shutdown.
async fn run_dojo<S: ProfileStore>(store: S, config: AppConfig, config_path: String) -> Result<()> {
    // ── 4. Restore the session, generate the chart ──────────
    let seed = config.app.rng_seed;
    let session = TradeSession::restore(
        store,
        SeededRandom::new(seed),
        SessionSettings::from_config(&config),
        TradeSession::<S, SeededRandom>::template(&config),
    );
    let desk = MarketDesk::new(
        SeededRandom::new(seed.map(|s| s.wrapping_add(1))),
        DeskSettings::from_config(&config),
        Utc::now(),
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (events_tx, events_rx) = broadcast::channel(256);
    let (command_tx, command_rx) = mpsc::channel(64);

    let mut engine = DojoEngine::new(session, desk, EngineTiming::from_config(&config), events_tx);

    // ── 5. Spawn metrics + health servers ───────────────────
    let mut server_handles = Vec::new();
    if config.metrics.enabled {
        let metrics = Arc::new(SessionMetrics::new().context("Failed to register metrics")?);
        let health = Arc::new(HealthState::new());
        engine = engine.with_metrics(Arc::clone(&metrics)).with_health(Arc::clone(&health));

        let metrics_shutdown = shutdown_tx.subscribe();
        let bind = config.metrics.bind_address.clone();
        server_handles.push(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let health_shutdown = shutdown_tx.subscribe();
        let health_server = HealthServer::new(health, config.metrics.health_address.clone());
        server_handles.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(health_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }));
    }

    // ── 6. Spawn config watcher ─────────────────────────────
    let reload_secs = config.app.reload_interval_seconds;
    let (mut watcher, config_rx) = config::hot_reload::ConfigWatcher::new(
        &config_path,
        config.clone(),
        Duration::from_secs(reload_secs),
    );
    let watcher_handle = if reload_secs > 0 {
        let watcher_shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = watcher.run(watcher_shutdown).await {
                error!(error = %e, "Config watcher failed");
            }
        }))
    } else {
        // Dropping the watcher closes the channel; the engine stops polling it.
        drop(watcher);
        None
    };

    // ── 7. Spawn console input + renderer ───────────────────
    let renderer_handle = tokio::spawn(console::render_events(events_rx));
    let input_handle = tokio::spawn(console::read_commands(command_tx, shutdown_tx.subscribe()));

    // ── 8. Spawn the dojo engine ────────────────────────────
    let engine_shutdown = shutdown_tx.subscribe();
    let mut engine_handle = tokio::spawn(async move {
        if let Err(e) = engine.run(command_rx, config_rx, engine_shutdown).await {
            error!(error = %e, "Dojo engine failed");
        }
    });

    info!("All tasks spawned, dojo is open");

    // ── 9. Wait for SIGINT or engine exit ───────────────────
    let engine_done = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
            false
        }
        _ = &mut engine_handle => {
            info!("Engine finished");
            true
        }
    };

    let _ = shutdown_tx.send(());

    if !engine_done {
        // The engine saves progress on its way out.
        let _ = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(2), renderer_handle).await;
    if let Some(handle) = watcher_handle {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }
    // Stdin reads block; the input task is not awaited.
    input_handle.abort();
    for handle in server_handles {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}
