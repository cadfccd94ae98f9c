//! Relay Pool daemon (v1)
//!
//! Keeps a pool of downstream relay endpoints registered and health-checked.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                          RELAY POOL                           │
//!   │                                                               │
//!   │  ┌─────────┐   ┌──────────────┐   ┌───────────────────────┐  │
//!   │  │ config  │──▶│  lifecycle   │──▶│    load_balancer      │  │
//!   │  │ loader  │   │   startup    │   │  pool + round_robin   │──┼──▶ next()
//!   │  └────┬────┘   └──────────────┘   └───────────▲───────────┘  │
//!   │       │ watcher (--watch)                     │               │
//!   │       └────────▶ reconcile ───────────────────┤               │
//!   │                                               │               │
//!   │  ┌──────────────┐   run_health_sweep          │               │
//!   │  │    health    │─────────────────────────────┘               │
//!   │  │   monitor    │──▶ Backend::probe ──────────────────────────┼──▶ Relays
//!   │  └──────────────┘                                             │
//!   │                                                               │
//!   │  observability: tracing + Prometheus     lifecycle: signals   │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use relay_pool::config::loader::load_config;
use relay_pool::config::watcher::ConfigWatcher;
use relay_pool::lifecycle::{signals, startup, Shutdown};
use relay_pool::observability::{logging, metrics};
use relay_pool::HealthMonitor;

#[derive(Parser)]
#[command(name = "relay-pool")]
#[command(about = "Round-robin pool of health-checked relay endpoints", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relay-pool.toml")]
    config: PathBuf,

    /// Reload the endpoint list when the configuration file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability)?;

    tracing::info!("relay-pool v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = ?cli.config,
        endpoints = config.endpoints.len(),
        health_checks = config.health_check.enabled,
        interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let pool = startup::build_pool(&config)?;
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    let monitor = HealthMonitor::new(pool.clone(), config.health_check.clone());
    tasks.push(tokio::spawn(monitor.run(shutdown.subscribe())));

    // Held until exit; dropping it stops the file watch.
    let _watcher = if cli.watch {
        let (watcher, updates) = ConfigWatcher::new(&cli.config);
        let handle = watcher.run()?;
        tasks.push(tokio::spawn(startup::apply_config_updates(
            pool.clone(),
            updates,
            shutdown.subscribe(),
        )));
        Some(handle)
    } else {
        None
    };

    signals::wait_for_signal().await;
    tracing::info!(tasks = shutdown.receiver_count(), "Shutting down");
    shutdown.trigger();

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
