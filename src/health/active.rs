//! Active health checking.
//!
//! # Responsibilities
//! - Periodically run a health sweep over the pool
//! - Keep blocking probes off the async runtime
//! - Stop on shutdown signal

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::pool::{Pool, SweepReport};

pub struct HealthMonitor {
    pool: Arc<Pool>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<Pool>, config: HealthCheckConfig) -> Self {
        Self { pool, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            "Health monitor starting"
        );

        let interval = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one sweep on the blocking pool.
    ///
    /// Returns `None` if the sweep task panicked.
    pub async fn sweep(&self) -> Option<SweepReport> {
        let pool = self.pool.clone();
        let report = match tokio::task::spawn_blocking(move || pool.run_health_sweep()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Health sweep task failed");
                return None;
            }
        };

        let healthy = self.pool.all_healthy().len();
        if report.failed > 0 {
            tracing::warn!(
                probed = report.probed,
                failed = report.failed,
                healthy,
                "Health sweep finished with failures"
            );
        } else {
            tracing::debug!(probed = report.probed, healthy, "Health sweep finished");
        }
        Some(report)
    }
}
