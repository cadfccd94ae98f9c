//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the pool from validated configuration
//! - Apply reloaded endpoint lists to a running pool
//!
//! # Design Decisions
//! - Fail fast: a duplicate endpoint at startup is fatal
//! - Reload only adds and removes; endpoints that stay keep their health state
//! - New endpoints added on reload use the reloaded health settings

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::RelayConfig;
use crate::load_balancer::{Backend, Endpoint, Pool, PoolError};

/// Endpoints changed by a reconcile pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Create a pool holding one [`Backend`] per configured endpoint.
pub fn build_pool(config: &RelayConfig) -> Result<Arc<Pool>, PoolError> {
    let pool = Arc::new(Pool::new());
    for endpoint in &config.endpoints {
        pool.add(Arc::new(Backend::from_config(endpoint, &config.health_check)))?;
    }

    tracing::info!(endpoints = pool.len(), "Pool initialized");
    Ok(pool)
}

/// Bring the pool's endpoint set in line with `config`.
pub fn reconcile(pool: &Pool, config: &RelayConfig) -> ReconcileSummary {
    let desired: HashSet<&str> = config
        .endpoints
        .iter()
        .map(|e| e.address.as_str())
        .collect();
    let mut summary = ReconcileSummary::default();

    for endpoint in pool.all() {
        let address = endpoint.address();
        if !desired.contains(address) && pool.remove(address) {
            summary.removed.push(address.to_string());
        }
    }

    for endpoint in &config.endpoints {
        if pool.contains(&endpoint.address) {
            continue;
        }
        match pool.add(Arc::new(Backend::from_config(endpoint, &config.health_check))) {
            Ok(()) => summary.added.push(endpoint.address.clone()),
            // registered concurrently by another management call
            Err(e) => tracing::warn!(error = %e, "Skipping endpoint"),
        }
    }

    tracing::info!(
        added = summary.added.len(),
        removed = summary.removed.len(),
        endpoints = pool.len(),
        "Endpoint list reconciled"
    );
    summary
}

/// Apply configuration updates until the channel closes or shutdown fires.
pub async fn apply_config_updates(
    pool: Arc<Pool>,
    mut updates: mpsc::UnboundedReceiver<RelayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    let summary = reconcile(&pool, &config);
                    if !summary.is_empty() {
                        tracing::info!(added = ?summary.added, removed = ?summary.removed, "Applied config reload");
                    }
                }
                None => break,
            },
            _ = shutdown.recv() => {
                tracing::info!("Config reload task received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::lifecycle::Shutdown;

    fn config_with(addresses: &[&str]) -> RelayConfig {
        RelayConfig {
            endpoints: addresses
                .iter()
                .map(|a| EndpointConfig {
                    address: a.to_string(),
                })
                .collect(),
            ..RelayConfig::default()
        }
    }

    #[test]
    fn builds_pool_from_config() {
        let pool = build_pool(&config_with(&["b:1080", "a:1080"])).unwrap();
        assert_eq!(pool.addresses(), vec!["a:1080", "b:1080"]);
        // unprobed backends are selectable
        assert_eq!(pool.all_healthy().len(), 2);
    }

    #[test]
    fn duplicate_endpoint_fails_startup() {
        let err = build_pool(&config_with(&["a:1080", "a:1080"])).unwrap_err();
        assert!(matches!(err, PoolError::DuplicateEndpoint { .. }));
    }

    #[test]
    fn reconcile_adds_and_removes() {
        let pool = build_pool(&config_with(&["a:1", "b:1"])).unwrap();
        let kept = pool.get("b:1").unwrap();

        let summary = reconcile(&pool, &config_with(&["b:1", "c:1"]));
        assert_eq!(summary.added, vec!["c:1"]);
        assert_eq!(summary.removed, vec!["a:1"]);
        assert_eq!(pool.addresses(), vec!["b:1", "c:1"]);
        // existing endpoint instance is untouched
        assert!(Arc::ptr_eq(&kept, &pool.get("b:1").unwrap()));
    }

    #[test]
    fn reconcile_with_same_config_is_noop() {
        let config = config_with(&["a:1", "b:1"]);
        let pool = build_pool(&config).unwrap();
        assert!(reconcile(&pool, &config).is_empty());
    }

    #[tokio::test]
    async fn config_updates_are_applied() {
        let pool = build_pool(&config_with(&["a:1"])).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(apply_config_updates(pool.clone(), rx, shutdown.subscribe()));

        tx.send(config_with(&["z:1"])).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(pool.addresses(), vec!["z:1"]);
    }

    #[tokio::test]
    async fn config_task_stops_on_shutdown() {
        let pool = Arc::new(Pool::new());
        let (_tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(apply_config_updates(pool, rx, shutdown.subscribe()));

        shutdown.trigger();
        task.await.unwrap();
    }
}
