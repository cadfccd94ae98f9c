//! Endpoint pool management.
//!
//! # Responsibilities
//! - Register and deregister endpoints, enforcing unique addresses
//! - Select the next healthy endpoint in round-robin order
//! - Drive health sweeps across every registered endpoint

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::load_balancer::{endpoint::Endpoint, round_robin::RoundRobin};
use crate::observability::metrics;

/// Errors returned by structural pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// An endpoint with the same address is already registered.
    #[error("{address} is already registered, remove it first")]
    DuplicateEndpoint { address: String },
}

/// Outcome of one health sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Endpoints probed.
    pub probed: usize,
    /// Probes that reported an error.
    pub failed: usize,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.probed - self.failed
    }
}

type EndpointList = Vec<Arc<dyn Endpoint>>;

static SHARED: OnceLock<Pool> = OnceLock::new();

/// Registry of relay endpoints with a round-robin selector.
///
/// Writers serialize on `entries` and publish a sorted snapshot; readers
/// only ever see a complete snapshot.
#[derive(Debug)]
pub struct Pool {
    entries: Mutex<HashMap<String, Arc<dyn Endpoint>>>,
    snapshot: ArcSwap<EndpointList>,
    selector: RoundRobin,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
            selector: RoundRobin::new(),
        }
    }

    /// The process-wide pool, created on first use.
    pub fn shared() -> &'static Pool {
        SHARED.get_or_init(Pool::new)
    }

    // Mutations never leave the map half-updated, so a poisoned lock is still usable.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Endpoint>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, entries: &HashMap<String, Arc<dyn Endpoint>>) {
        let mut snapshot: EndpointList = entries.values().cloned().collect();
        snapshot.sort_by(|a, b| a.address().cmp(b.address()));
        self.snapshot.store(Arc::new(snapshot));
        metrics::record_pool_size(entries.len());
    }

    /// Register an endpoint. Fails if its address is already present.
    pub fn add(&self, endpoint: Arc<dyn Endpoint>) -> Result<(), PoolError> {
        let mut entries = self.lock_entries();
        let address = endpoint.address().to_string();
        if entries.contains_key(&address) {
            return Err(PoolError::DuplicateEndpoint { address });
        }

        entries.insert(address.clone(), endpoint);
        self.publish(&entries);

        tracing::debug!(addr = %address, endpoints = entries.len(), "Endpoint added");
        Ok(())
    }

    /// Deregister an endpoint. Absent addresses are a no-op.
    ///
    /// Returns whether an endpoint was removed.
    pub fn remove(&self, address: &str) -> bool {
        let mut entries = self.lock_entries();
        if entries.remove(address).is_none() {
            return false;
        }
        self.publish(&entries);
        metrics::record_endpoint_removed(address);

        tracing::debug!(addr = %address, endpoints = entries.len(), "Endpoint removed");
        true
    }

    /// Every registered endpoint, sorted by address.
    pub fn all(&self) -> Vec<Arc<dyn Endpoint>> {
        self.snapshot.load().iter().cloned().collect()
    }

    /// Endpoints currently reporting alive, sorted by address.
    pub fn all_healthy(&self) -> Vec<Arc<dyn Endpoint>> {
        self.snapshot
            .load()
            .iter()
            .filter(|e| e.is_alive())
            .cloned()
            .collect()
    }

    pub fn get(&self, address: &str) -> Option<Arc<dyn Endpoint>> {
        self.snapshot
            .load()
            .iter()
            .find(|e| e.address() == address)
            .cloned()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.get(address).is_some()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.snapshot
            .load()
            .iter()
            .map(|e| e.address().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Select the next healthy endpoint, or `None` if none is available.
    pub fn next(&self) -> Option<Arc<dyn Endpoint>> {
        let healthy = self.all_healthy();
        tracing::trace!(available = healthy.len(), "Found available endpoints");

        match self.selector.next_server(&healthy) {
            Some(endpoint) => {
                metrics::record_selection(endpoint.address());
                Some(endpoint)
            }
            None => {
                tracing::debug!(endpoints = self.len(), "No healthy endpoint available");
                metrics::record_unavailable();
                None
            }
        }
    }

    /// Probe every registered endpoint once, healthy or not.
    ///
    /// Failures are logged and counted; they never remove an endpoint or stop the sweep.
    pub fn run_health_sweep(&self) -> SweepReport {
        let endpoints = self.snapshot.load_full();
        let mut report = SweepReport::default();

        for endpoint in endpoints.iter() {
            report.probed += 1;
            match endpoint.probe() {
                Ok(()) => {
                    tracing::debug!(addr = %endpoint.address(), "Health check succeeded");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(addr = %endpoint.address(), error = %e, "Health check failed");
                    metrics::record_probe_failure(endpoint.address());
                }
            }
            metrics::record_endpoint_health(endpoint.address(), endpoint.is_alive());
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::testing::MockEndpoint;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashSet;

    fn pool_of(mocks: &[&Arc<MockEndpoint>]) -> Pool {
        let pool = Pool::new();
        for m in mocks {
            pool.add((*m).clone()).unwrap();
        }
        pool
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let original = MockEndpoint::healthy("10.0.0.1:1080");
        let pool = pool_of(&[&original]);

        let dup = MockEndpoint::unhealthy("10.0.0.1:1080");
        let err = pool.add(dup).unwrap_err();
        assert_eq!(
            err,
            PoolError::DuplicateEndpoint {
                address: "10.0.0.1:1080".to_string()
            }
        );

        assert_eq!(pool.len(), 1);
        // the original entry is still the one registered
        assert!(pool.get("10.0.0.1:1080").unwrap().is_alive());
    }

    #[test]
    fn remove_unknown_address_is_noop() {
        let a = MockEndpoint::healthy("a:1");
        let pool = pool_of(&[&a]);

        assert!(!pool.remove("missing:1"));
        assert_eq!(pool.addresses(), vec!["a:1".to_string()]);
    }

    #[test]
    fn remove_then_re_add() {
        let a = MockEndpoint::healthy("a:1");
        let pool = pool_of(&[&a]);

        assert!(pool.remove("a:1"));
        assert!(pool.is_empty());
        assert!(!pool.remove("a:1"));
        pool.add(a).unwrap();
        assert!(pool.contains("a:1"));
    }

    #[test]
    fn empty_pool_has_nothing_to_offer() {
        let pool = Pool::new();
        assert!(pool.next().is_none());
        assert!(pool.all_healthy().is_empty());
    }

    #[test]
    fn all_unhealthy_pool_yields_none() {
        let a = MockEndpoint::unhealthy("a:1");
        let b = MockEndpoint::unhealthy("b:1");
        let pool = pool_of(&[&a, &b]);

        assert!(pool.next().is_none());
        assert!(pool.all_healthy().is_empty());
    }

    #[test]
    fn full_rotation_covers_each_endpoint_once() {
        let mocks: Vec<_> = (0..5)
            .map(|i| MockEndpoint::healthy(&format!("10.0.0.{}:1080", i)))
            .collect();
        let pool = Pool::new();
        for m in &mocks {
            pool.add(m.clone()).unwrap();
        }

        let cycle: Vec<String> = (0..5)
            .map(|_| pool.next().unwrap().address().to_string())
            .collect();
        let distinct: HashSet<_> = cycle.iter().collect();
        assert_eq!(distinct.len(), 5);

        assert_eq!(pool.next().unwrap().address(), cycle[0]);
    }

    #[test]
    fn skips_endpoint_that_went_unhealthy() {
        let a = MockEndpoint::healthy("a:1");
        let b = MockEndpoint::healthy("b:1");
        let c = MockEndpoint::healthy("c:1");
        let pool = pool_of(&[&a, &b, &c]);

        assert_eq!(pool.next().unwrap().address(), "a:1");
        b.set_alive(false);

        let picked = pool.next().unwrap();
        assert_ne!(picked.address(), "b:1");
        assert!(picked.is_alive());
    }

    #[test]
    fn all_healthy_filters_and_sorts() {
        let c = MockEndpoint::healthy("c:1");
        let a = MockEndpoint::healthy("a:1");
        let b = MockEndpoint::unhealthy("b:1");
        let pool = pool_of(&[&c, &a, &b]);

        let healthy: Vec<_> = pool
            .all_healthy()
            .iter()
            .map(|e| e.address().to_string())
            .collect();
        assert_eq!(healthy, vec!["a:1", "c:1"]);
        assert_eq!(pool.addresses(), vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn all_includes_unhealthy_endpoints() {
        let b = MockEndpoint::unhealthy("b:1");
        let a = MockEndpoint::healthy("a:1");
        let pool = pool_of(&[&b, &a]);

        let all: Vec<_> = pool.all().iter().map(|e| e.address().to_string()).collect();
        assert_eq!(all, vec!["a:1", "b:1"]);
    }

    #[test]
    fn removed_endpoint_no_longer_reports_healthy() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            let a = MockEndpoint::healthy("gone:1");
            let pool = pool_of(&[&a]);
            pool.run_health_sweep();
            assert!(pool.remove("gone:1"));
        });

        let rendered = handle.render();
        let line = rendered
            .lines()
            .find(|l| l.starts_with("relay_pool_endpoint_healthy{") && l.contains("gone:1"))
            .unwrap();
        let value: f64 = line.split_whitespace().last().unwrap().parse().unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn concurrent_adds_keep_every_endpoint() {
        let pool = Pool::new();
        std::thread::scope(|s| {
            for t in 0..8 {
                let pool = &pool;
                s.spawn(move || {
                    for i in 0..50 {
                        let ep = MockEndpoint::healthy(&format!("10.{}.0.{}:1080", t, i));
                        pool.add(ep).unwrap();
                    }
                });
            }
        });

        assert_eq!(pool.len(), 400);
        let unique: HashSet<_> = pool.addresses().into_iter().collect();
        assert_eq!(unique.len(), 400);
    }

    #[test]
    fn selection_survives_concurrent_mutation() {
        let pool = Pool::new();
        for i in 0..4 {
            pool.add(MockEndpoint::healthy(&format!("stable:{}", i))).unwrap();
        }

        std::thread::scope(|s| {
            let pool = &pool;
            s.spawn(move || {
                for i in 0..200 {
                    let addr = format!("churn:{}", i % 10);
                    if !pool.remove(&addr) {
                        let _ = pool.add(MockEndpoint::healthy(&addr));
                    }
                }
            });
            for _ in 0..4 {
                s.spawn(move || {
                    for _ in 0..500 {
                        assert!(pool.next().is_some());
                    }
                });
            }
        });
    }

    #[test]
    fn sweep_probes_every_endpoint_once() {
        let a = MockEndpoint::healthy("a:1");
        let b = MockEndpoint::unhealthy("b:1");
        let c = MockEndpoint::healthy("c:1");
        let pool = pool_of(&[&a, &b, &c]);

        let report = pool.run_health_sweep();
        assert_eq!(report.probed, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded(), 2);
        for m in [&a, &b, &c] {
            assert_eq!(m.probe_count(), 1);
        }
    }

    #[test]
    fn failing_probe_neither_removes_nor_stops_sweep() {
        let a = MockEndpoint::healthy("a:1");
        let b = MockEndpoint::healthy("b:1");
        a.set_probe_succeeds(false);
        let pool = pool_of(&[&a, &b]);

        let report = pool.run_health_sweep();
        assert_eq!(report.failed, 1);
        assert_eq!(b.probe_count(), 1);
        assert!(pool.contains("a:1"));
        assert!(!a.is_alive());
        assert_eq!(pool.next().unwrap().address(), "b:1");
    }

    #[test]
    fn sweep_on_empty_pool() {
        assert_eq!(Pool::new().run_health_sweep(), SweepReport::default());
    }

    #[test]
    fn shared_pool_is_a_single_instance() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| Pool::shared() as *const Pool as usize))
            .collect();
        let first = Pool::shared() as *const Pool as usize;
        for h in handles {
            assert_eq!(h.join().unwrap(), first);
        }

        Pool::shared()
            .add(MockEndpoint::healthy("shared-instance-test:1"))
            .unwrap();
        assert!(Pool::shared().contains("shared-instance-test:1"));
    }
}
