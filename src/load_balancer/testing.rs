//! In-memory endpoint for unit tests.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::endpoint::{Endpoint, ProbeError};

/// Endpoint whose liveness is set by hand; `probe` applies a scripted outcome.
#[derive(Debug)]
pub struct MockEndpoint {
    address: String,
    alive: AtomicBool,
    probe_succeeds: AtomicBool,
    probes: AtomicUsize,
}

impl MockEndpoint {
    fn new(address: &str, alive: bool) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            alive: AtomicBool::new(alive),
            probe_succeeds: AtomicBool::new(alive),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn healthy(address: &str) -> Arc<Self> {
        Self::new(address, true)
    }

    pub fn unhealthy(address: &str) -> Arc<Self> {
        Self::new(address, false)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Outcome the next probes will report and cache.
    pub fn set_probe_succeeds(&self, ok: bool) {
        self.probe_succeeds.store(ok, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Endpoint for MockEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn probe(&self) -> Result<(), ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let ok = self.probe_succeeds.load(Ordering::SeqCst);
        self.alive.store(ok, Ordering::SeqCst);
        if ok {
            Ok(())
        } else {
            Err(ProbeError::Unreachable {
                address: self.address.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "mock refused"),
            })
        }
    }
}
