//! Round-robin selection over a healthy subset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::endpoint::Endpoint;

/// Round-robin selector.
/// Stores an internal counter to rotate through endpoints.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next alive endpoint from `healthy`, starting at the cursor.
    ///
    /// `healthy` is expected to be pre-filtered; each candidate is re-checked
    /// because it may have turned unhealthy since the subset was taken. When
    /// the start position is skipped, the cursor is moved to just after the
    /// chosen endpoint so the next call continues from there.
    pub fn next_server(&self, healthy: &[Arc<dyn Endpoint>]) -> Option<Arc<dyn Endpoint>> {
        if healthy.is_empty() {
            return None;
        }

        let len = healthy.len();
        let start = self.counter.fetch_add(1, Ordering::Relaxed) % len;

        for offset in 0..len {
            let index = (start + offset) % len;
            let endpoint = &healthy[index];
            if endpoint.is_alive() {
                if index != start {
                    // Best-effort; concurrent selectors may overwrite it.
                    self.counter.store(index.wrapping_add(1), Ordering::Relaxed);
                }
                return Some(endpoint.clone());
            }
        }
        None
    }

    /// Raw cursor value.
    pub fn position(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}
