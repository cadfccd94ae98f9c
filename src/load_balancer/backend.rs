//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single downstream relay reachable over TCP
//! - Probe liveness with a resolve + connect bounded by one timeout
//! - Track health state (Unknown/Healthy/Unhealthy) with hysteresis

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{EndpointConfig, HealthCheckConfig};
use crate::health::state::{HealthState, HealthTracker};
use crate::load_balancer::endpoint::{Endpoint, ProbeError};

/// A single relay server.
#[derive(Debug)]
pub struct Backend {
    /// The `host:port` address of the relay.
    address: String,
    /// Upper bound for a single connect attempt.
    probe_timeout: Duration,
    health: HealthTracker,
}

impl Backend {
    /// Create a new backend.
    pub fn new(
        address: impl Into<String>,
        probe_timeout: Duration,
        healthy_threshold: usize,
        unhealthy_threshold: usize,
    ) -> Self {
        Self {
            address: address.into(),
            probe_timeout,
            health: HealthTracker::new(healthy_threshold, unhealthy_threshold),
        }
    }

    /// Build a backend from its endpoint entry and the shared health settings.
    pub fn from_config(endpoint: &EndpointConfig, health: &HealthCheckConfig) -> Self {
        Self::new(
            endpoint.address.clone(),
            Duration::from_secs(health.timeout_secs),
            health.healthy_threshold as usize,
            health.unhealthy_threshold as usize,
        )
    }

    pub fn state(&self) -> HealthState {
        self.health.state()
    }

    fn timed_out(&self) -> ProbeError {
        ProbeError::Timeout {
            address: self.address.clone(),
            timeout: self.probe_timeout,
        }
    }

    /// Resolve the address before `deadline`.
    ///
    /// IP literals skip the resolver. Hostname lookups run on a helper thread
    /// so a slow resolver costs at most the probe timeout; a lookup that
    /// outlives the deadline finishes in the background and is discarded.
    fn resolve(&self, deadline: Instant) -> Result<Vec<SocketAddr>, ProbeError> {
        if let Ok(addr) = self.address.parse::<SocketAddr>() {
            return Ok(vec![addr]);
        }

        let (tx, rx) = mpsc::channel::<io::Result<Vec<SocketAddr>>>();
        let address = self.address.clone();
        thread::spawn(move || {
            let _ = tx.send(address.to_socket_addrs().map(Iterator::collect));
        });

        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(Ok(addrs)) => Ok(addrs),
            Ok(Err(e)) => Err(ProbeError::Resolve {
                address: self.address.clone(),
                reason: e.to_string(),
            }),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => Err(ProbeError::Resolve {
                address: self.address.clone(),
                reason: "resolver thread exited".to_string(),
            }),
        }
    }

    /// Resolve and connect, both within one `probe_timeout`.
    fn connect(&self) -> Result<(), ProbeError> {
        let deadline = Instant::now() + self.probe_timeout;
        let addrs = self.resolve(deadline)?;

        let mut last_error: Option<io::Error> = None;
        for addr in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timed_out());
            }
            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(_stream) => return Ok(()),
                Err(e) => {
                    tracing::trace!(addr = %addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => Err(self.timed_out()),
            Some(e) => Err(ProbeError::Unreachable {
                address: self.address.clone(),
                source: e,
            }),
            None => Err(ProbeError::Resolve {
                address: self.address.clone(),
                reason: "no socket addresses".to_string(),
            }),
        }
    }
}

impl Endpoint for Backend {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    fn probe(&self) -> Result<(), ProbeError> {
        let result = self.connect();
        let transition = match result {
            Ok(()) => self.health.mark_success(),
            Err(_) => self.health.mark_failure(),
        };

        if let Some(state) = transition {
            tracing::info!(addr = %self.address, state = ?state, "Backend health changed");
        }
        result
    }
}
