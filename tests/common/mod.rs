//! Shared utilities for integration tests.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use relay_pool::{Endpoint, ProbeError};
use tokio::net::TcpListener;

/// Start a mock relay that accepts and immediately closes connections.
#[allow(dead_code)]
pub async fn start_mock_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    start_mock_relay_on(listener)
}

/// Serve an already bound listener as a mock relay.
#[allow(dead_code)]
pub fn start_mock_relay_on(listener: TcpListener) -> SocketAddr {
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => drop(socket),
                Err(_) => break,
            }
        }
    });
    addr
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Endpoint whose liveness is toggled by the test; probes apply `recovers`.
#[derive(Debug)]
#[allow(dead_code)]
pub struct ScriptedEndpoint {
    address: String,
    alive: AtomicBool,
    recovers: AtomicBool,
    probes: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedEndpoint {
    pub fn new(address: &str, alive: bool) -> Arc<Self> {
        Arc::new(Self {
            address: address.to_string(),
            alive: AtomicBool::new(alive),
            recovers: AtomicBool::new(alive),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Make the next probes succeed (and mark alive) or fail.
    pub fn set_recovers(&self, recovers: bool) {
        self.recovers.store(recovers, Ordering::SeqCst);
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl Endpoint for ScriptedEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn probe(&self) -> Result<(), ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let ok = self.recovers.load(Ordering::SeqCst);
        self.alive.store(ok, Ordering::SeqCst);
        if ok {
            Ok(())
        } else {
            Err(ProbeError::Unreachable {
                address: self.address.clone(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "scripted failure"),
            })
        }
    }
}
