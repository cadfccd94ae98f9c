//! Endpoint contract consumed by the pool.
//!
//! # Responsibilities
//! - Identify a downstream relay by a stable address
//! - Expose the last-known liveness without blocking
//! - Re-probe liveness on demand, updating cached state
//!
//! # Design Decisions
//! - Health representation belongs to the implementor; the pool only reads it
//! - `is_alive` must be safe to call concurrently with `probe`

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a liveness probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The address could not be resolved to any socket address.
    #[error("failed to resolve {address}: {reason}")]
    Resolve { address: String, reason: String },

    /// Every resolved socket address refused or reset the connection.
    #[error("{address} is unreachable: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe did not complete in time.
    #[error("probe of {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },
}

/// A downstream target the pool can route a connection to.
pub trait Endpoint: Send + Sync + fmt::Debug {
    /// Unique, immutable registry key (e.g. `host:port`).
    fn address(&self) -> &str;

    /// Last-probed health. Must not block.
    fn is_alive(&self) -> bool;

    /// Perform a liveness check and update the cached health state.
    ///
    /// May block for as long as the implementation's own timeout allows.
    fn probe(&self) -> Result<(), ProbeError>;
}
