//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Management layer (startup, config reload)
//!     → pool.rs add/remove (exclusive lock, snapshot republished)
//!
//! Connection path
//!     → pool.rs next()
//!     → healthy subset filtered from the current snapshot
//!     → round_robin.rs (rotate, skip endpoints that raced to unhealthy)
//!     → endpoint or None
//!
//! Health monitor
//!     → pool.rs run_health_sweep()
//!     → endpoint.rs probe() on every registered endpoint
//! ```
//!
//! # Design Decisions
//! - Readers never take the registry lock; they load an immutable snapshot
//! - Snapshot is sorted by address so rotation order is reproducible
//! - Health state lives in the endpoint, not in the pool
//! - Unavailability is `None`, not an error

pub mod backend;
pub mod endpoint;
pub mod pool;
pub mod round_robin;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::Backend;
pub use endpoint::{Endpoint, ProbeError};
pub use pool::{Pool, PoolError, SweepReport};
