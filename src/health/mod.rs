//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Pool::run_health_sweep on the blocking pool
//!     → Each endpoint probes itself
//!     → Endpoint updates its own state (state.rs for Backend)
//!
//! State machine (state.rs):
//!     Unknown → Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Sweeps probe every endpoint, healthy or not
//! - A failing probe never removes an endpoint
//! - Health state is per-endpoint, not per-pool

pub mod active;
pub mod state;
