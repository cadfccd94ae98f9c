//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pool, health monitor, lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (facade is a no-op without an exporter)

pub mod logging;
pub mod metrics;
