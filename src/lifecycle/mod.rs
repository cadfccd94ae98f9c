//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build pool → Start health monitor
//!
//! Reload (startup.rs):
//!     Config update → reconcile (add new, remove dropped endpoints)
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → broadcast → background tasks exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging and metrics, then the pool
//! - The pool is constructed once here and injected into every consumer

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
