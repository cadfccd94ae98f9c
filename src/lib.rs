//! Round-robin relay endpoint pool with active health sweeps.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::schema::RelayConfig;
pub use health::active::HealthMonitor;
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, Endpoint, Pool, PoolError, ProbeError, SweepReport};
