//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint addresses are well-formed and unique
//! - Validate value ranges (interval, timeout, thresholds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RelayConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("endpoint #{index} has an empty address")]
    EmptyAddress { index: usize },

    #[error("endpoint address {address:?} is not host:port")]
    InvalidAddress { address: String },

    #[error("endpoint {address} is listed more than once")]
    DuplicateAddress { address: String },

    #[error("health_check.{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),

    #[error("metrics address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for (index, endpoint) in config.endpoints.iter().enumerate() {
        let address = endpoint.address.as_str();
        if address.is_empty() {
            errors.push(ValidationError::EmptyAddress { index });
        } else if !is_host_port(address) {
            errors.push(ValidationError::InvalidAddress {
                address: endpoint.address.clone(),
            });
        } else if !seen.insert(address) {
            errors.push(ValidationError::DuplicateAddress {
                address: endpoint.address.clone(),
            });
        }
    }

    let health = &config.health_check;
    for (field, value) in [
        ("interval_secs", health.interval_secs),
        ("timeout_secs", health.timeout_secs),
        ("unhealthy_threshold", u64::from(health.unhealthy_threshold)),
        ("healthy_threshold", u64::from(health.healthy_threshold)),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` or `[ipv6]:port` with a non-zero port.
fn is_host_port(address: &str) -> bool {
    let Some((host, port)) = address.rsplit_once(':') else {
        return false;
    };
    if !matches!(port.parse::<u16>(), Ok(p) if p > 0) {
        return false;
    }

    let host = match host.strip_prefix('[') {
        Some(inner) => match inner.strip_suffix(']') {
            Some(h) => h,
            None => return false,
        },
        None if host.contains(':') => return false,
        None => host,
    };
    !host.is_empty() && !host.chars().any(char::is_whitespace)
}
