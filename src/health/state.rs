//! Endpoint health state machine.
//!
//! # States
//! - Unknown: never probed, still receives traffic
//! - Healthy: endpoint receives traffic
//! - Unhealthy: endpoint excluded from selection
//!
//! # State Transitions
//! ```text
//! Unknown/Healthy → Unhealthy: consecutive failures >= unhealthy_threshold
//! Unknown/Unhealthy → Healthy: consecutive successes >= healthy_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Counters reset on the opposite outcome
//! - Lock-free: every field is an atomic

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Consecutive-outcome tracker driving [`HealthState`] transitions.
#[derive(Debug)]
pub struct HealthTracker {
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
    healthy_threshold: usize,
    unhealthy_threshold: usize,
}

impl HealthTracker {
    /// Create a tracker in the `Unknown` state.
    ///
    /// Thresholds below one are treated as one.
    pub fn new(healthy_threshold: usize, unhealthy_threshold: usize) -> Self {
        Self {
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
            healthy_threshold: healthy_threshold.max(1),
            unhealthy_threshold: unhealthy_threshold.max(1),
        }
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Healthy or Unknown.
    pub fn is_alive(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    /// Record a successful probe. Returns the new state if it changed.
    pub fn mark_success(&self) -> Option<HealthState> {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Healthy {
            return None;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= self.healthy_threshold {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            return Some(HealthState::Healthy);
        }
        None
    }

    /// Record a failed probe. Returns the new state if it changed.
    pub fn mark_failure(&self) -> Option<HealthState> {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Unhealthy {
            return None;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.unhealthy_threshold {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            return Some(HealthState::Unhealthy);
        }
        None
    }
}
