//! Scenario and suite execution.
//!
//! [`ScenarioRunner`] drives one scenario in its own session; [`SuiteRunner`]
//! fans scenarios out over a bounded number of workers and aggregates the
//! results in submission order.

mod config;
mod scenario_runner;
mod suite_runner;

pub use config::{RunnerConfig, RunnerConfigBuilder, SuiteSettings};
pub use scenario_runner::ScenarioRunner;
pub use suite_runner::SuiteRunner;

use std::time::Duration;
use tokio::time::Instant;

use crate::result::SceneError;

/// Upper bound on failure-screenshot and session-close calls
pub const CLEANUP_TIMEOUT_MS: u64 = 5_000;

/// Absolute deadline for a whole suite run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteDeadline {
    at: Instant,
    ms: u64,
}

impl SuiteDeadline {
    /// Deadline `ms` milliseconds from now
    #[must_use]
    pub fn after_ms(ms: u64) -> Self {
        Self {
            at: Instant::now() + Duration::from_millis(ms),
            ms,
        }
    }

    /// Instant the deadline elapses
    #[must_use]
    pub const fn at(&self) -> Instant {
        self.at
    }

    /// Whether the deadline has already elapsed
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Error recorded for scenarios cut off by this deadline
    #[must_use]
    pub const fn error(&self) -> SceneError {
        SceneError::SuiteTimeout { ms: self.ms }
    }
}
