//! Runner Configuration
//!
//! Layering: built-in defaults, then the suite file's `settings` block, then
//! explicit builder calls (the CLI flags).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::result::{SceneError, SceneResult};
use crate::wait::{WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Optional overrides carried by a suite file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSettings {
    /// Default wait budget for action steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    /// Poll interval for waits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    /// Per-scenario deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_timeout_ms: Option<u64>,
    /// Whole-suite deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_timeout_ms: Option<u64>,
    /// Worker count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
    /// Retry once when a click is refused as not interactable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_not_interactable: Option<bool>,
    /// Capture a screenshot when a scenario does not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_on_failure: Option<bool>,
    /// Directory for screenshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
}

/// Configuration for scenario and suite runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Default wait budget for action steps in milliseconds
    pub default_timeout_ms: u64,
    /// Poll interval for waits in milliseconds
    pub poll_interval_ms: u64,
    /// Retry once on `ElementNotInteractable`
    pub retry_not_interactable: bool,
    /// Per-scenario deadline
    pub scenario_timeout_ms: Option<u64>,
    /// Whole-suite deadline
    pub suite_timeout_ms: Option<u64>,
    /// Number of concurrent workers
    pub parallel: usize,
    /// Directory for screenshots
    pub artifacts_dir: Option<PathBuf>,
    /// Capture a screenshot when a scenario does not pass
    pub screenshot_on_failure: bool,
    /// Only run scenarios whose id contains this string
    pub filter: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            retry_not_interactable: true,
            scenario_timeout_ms: None,
            suite_timeout_ms: None,
            parallel: 1,
            artifacts_dir: None,
            screenshot_on_failure: true,
            filter: None,
        }
    }
}

impl RunnerConfig {
    /// Create a new builder starting from defaults
    #[must_use]
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder::default()
    }

    /// Wait options for a step, honouring its override
    #[must_use]
    pub fn wait_options(&self, step_timeout_ms: Option<u64>) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(step_timeout_ms.unwrap_or(self.default_timeout_ms))
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Whether a scenario id passes the filter
    #[must_use]
    pub fn selects(&self, id: &str) -> bool {
        self.filter.as_deref().map_or(true, |f| id.contains(f))
    }

    /// Reject values no run can use
    pub fn validate(&self) -> SceneResult<()> {
        if self.parallel == 0 {
            return Err(SceneError::config("parallel must be at least 1"));
        }
        if self.default_timeout_ms == 0 {
            return Err(SceneError::config("default_timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// Builder for `RunnerConfig`
#[derive(Debug, Clone, Default)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    /// Overlay suite settings; later builder calls still win
    #[must_use]
    pub fn settings(mut self, settings: &SuiteSettings) -> Self {
        let c = &mut self.config;
        if let Some(v) = settings.default_timeout_ms {
            c.default_timeout_ms = v;
        }
        if let Some(v) = settings.poll_interval_ms {
            c.poll_interval_ms = v;
        }
        if settings.scenario_timeout_ms.is_some() {
            c.scenario_timeout_ms = settings.scenario_timeout_ms;
        }
        if settings.suite_timeout_ms.is_some() {
            c.suite_timeout_ms = settings.suite_timeout_ms;
        }
        if let Some(v) = settings.parallel {
            c.parallel = v;
        }
        if let Some(v) = settings.retry_not_interactable {
            c.retry_not_interactable = v;
        }
        if let Some(v) = settings.screenshot_on_failure {
            c.screenshot_on_failure = v;
        }
        if settings.artifacts_dir.is_some() {
            c.artifacts_dir.clone_from(&settings.artifacts_dir);
        }
        self
    }

    /// Set the default wait budget
    #[must_use]
    pub fn default_timeout_ms(mut self, ms: u64) -> Self {
        self.config.default_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Enable/disable the not-interactable retry
    #[must_use]
    pub fn retry_not_interactable(mut self, enabled: bool) -> Self {
        self.config.retry_not_interactable = enabled;
        self
    }

    /// Set the per-scenario deadline
    #[must_use]
    pub fn scenario_timeout_ms(mut self, ms: u64) -> Self {
        self.config.scenario_timeout_ms = Some(ms);
        self
    }

    /// Set the whole-suite deadline
    #[must_use]
    pub fn suite_timeout_ms(mut self, ms: u64) -> Self {
        self.config.suite_timeout_ms = Some(ms);
        self
    }

    /// Set worker count
    #[must_use]
    pub fn parallel(mut self, workers: usize) -> Self {
        self.config.parallel = workers;
        self
    }

    /// Set artifacts directory
    #[must_use]
    pub fn artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifacts_dir = Some(dir.into());
        self
    }

    /// Enable/disable failure screenshots
    #[must_use]
    pub fn screenshot_on_failure(mut self, enabled: bool) -> Self {
        self.config.screenshot_on_failure = enabled;
        self
    }

    /// Only run scenarios whose id contains `pattern`
    #[must_use]
    pub fn filter(mut self, pattern: impl Into<String>) -> Self {
        self.config.filter = Some(pattern.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> SceneResult<RunnerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
