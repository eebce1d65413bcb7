//! Result and error types for Sceno.

use thiserror::Error;

/// Result type for Sceno operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors that can occur while loading or running a suite
#[derive(Debug, Error)]
pub enum SceneError {
    /// No locator entry exists for the page context and name
    #[error("Unknown locator '{name}' in page context '{page}'")]
    UnknownLocator {
        /// Page context searched
        page: String,
        /// Symbolic name
        name: String,
    },

    /// None of the candidate selectors matched a live element
    #[error("Locator '{name}' matched no element (tried {candidates:?})")]
    LocatorNotFound {
        /// Symbolic name
        name: String,
        /// Candidate selectors, in the order they were tried
        candidates: Vec<String>,
    },

    /// Element never became actionable
    #[error("Timed out after {ms}ms waiting for {target}")]
    Timeout {
        /// What was being waited for
        target: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Element is present but cannot receive the action
    #[error("Element '{selector}' is not interactable: {reason}")]
    ElementNotInteractable {
        /// Selector of the element
        selector: String,
        /// Why the action was refused (disabled, covered, ...)
        reason: String,
    },

    /// Navigation returned a non-success status or failed outright
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// An expectation did not hold
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// The suite deadline elapsed before the scenario finished
    #[error("SuiteTimeout: suite deadline of {ms}ms elapsed")]
    SuiteTimeout {
        /// Suite timeout in milliseconds
        ms: u64,
    },

    /// The scenario deadline elapsed before the scenario finished
    #[error("ScenarioTimeout: scenario exceeded {ms}ms")]
    ScenarioTimeout {
        /// Scenario timeout in milliseconds
        ms: u64,
    },

    /// Malformed suite definition or locator table
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Browser transport or protocol failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SceneError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a not-interactable error
    #[must_use]
    pub fn not_interactable(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ElementNotInteractable {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    /// Short taxonomy name used in diagnostics and reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownLocator { .. } => "UnknownLocator",
            Self::LocatorNotFound { .. } => "LocatorNotFound",
            Self::Timeout { .. } => "Timeout",
            Self::ElementNotInteractable { .. } => "ElementNotInteractable",
            Self::NavigationError { .. } => "NavigationError",
            Self::AssertionFailed { .. } => "AssertionFailed",
            Self::SuiteTimeout { .. } => "SuiteTimeout",
            Self::ScenarioTimeout { .. } => "ScenarioTimeout",
            Self::ConfigError { .. } | Self::Yaml(_) => "ConfigError",
            Self::Driver { .. } | Self::Io(_) | Self::Json(_) => "DriverError",
        }
    }
}
