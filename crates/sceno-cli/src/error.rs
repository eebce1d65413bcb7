//! Error types for the CLI

use sceno::SceneError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Exit code for a run in which some scenario failed or errored
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for suite load and configuration errors
pub const EXIT_CONFIG: u8 = 2;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Suite could not be loaded or is invalid
    #[error("Suite error: {0}")]
    Suite(#[from] SceneError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Browser could not be started
    #[error("Browser error: {message}")]
    Browser {
        /// Error message
        message: String,
    },

    /// Report generation error
    #[error("Report generation failed: {message}")]
    ReportGeneration {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a browser error
    #[must_use]
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report_generation(message: impl Into<String>) -> Self {
        Self::ReportGeneration {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Browser { .. } | Self::ReportGeneration { .. } => EXIT_FAILURE,
            Self::Config { .. } | Self::Suite(_) | Self::Io(_) => EXIT_CONFIG,
        }
    }
}
