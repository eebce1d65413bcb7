//! Log subscriber setup
//!
//! Logs always go to stderr so reports written to stdout stay machine-readable.
//! `SCENO_LOG` takes an `EnvFilter` directive and overrides the level derived
//! from `-q`/`-v`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{CliConfig, LogFormat};
use crate::error::{CliError, CliResult};

/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "SCENO_LOG";

/// Filter from `SCENO_LOG`, falling back to the verbosity level
pub fn env_filter(config: &CliConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_directive()))
}

/// Install the global subscriber
pub fn init(config: &CliConfig) -> CliResult<()> {
    let filter = env_filter(config);
    let ansi = config.color.should_color();
    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| CliError::config(format!("failed to install logger: {e}")))
}
