//! Sceno CLI Library
//!
//! Command-line interface for running Sceno suites.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, LogFormatArg, ReporterArg, RunArgs, SuiteArgs};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult, EXIT_CONFIG, EXIT_FAILURE};
pub use output::{render_listing, ProgressReporter};
