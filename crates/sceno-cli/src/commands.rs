//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{ColorChoice, LogFormat};

/// Sceno: run declarative end-to-end browser scenarios
#[derive(Parser, Debug)]
#[command(name = "sceno")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenarios of a suite
    Run(RunArgs),

    /// Load and validate a suite without opening a browser
    Validate(SuiteArgs),

    /// List the scenarios of a suite
    List(SuiteArgs),
}

/// Suite file selection
#[derive(Args, Debug, Clone)]
pub struct SuiteArgs {
    /// Suite file (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    pub suite: PathBuf,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Suite file
    #[command(flatten)]
    pub suite: SuiteArgs,

    /// Number of scenarios run concurrently
    #[arg(short = 'j', long)]
    pub parallel: Option<usize>,

    /// Default wait budget per step in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Wall-clock limit per scenario in milliseconds
    #[arg(long)]
    pub scenario_timeout_ms: Option<u64>,

    /// Wall-clock limit for the whole suite in milliseconds
    #[arg(long)]
    pub suite_timeout_ms: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub reporter: ReporterArg,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only run scenarios whose id contains this pattern
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Directory for screenshots
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Do not capture a screenshot when a scenario fails
    #[arg(long)]
    pub no_screenshots: bool,

    /// Do not retry an action the browser refused as not interactable
    #[arg(long)]
    pub no_retry: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Path to the chromium binary
    #[arg(long, env = "SCENO_CHROMIUM")]
    pub chromium: Option<PathBuf>,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReporterArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
    /// JUnit XML
    Junit,
}

impl From<ReporterArg> for sceno::ReportFormat {
    fn from(arg: ReporterArg) -> Self {
        match arg {
            ReporterArg::Text => Self::Text,
            ReporterArg::Json => Self::Json,
            ReporterArg::Junit => Self::Junit,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_with_overrides() {
            let cli = Cli::try_parse_from([
                "sceno",
                "-v",
                "run",
                "--suite",
                "suite.yaml",
                "-j",
                "4",
                "--timeout-ms",
                "2000",
                "--reporter",
                "junit",
                "--filter",
                "login",
                "--headed",
            ])
            .unwrap();
            assert_eq!(cli.verbose, 1);
            let Commands::Run(args) = cli.command else {
                panic!("expected run command");
            };
            assert_eq!(args.suite.suite, PathBuf::from("suite.yaml"));
            assert_eq!(args.parallel, Some(4));
            assert_eq!(args.timeout_ms, Some(2000));
            assert_eq!(args.reporter, ReporterArg::Junit);
            assert_eq!(args.filter.as_deref(), Some("login"));
            assert!(args.headed);
            assert!(!args.no_retry);
        }

        #[test]
        fn test_run_defaults() {
            let cli = Cli::try_parse_from(["sceno", "run", "-s", "suite.yaml"]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run command");
            };
            assert_eq!(args.parallel, None);
            assert_eq!(args.reporter, ReporterArg::Text);
            assert_eq!(cli.log_format, LogFormatArg::Text);
        }

        #[test]
        fn test_validate_requires_suite() {
            assert!(Cli::try_parse_from(["sceno", "validate"]).is_err());
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::try_parse_from([
                "sceno",
                "list",
                "--suite",
                "s.yaml",
                "--quiet",
                "--log-format",
                "json",
                "--color",
                "never",
            ])
            .unwrap();
            assert!(cli.quiet);
            assert_eq!(cli.log_format, LogFormatArg::Json);
            assert_eq!(cli.color, ColorArg::Never);
        }

        #[test]
        fn test_unknown_reporter_rejected() {
            assert!(Cli::try_parse_from(["sceno", "run", "-s", "x.yaml", "-r", "tap"]).is_err());
        }

        #[test]
        fn test_demo_usage_lines_parse() {
            let demo = include_str!("../../../demos/saucedemo.yaml");
            let usages: Vec<&str> = demo
                .lines()
                .filter_map(|line| line.trim_start_matches('#').trim().strip_prefix("sceno "))
                .collect();
            assert!(!usages.is_empty());
            for usage in usages {
                let argv = std::iter::once("sceno").chain(usage.split_whitespace());
                if let Err(e) = Cli::try_parse_from(argv) {
                    panic!("`sceno {usage}` does not parse: {e}");
                }
            }
        }
    }

    mod conversion_tests {
        use super::*;

        #[test]
        fn test_reporter_into_format() {
            assert_eq!(
                sceno::ReportFormat::from(ReporterArg::Junit),
                sceno::ReportFormat::Junit
            );
        }

        #[test]
        fn test_color_into_choice() {
            assert_eq!(ColorChoice::from(ColorArg::Never), ColorChoice::Never);
        }
    }
}
