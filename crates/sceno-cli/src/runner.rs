//! Command handlers

use chrono::Utc;
use sceno::{
    BrowserDriver, DriverConfig, ReportFormat, RunnerConfig, Suite, SuiteResult, SuiteRunner,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_listing, ProgressReporter};

/// Load and validate a suite file
pub fn load_suite(path: &Path) -> CliResult<Suite> {
    let suite = Suite::from_path(path)?;
    info!(suite = %suite.name, scenarios = suite.scenarios.len(), path = %path.display(), "suite loaded");
    Ok(suite)
}

/// Effective run configuration: defaults, then suite settings, then flags
pub fn runner_config(suite: &Suite, args: &RunArgs) -> CliResult<RunnerConfig> {
    let mut builder = RunnerConfig::builder().settings(&suite.settings);
    if let Some(parallel) = args.parallel {
        builder = builder.parallel(parallel);
    }
    if let Some(ms) = args.timeout_ms {
        builder = builder.default_timeout_ms(ms);
    }
    if let Some(ms) = args.scenario_timeout_ms {
        builder = builder.scenario_timeout_ms(ms);
    }
    if let Some(ms) = args.suite_timeout_ms {
        builder = builder.suite_timeout_ms(ms);
    }
    if let Some(ref dir) = args.artifacts {
        builder = builder.artifacts_dir(dir);
    }
    if let Some(ref filter) = args.filter {
        builder = builder.filter(filter);
    }
    if args.no_screenshots {
        builder = builder.screenshot_on_failure(false);
    }
    if args.no_retry {
        builder = builder.retry_not_interactable(false);
    }
    Ok(builder.build()?)
}

/// Browser settings from the run flags
#[must_use]
pub fn driver_config(args: &RunArgs) -> DriverConfig {
    let mut config = DriverConfig::new().headless(!args.headed);
    if args.no_sandbox {
        config = config.no_sandbox();
    }
    if let Some(ref path) = args.chromium {
        config = config.executable_path(path.display().to_string());
    }
    config
}

/// `sceno validate`
pub fn validate(config: &CliConfig, path: &Path) -> CliResult<()> {
    let suite = load_suite(path)?;
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.info(&format!(
        "{}: {} scenarios, {} pages, {} fixtures",
        suite.name,
        suite.scenarios.len(),
        suite.pages.pages().len(),
        suite.fixtures.len()
    ));
    println!("{} is valid", path.display());
    Ok(())
}

/// `sceno list`
pub fn list(path: &Path) -> CliResult<()> {
    let suite = load_suite(path)?;
    print!("{}", render_listing(&suite));
    Ok(())
}

/// `sceno run`; returns the process exit code
pub async fn run(config: &CliConfig, args: &RunArgs) -> CliResult<u8> {
    let suite = load_suite(&args.suite.suite)?;
    let runner_config = runner_config(&suite, args)?;

    let mut reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
        .with_verbose(config.verbosity.is_verbose());

    let selected = suite
        .scenarios
        .iter()
        .filter(|s| runner_config.selects(&s.id))
        .count();

    let result = if selected == 0 {
        reporter.warning("no scenarios selected");
        SuiteResult::new(suite.name.clone(), Utc::now(), Vec::new(), Duration::ZERO)
    } else {
        reporter.header(&suite.name);
        reporter.start_progress(selected as u64, &suite.name);
        let result = run_in_browser(&suite, runner_config, args, &reporter).await;
        reporter.finish();
        result?
    };

    emit_report(&result, args)?;
    reporter.summary(&result);
    Ok(u8::try_from(result.exit_code()).unwrap_or(crate::error::EXIT_FAILURE))
}

#[cfg_attr(not(feature = "browser"), allow(dead_code))]
async fn execute(
    driver: Arc<dyn BrowserDriver>,
    suite: &Suite,
    runner_config: RunnerConfig,
    reporter: &ProgressReporter,
) -> CliResult<SuiteResult> {
    let runner = SuiteRunner::new(driver, runner_config);
    Ok(runner
        .run_with(suite, |result| reporter.scenario_finished(result))
        .await?)
}

#[cfg(feature = "browser")]
async fn run_in_browser(
    suite: &Suite,
    runner_config: RunnerConfig,
    args: &RunArgs,
    reporter: &ProgressReporter,
) -> CliResult<SuiteResult> {
    let driver = sceno::CdpDriver::launch(driver_config(args))
        .await
        .map_err(|e| CliError::browser(e.to_string()))?;
    let driver = Arc::new(driver);
    let result = execute(Arc::clone(&driver) as Arc<dyn BrowserDriver>, suite, runner_config, reporter).await;

    match Arc::try_unwrap(driver) {
        Ok(driver) => {
            if let Err(e) = driver.shutdown().await {
                warn!(error = %e, "browser shutdown failed");
            }
        }
        Err(_) => warn!("browser still in use at shutdown"),
    }
    result
}

#[cfg(not(feature = "browser"))]
async fn run_in_browser(
    _suite: &Suite,
    _runner_config: RunnerConfig,
    _args: &RunArgs,
    _reporter: &ProgressReporter,
) -> CliResult<SuiteResult> {
    Err(CliError::browser("sceno was built without the `browser` feature"))
}

fn emit_report(result: &SuiteResult, args: &RunArgs) -> CliResult<()> {
    let format: ReportFormat = args.reporter.into();
    match args.output {
        Some(ref path) => {
            result
                .write_to(path, format)
                .map_err(|e| CliError::report_generation(format!("{}: {e}", path.display())))?;
            info!(path = %path.display(), %format, "report written");
        }
        None => {
            let body = result
                .render(format)
                .map_err(|e| CliError::report_generation(e.to_string()))?;
            print!("{body}");
            if !body.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use sceno::{MockDriver, MockElement, MockPage, MockSite, Scenario, Step};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["sceno", "run", "--suite", "suite.yaml"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn suite() -> Suite {
        let yaml = r#"
version: "1.0"
name: shop
base_url: https://shop.test
settings:
  default_timeout_ms: 1500
  parallel: 2
pages:
  common:
    locators:
      title: ["h1"]
scenarios:
  - id: title
    steps:
      - { type: navigate, url: / }
      - type: assert
        expect: { kind: text_equals, locator: title, expected: Shop }
  - id: other
"#;
        Suite::from_yaml_str(yaml).unwrap()
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_suite_settings_apply() {
            let config = runner_config(&suite(), &run_args(&[])).unwrap();
            assert_eq!(config.default_timeout_ms, 1500);
            assert_eq!(config.parallel, 2);
        }

        #[test]
        fn test_flags_override_settings() {
            let args = run_args(&["-j", "5", "--timeout-ms", "900", "--no-retry", "--filter", "ti"]);
            let config = runner_config(&suite(), &args).unwrap();
            assert_eq!(config.parallel, 5);
            assert_eq!(config.default_timeout_ms, 900);
            assert!(!config.retry_not_interactable);
            assert!(config.selects("title"));
            assert!(!config.selects("other"));
        }

        #[test]
        fn test_zero_parallel_is_config_error() {
            let err = runner_config(&suite(), &run_args(&["-j", "0"])).unwrap_err();
            assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);
        }

        #[test]
        fn test_driver_config_flags() {
            let config = driver_config(&run_args(&["--headed", "--no-sandbox", "--chromium", "/opt/chrome"]));
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.executable_path.as_deref(), Some("/opt/chrome"));
        }
    }

    mod execute_tests {
        use super::*;

        #[tokio::test]
        async fn test_execute_reports_each_scenario() {
            let site = MockSite::new().page(
                "https://shop.test/",
                MockPage::new("Shop").element(MockElement::new("h1", "Shop")),
            );
            let mut suite = suite();
            suite.scenarios.push(Scenario::new("third").step(Step::navigate("/")));
            let config = runner_config(&suite, &run_args(&[])).unwrap();
            let reporter = ProgressReporter::new(false, true);
            let result = execute(Arc::new(MockDriver::new(site)), &suite, config, &reporter)
                .await
                .unwrap();
            assert_eq!(result.totals.passed, 3);
            assert_eq!(result.exit_code(), 0);
        }
    }
}
