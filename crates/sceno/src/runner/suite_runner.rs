//! Report aggregator: runs every scenario of a suite and collects the results.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};

use super::{RunnerConfig, ScenarioRunner, SuiteDeadline};
use crate::driver::BrowserDriver;
use crate::report::{ScenarioResult, SuiteResult};
use crate::result::{SceneError, SceneResult};
use crate::scenario::Scenario;
use crate::suite::Suite;

/// Runs suites with bounded parallelism
#[derive(Clone)]
pub struct SuiteRunner {
    driver: Arc<dyn BrowserDriver>,
    config: Arc<RunnerConfig>,
}

impl std::fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .finish()
    }
}

impl SuiteRunner {
    /// Create a suite runner
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>, config: RunnerConfig) -> Self {
        Self {
            driver,
            config: Arc::new(config),
        }
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Scenarios selected by the configured filter, in suite order
    #[must_use]
    pub fn selected<'a>(&self, suite: &'a Suite) -> Vec<&'a Scenario> {
        suite
            .scenarios
            .iter()
            .filter(|s| self.config.selects(&s.id))
            .collect()
    }

    /// Run a suite
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ConfigError`] if the suite or configuration is
    /// invalid; no session is opened in that case. Scenario failures are
    /// reported in the result, never as errors.
    pub async fn run(&self, suite: &Suite) -> SceneResult<SuiteResult> {
        self.run_with(suite, |_| {}).await
    }

    /// Run a suite, calling `on_result` as each result becomes available in
    /// submission order
    pub async fn run_with(
        &self,
        suite: &Suite,
        mut on_result: impl FnMut(&ScenarioResult) + Send,
    ) -> SceneResult<SuiteResult> {
        suite.validate()?;
        self.config.validate()?;

        let span = info_span!("suite", name = %suite.name);
        async {
            let started_at = Utc::now();
            let clock = Instant::now();
            let deadline = self.config.suite_timeout_ms.map(SuiteDeadline::after_ms);
            let runner = ScenarioRunner::new(
                Arc::clone(&self.driver),
                Arc::new(suite.pages.clone()),
                Arc::clone(&self.config),
                suite.base_url.as_deref(),
            );

            let scenarios: Vec<Arc<Scenario>> = self
                .selected(suite)
                .into_iter()
                .map(|s| Arc::new(s.clone()))
                .collect();
            info!(
                scenarios = scenarios.len(),
                parallel = self.config.parallel,
                driver = self.driver.name(),
                "suite started"
            );

            let mut results = Vec::with_capacity(scenarios.len());
            let mut stream = stream::iter(scenarios.into_iter().map(|scenario| {
                let runner = runner.clone();
                async move {
                    let task = {
                        let scenario = Arc::clone(&scenario);
                        tokio::spawn(async move { runner.run(&scenario, deadline).await })
                    };
                    match task.await {
                        Ok(result) => result,
                        Err(join_error) => {
                            error!(scenario = %scenario.id, error = %join_error, "scenario task failed");
                            let err = SceneError::driver(format!("scenario task failed: {join_error}"));
                            ScenarioResult::not_started(&scenario, &err)
                        }
                    }
                }
            }))
            .buffered(self.config.parallel.max(1));

            while let Some(result) = stream.next().await {
                on_result(&result);
                results.push(result);
            }

            let result = SuiteResult::new(suite.name.clone(), started_at, results, clock.elapsed());
            info!(
                passed = result.totals.passed,
                failed = result.totals.failed,
                errored = result.totals.errored,
                "suite finished"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockElement, MockPage, MockSite};
    use crate::locator::{LocatorSet, LocatorTable};
    use crate::report::ScenarioStatus;
    use crate::scenario::{Expectation, Step, WaitCondition};

    fn site() -> MockSite {
        MockSite::new().page(
            "https://shop.test/",
            MockPage::new("Shop")
                .element(MockElement::new("#add", "Add").on_click(MockEffect::IncrementText(
                    ".badge".to_string(),
                )))
                .element(MockElement::new(".badge", "").hidden())
                .element(MockElement::new("#spinner", "...")),
        )
    }

    fn suite() -> Suite {
        let pages = LocatorSet::new().with_page(
            "shop",
            LocatorTable::new()
                .with_url_contains("shop.test")
                .with_locator("add", "#add")
                .with_locator("badge", ".badge")
                .with_locator("spinner", "#spinner"),
        );
        Suite::builder("shop")
            .base_url("https://shop.test")
            .pages(pages)
            .scenario(
                Scenario::new("badge_one")
                    .step(Step::navigate("/"))
                    .step(Step::click("add"))
                    .expect(Expectation::text_equals("badge", "1")),
            )
            .scenario(
                Scenario::new("badge_zero")
                    .step(Step::navigate("/"))
                    .step(Step::click("add"))
                    .expect(Expectation::text_equals("badge", "0")),
            )
            .scenario(Scenario::new("empty"))
            .scenario(
                Scenario::new("stuck")
                    .step(Step::navigate("/"))
                    .step(Step::wait_for("spinner", WaitCondition::Detached)),
            )
            .build()
            .unwrap()
    }

    fn config() -> RunnerConfig {
        RunnerConfig::builder()
            .default_timeout_ms(200)
            .poll_interval_ms(10)
            .build()
            .unwrap()
    }

    fn statuses(result: &SuiteResult) -> Vec<(String, ScenarioStatus)> {
        result
            .scenarios
            .iter()
            .map(|s| (s.id.clone(), s.status))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_run_keeps_order_and_totals() {
        let driver = MockDriver::new(site());
        let runner = SuiteRunner::new(Arc::new(driver.clone()), config());
        let result = runner.run(&suite()).await.unwrap();
        assert_eq!(
            statuses(&result),
            [
                ("badge_one".to_string(), ScenarioStatus::Passed),
                ("badge_zero".to_string(), ScenarioStatus::Failed),
                ("empty".to_string(), ScenarioStatus::Passed),
                ("stuck".to_string(), ScenarioStatus::Errored),
            ]
        );
        assert_eq!(result.totals.total(), 4);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(driver.counters().opened(), 4);
        assert_eq!(driver.counters().leaked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_matches_sequential() {
        let sequential = SuiteRunner::new(Arc::new(MockDriver::new(site())), config())
            .run(&suite())
            .await
            .unwrap();
        let mut parallel_config = config();
        parallel_config.parallel = 3;
        let parallel = SuiteRunner::new(Arc::new(MockDriver::new(site())), parallel_config)
            .run(&suite())
            .await
            .unwrap();
        assert_eq!(statuses(&sequential), statuses(&parallel));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_runs_matching_ids_only() {
        let config = RunnerConfig::builder().filter("badge").build().unwrap();
        let driver = MockDriver::new(site());
        let result = SuiteRunner::new(Arc::new(driver.clone()), config)
            .run(&suite())
            .await
            .unwrap();
        assert_eq!(result.scenarios.len(), 2);
        assert_eq!(driver.counters().opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suite_timeout_accounts_for_every_scenario() {
        let config = RunnerConfig::builder()
            .default_timeout_ms(10_000)
            .suite_timeout_ms(500)
            .build()
            .unwrap();
        let driver = MockDriver::new(site());
        let mut suite = suite();
        suite.scenarios.rotate_left(3);
        let result = SuiteRunner::new(Arc::new(driver.clone()), config)
            .run(&suite)
            .await
            .unwrap();
        assert_eq!(result.scenarios.len(), 4);
        assert_eq!(result.totals.total(), 4);
        assert_eq!(result.scenarios[0].id, "stuck");
        assert!(result.scenarios.iter().all(|s| s.status == ScenarioStatus::Errored
            && s.error_kind.as_deref() == Some("SuiteTimeout")));
        assert_eq!(driver.counters().opened(), 1);
        assert_eq!(driver.counters().leaked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_opens_nothing() {
        let driver = MockDriver::new(site());
        let mut config = config();
        config.parallel = 0;
        let err = SuiteRunner::new(Arc::new(driver.clone()), config)
            .run(&suite())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
        assert_eq!(driver.counters().opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_callback_sees_each_result() {
        let mut seen = Vec::new();
        let _ = SuiteRunner::new(Arc::new(MockDriver::new(site())), config())
            .run_with(&suite(), |r| seen.push(r.id.clone()))
            .await
            .unwrap();
        assert_eq!(seen, ["badge_one", "badge_zero", "empty", "stuck"]);
    }
}
