//! Runs one scenario end to end in its own browser session.
//!
//! ```text
//! Pending ──► Running ──┬──► Passed
//!                       ├──► Failed   (first assertion that does not hold)
//!                       └──► Errored  (action, session, panic or deadline)
//! ```
//!
//! The terminal status is decided and recorded first; the failure screenshot and
//! the session close happen afterwards, exactly once, on every exit path.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use super::{RunnerConfig, SuiteDeadline, CLEANUP_TIMEOUT_MS};
use crate::assertion::{AssertionEngine, AssertionOutcome};
use crate::driver::{BrowserDriver, BrowserSession};
use crate::executor::{write_artifact, ActionExecutor};
use crate::locator::LocatorSet;
use crate::report::{ScenarioResult, ScenarioStatus, StepRecord, StepStatus};
use crate::result::SceneError;
use crate::scenario::{Scenario, Step};

/// How the step loop ended
#[derive(Debug)]
enum Verdict {
    Passed,
    Failed(String),
    Errored { diagnostic: String, kind: String },
}

impl Verdict {
    fn errored(diagnostic: impl Into<String>, err: &SceneError) -> Self {
        Self::Errored {
            diagnostic: diagnostic.into(),
            kind: err.kind().to_string(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Sequences a scenario against a fresh session
#[derive(Clone)]
pub struct ScenarioRunner {
    driver: Arc<dyn BrowserDriver>,
    executor: ActionExecutor,
    assertions: AssertionEngine,
    config: Arc<RunnerConfig>,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        locators: Arc<LocatorSet>,
        config: Arc<RunnerConfig>,
        base_url: Option<&str>,
    ) -> Self {
        let mut executor = ActionExecutor::new(Arc::clone(&locators), Arc::clone(&config));
        if let Some(base) = base_url {
            executor = executor.with_base_url(base);
        }
        Self {
            driver,
            executor,
            assertions: AssertionEngine::new(locators),
            config,
        }
    }

    /// Run a scenario; always returns exactly one terminal result
    ///
    /// If `suite_deadline` has already elapsed no session is opened and the
    /// scenario is recorded as errored with `SuiteTimeout`.
    pub async fn run(
        &self,
        scenario: &Scenario,
        suite_deadline: Option<SuiteDeadline>,
    ) -> ScenarioResult {
        if let Some(deadline) = suite_deadline.filter(SuiteDeadline::expired) {
            debug!(scenario = %scenario.id, "suite deadline elapsed before start");
            return ScenarioResult::not_started(scenario, &deadline.error());
        }
        let span = info_span!("scenario", id = %scenario.id);
        self.run_in_session(scenario, suite_deadline)
            .instrument(span)
            .await
    }

    /// Earliest of the scenario and suite deadlines, with the error it raises
    fn deadline(&self, suite_deadline: Option<SuiteDeadline>) -> Option<(Instant, SceneError)> {
        let scenario = self.config.scenario_timeout_ms.map(|ms| {
            (
                Instant::now() + Duration::from_millis(ms),
                SceneError::ScenarioTimeout { ms },
            )
        });
        let suite = suite_deadline.map(|d| (d.at(), d.error()));
        match (scenario, suite) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    async fn run_in_session(
        &self,
        scenario: &Scenario,
        suite_deadline: Option<SuiteDeadline>,
    ) -> ScenarioResult {
        let started = Instant::now();
        info!(steps = scenario.steps.len(), "scenario started");

        let mut session = match self.driver.open_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "failed to open browser session");
                let mut result = ScenarioResult::not_started(scenario, &err);
                result.diagnostic = Some(format!("session open failed: {err}"));
                result.duration = started.elapsed();
                return result;
            }
        };

        let mut records = Vec::with_capacity(scenario.steps.len());
        let verdict = {
            let steps = AssertUnwindSafe(self.run_steps(&mut *session, scenario, &mut records))
                .catch_unwind();
            let caught = match self.deadline(suite_deadline) {
                Some((at, cause)) => match timeout_at(at, steps).await {
                    Ok(caught) => caught,
                    Err(_) => {
                        warn!(error = %cause, "scenario cut off by deadline");
                        Ok(Verdict::errored(cause.to_string(), &cause))
                    }
                },
                None => steps.await,
            };
            caught.unwrap_or_else(|payload| {
                let message = panic_message(&*payload);
                warn!(panic = %message, "step panicked");
                Verdict::errored(
                    format!("panic: {message}"),
                    &SceneError::driver(message.clone()),
                )
            })
        };

        let (status, diagnostic, error_kind) = match verdict {
            Verdict::Passed => (ScenarioStatus::Passed, None, None),
            Verdict::Failed(diagnostic) => (ScenarioStatus::Failed, Some(diagnostic), None),
            Verdict::Errored { diagnostic, kind } => {
                (ScenarioStatus::Errored, Some(diagnostic), Some(kind))
            }
        };
        finish_records(scenario, &mut records, status, diagnostic.as_deref());

        let artifact = if status.is_passed() {
            None
        } else {
            self.capture_failure(&*session, &scenario.id).await
        };
        self.close(&mut *session).await;

        let duration = started.elapsed();
        info!(status = %status, duration_ms = duration.as_millis() as u64, "scenario finished");
        ScenarioResult {
            id: scenario.id.clone(),
            status,
            steps: records,
            diagnostic,
            error_kind,
            artifact,
            duration,
        }
    }

    async fn run_steps(
        &self,
        session: &mut dyn BrowserSession,
        scenario: &Scenario,
        records: &mut Vec<StepRecord>,
    ) -> Verdict {
        for (index, step) in scenario.steps.iter().enumerate() {
            let started = Instant::now();
            let action = step.describe();
            let number = index + 1;
            let label = format!("step {number} ({action})");
            debug!(step = number, action = %action, "step started");

            let (status, attempts, verdict) = match step {
                Step::Assert { expect } => match self.assertions.evaluate(&*session, expect).await
                {
                    Ok(AssertionOutcome::Passed) => (StepStatus::Passed, 1, None),
                    Ok(outcome) => (
                        StepStatus::Failed,
                        1,
                        Some(Verdict::Failed(format!("{label}: {outcome}"))),
                    ),
                    Err(err) => (
                        StepStatus::Errored,
                        1,
                        Some(Verdict::errored(format!("{label}: {err}"), &err)),
                    ),
                },
                _ => {
                    let outcome = self.executor.execute(session, step).await;
                    match outcome.result {
                        Ok(()) => (StepStatus::Passed, outcome.attempts, None),
                        Err(err) => (
                            StepStatus::Errored,
                            outcome.attempts,
                            Some(Verdict::errored(format!("{label}: {err}"), &err)),
                        ),
                    }
                }
            };

            let diagnostic = match &verdict {
                Some(Verdict::Failed(d) | Verdict::Errored { diagnostic: d, .. }) => {
                    Some(d.clone())
                }
                Some(Verdict::Passed) | None => None,
            };
            records.push(StepRecord {
                step: number,
                action,
                status,
                diagnostic,
                attempts,
                duration: started.elapsed(),
            });
            if let Some(verdict) = verdict {
                return verdict;
            }
        }
        Verdict::Passed
    }

    async fn capture_failure(
        &self,
        session: &dyn BrowserSession,
        id: &str,
    ) -> Option<std::path::PathBuf> {
        if !self.config.screenshot_on_failure {
            return None;
        }
        let dir = self.config.artifacts_dir.as_deref()?;
        let capture = async {
            let png = session.screenshot().await?;
            write_artifact(dir, id, &png).await
        };
        match timeout(Duration::from_millis(CLEANUP_TIMEOUT_MS), capture).await {
            Ok(Ok(path)) => {
                info!(path = %path.display(), "failure screenshot saved");
                Some(path)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "failure screenshot not saved");
                None
            }
            Err(_) => {
                warn!("failure screenshot timed out");
                None
            }
        }
    }

    async fn close(&self, session: &mut dyn BrowserSession) {
        match timeout(Duration::from_millis(CLEANUP_TIMEOUT_MS), session.close()).await {
            Ok(Ok(())) => debug!("session closed"),
            Ok(Err(err)) => warn!(error = %err, "session close failed"),
            Err(_) => warn!("session close timed out"),
        }
    }
}

/// Mark the step in flight (cut off by a deadline or panic) as errored and
/// every step after it as skipped
fn finish_records(
    scenario: &Scenario,
    records: &mut Vec<StepRecord>,
    status: ScenarioStatus,
    diagnostic: Option<&str>,
) {
    let done = records.len();
    if done < scenario.steps.len() && status == ScenarioStatus::Errored {
        let interrupted = records
            .last()
            .map_or(true, |r| r.status != StepStatus::Errored);
        if interrupted {
            records.push(StepRecord {
                step: done + 1,
                action: scenario.steps[done].describe(),
                status: StepStatus::Errored,
                diagnostic: diagnostic.map(str::to_string),
                attempts: 1,
                duration: Duration::ZERO,
            });
        }
    }
    let done = records.len();
    records.extend(
        scenario.steps[done..]
            .iter()
            .enumerate()
            .map(|(i, step)| StepRecord::skipped(done + i + 1, step.describe())),
    );
}
