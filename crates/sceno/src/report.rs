//! Run results and report rendering.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  SuiteResult                                                       │
//! │  ───────────                                                       │
//! │  run id, start time, totals { passed, failed, errored }            │
//! │                                                                    │
//! │  ┌──────────────────────┐   ┌──────────────────────┐               │
//! │  │  ScenarioResult      │   │  ScenarioResult      │  ... in       │
//! │  │  id, status,         │   │                      │  submission   │
//! │  │  StepRecord[]        │   │                      │  order        │
//! │  └──────────────────────┘   └──────────────────────┘               │
//! │                                                                    │
//! │  render: text | json | junit                                       │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::result::{SceneError, SceneResult};
use crate::scenario::Scenario;

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Status of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Step completed
    Passed,
    /// Assertion did not hold
    Failed,
    /// Action could not be performed
    Errored,
    /// Not run because an earlier step ended the scenario
    Skipped,
}

/// Terminal status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Every step completed
    Passed,
    /// An assertion did not hold
    Failed,
    /// An action, the session or a deadline failed
    Errored,
}

impl ScenarioStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
        })
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        })
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Record of one executed (or skipped) step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// One-based step number, as used in diagnostics
    pub step: usize,
    /// Short description of the action or expectation
    pub action: String,
    /// Step status
    pub status: StepStatus,
    /// Failure diagnostic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Times the action was attempted
    pub attempts: u32,
    /// Wall time spent on the step
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
}

impl StepRecord {
    /// Record for a step that never ran
    #[must_use]
    pub fn skipped(step: usize, action: impl Into<String>) -> Self {
        Self {
            step,
            action: action.into(),
            status: StepStatus::Skipped,
            diagnostic: None,
            attempts: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    /// Scenario id
    pub id: String,
    /// Terminal status
    pub status: ScenarioStatus,
    /// One record per scenario step, in order
    pub steps: Vec<StepRecord>,
    /// Diagnostic of the step or event that ended the scenario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Error taxonomy name when errored (e.g. `SuiteTimeout`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Failure screenshot path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Wall time of the scenario
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
}

impl ScenarioResult {
    /// Errored result for a scenario that never ran; no session was opened
    #[must_use]
    pub fn not_started(scenario: &Scenario, error: &SceneError) -> Self {
        Self {
            id: scenario.id.clone(),
            status: ScenarioStatus::Errored,
            steps: scenario
                .steps
                .iter()
                .enumerate()
                .map(|(i, step)| StepRecord::skipped(i + 1, step.describe()))
                .collect(),
            diagnostic: Some(error.to_string()),
            error_kind: Some(error.kind().to_string()),
            artifact: None,
            duration: Duration::ZERO,
        }
    }

    /// Check if the scenario passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        self.status.is_passed()
    }

    /// Records of steps that did not pass or skip
    pub fn failing_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed | StepStatus::Errored))
    }
}

/// Scenario counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Passed scenarios
    pub passed: usize,
    /// Failed scenarios
    pub failed: usize,
    /// Errored scenarios
    pub errored: usize,
}

impl Totals {
    /// Count statuses of results
    #[must_use]
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        results.iter().fold(Self::default(), |mut t, r| {
            match r.status {
                ScenarioStatus::Passed => t.passed += 1,
                ScenarioStatus::Failed => t.failed += 1,
                ScenarioStatus::Errored => t.errored += 1,
            }
            t
        })
    }

    /// Total scenarios counted
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.errored
    }
}

/// Outcome of a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    /// Suite name
    pub name: String,
    /// Unique id of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Results in submission order
    pub scenarios: Vec<ScenarioResult>,
    /// Counts by status
    pub totals: Totals,
    /// Wall time of the run
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
}

impl SuiteResult {
    /// Assemble a result; totals are derived from `scenarios`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        scenarios: Vec<ScenarioResult>,
        duration: Duration,
    ) -> Self {
        let totals = Totals::from_results(&scenarios);
        Self {
            name: name.into(),
            run_id: Uuid::new_v4(),
            started_at,
            scenarios,
            totals,
            duration,
        }
    }

    /// True iff every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioResult::is_passed)
    }

    /// Process exit code: 0 iff every scenario passed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }

    /// Result of a scenario by id
    #[must_use]
    pub fn scenario(&self, id: &str) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed, {} errored ({} scenarios in {:.2}s)",
            self.name,
            self.totals.passed,
            self.totals.failed,
            self.totals.errored,
            self.totals.total(),
            self.duration.as_secs_f64()
        )
    }

    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> SceneResult<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.render_json(),
            ReportFormat::Junit => Ok(self.render_junit()),
        }
    }

    /// Render and write to a file
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_to(&self, path: &Path, format: ReportFormat) -> SceneResult<()> {
        let body = self.render(format)?;
        std::fs::write(path, body)?;
        Ok(())
    }

    /// Render pretty JSON
    pub fn render_json(&self) -> SceneResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render a plain-text report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for result in &self.scenarios {
            let marker = match result.status {
                ScenarioStatus::Passed => "PASS ",
                ScenarioStatus::Failed => "FAIL ",
                ScenarioStatus::Errored => "ERROR",
            };
            out.push_str(&format!(
                "{marker} {} ({}ms)\n",
                result.id,
                result.duration.as_millis()
            ));
            if let Some(diagnostic) = &result.diagnostic {
                out.push_str(&format!("      {diagnostic}\n"));
            }
            if let Some(artifact) = &result.artifact {
                out.push_str(&format!("      screenshot: {}\n", artifact.display()));
            }
        }
        out.push('\n');
        out.push_str(&self.summary());
        out.push('\n');
        out
    }

    /// Render JUnit XML for CI integration
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" errors="{}" time="{:.3}" timestamp="{}">"#,
            escape_xml(&self.name),
            self.totals.total(),
            self.totals.failed,
            self.totals.errored,
            self.duration.as_secs_f64(),
            self.started_at.to_rfc3339()
        ));
        xml.push('\n');

        for result in &self.scenarios {
            xml.push_str(&format!(
                r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
                escape_xml(&self.name),
                escape_xml(&result.id),
                result.duration.as_secs_f64()
            ));
            xml.push('\n');

            let message = result.diagnostic.as_deref().unwrap_or_default();
            match result.status {
                ScenarioStatus::Passed => {}
                ScenarioStatus::Failed => {
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(message),
                        escape_xml(message)
                    ));
                    xml.push('\n');
                }
                ScenarioStatus::Errored => {
                    xml.push_str(&format!(
                        r#"    <error type="{}" message="{}">{}</error>"#,
                        escape_xml(result.error_kind.as_deref().unwrap_or("Error")),
                        escape_xml(message),
                        escape_xml(message)
                    ));
                    xml.push('\n');
                }
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// =============================================================================
// FORMAT
// =============================================================================

/// Output format for a suite report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
    /// JUnit XML
    Junit,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Junit => "junit",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "junit" | "xml" => Ok(Self::Junit),
            other => Err(SceneError::config(format!("unknown report format '{other}'"))),
        }
    }
}
