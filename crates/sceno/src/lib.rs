//! Sceno: declarative end-to-end browser scenarios
//!
//! A suite file describes pages as tables of fallback selectors, and
//! scenarios as sequences of UI steps ending in assertions. Every scenario
//! runs in its own isolated browser session; results come back in
//! submission order no matter how many scenarios ran concurrently.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       SCENO Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Suite      │    │ Suite      │    │ Scenario   │            │
//! │   │ (YAML)     │───►│ Runner     │───►│ Runner xN  │            │
//! │   └────────────┘    └─────┬──────┘    └─────┬──────┘            │
//! │                           │                 │                   │
//! │                           ▼                 ▼                   │
//! │                     ┌────────────┐    ┌────────────┐            │
//! │                     │ SuiteResult│    │ Executor / │            │
//! │                     │ text|json| │    │ Assertions │            │
//! │                     │ junit      │    └─────┬──────┘            │
//! │                     └────────────┘          ▼                   │
//! │                                       ┌────────────┐            │
//! │                                       │ Browser    │            │
//! │                                       │ Session    │            │
//! │                                       └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sceno::{MockDriver, MockSite, RunnerConfig, Suite, SuiteRunner};
//!
//! # async fn demo() -> sceno::SceneResult<()> {
//! let suite = Suite::from_path(std::path::Path::new("saucedemo.yaml"))?;
//! let config = RunnerConfig::builder().settings(&suite.settings).build()?;
//! let runner = SuiteRunner::new(Arc::new(MockDriver::new(MockSite::new())), config);
//! let result = runner.run(&suite).await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod assertion;
mod driver;
mod executor;
mod locator;
mod report;
mod result;
mod runner;
mod scenario;
mod suite;
mod wait;

pub use assertion::{AssertionEngine, AssertionOutcome, ELEMENT_NOT_FOUND};
#[cfg(feature = "browser")]
pub use driver::CdpDriver;
pub use driver::{
    BrowserDriver, BrowserSession, DriverConfig, ElementState, MockDriver, MockEffect,
    MockElement, MockPage, MockSite, NavigationResponse, SessionCounters,
};
pub use executor::{
    artifact_path, resolve_url, write_artifact, ActionExecutor, ActionOutcome,
    DEFAULT_NAVIGATION_TIMEOUT_MS,
};
pub use locator::{LocatorRef, LocatorSet, LocatorTable, COMMON_PAGE};
pub use report::{
    ReportFormat, ScenarioResult, ScenarioStatus, StepRecord, StepStatus, SuiteResult, Totals,
};
pub use result::{SceneError, SceneResult};
pub use runner::{
    RunnerConfig, RunnerConfigBuilder, ScenarioRunner, SuiteDeadline, SuiteRunner,
    SuiteSettings, CLEANUP_TIMEOUT_MS,
};
pub use scenario::{Expectation, Scenario, Step, WaitCondition};
pub use suite::{Suite, SuiteBuilder, SUPPORTED_VERSION};
pub use wait::{
    wait_for_actionable, wait_for_condition, WaitOptions, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::assertion::*;
    pub use super::driver::*;
    pub use super::executor::*;
    pub use super::locator::*;
    pub use super::report::*;
    pub use super::result::*;
    pub use super::runner::*;
    pub use super::scenario::*;
    pub use super::suite::*;
    pub use super::wait::*;
}
