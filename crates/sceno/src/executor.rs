//! Action executor: performs one UI action against a session.
//!
//! Element actions wait for the target to become actionable first. When the
//! driver refuses the action itself as not interactable (typically a layout
//! shift between the wait and the click), the whole attempt is repeated once.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::driver::BrowserSession;
use crate::locator::{LocatorRef, LocatorSet};
use crate::result::{SceneError, SceneResult};
use crate::runner::RunnerConfig;
use crate::scenario::Step;
use crate::wait::{wait_for_actionable, wait_for_condition};

/// Navigation budget when a step does not override it
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

const MAX_ATTEMPTS: u32 = 2;

/// Result of executing one action step
#[derive(Debug)]
pub struct ActionOutcome {
    /// Times the action was attempted (1, or 2 after a retry)
    pub attempts: u32,
    /// Final result
    pub result: SceneResult<()>,
}

impl ActionOutcome {
    /// Check if the action completed
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Why an attempt did not complete
enum AttemptError {
    /// Driver refused the action; worth one more attempt
    Refused(SceneError),
    /// Anything else
    Final(SceneError),
}

impl From<SceneError> for AttemptError {
    fn from(err: SceneError) -> Self {
        Self::Final(err)
    }
}

/// Join a relative URL onto a base URL
///
/// Absolute URLs (anything with a scheme) are returned unchanged.
pub fn resolve_url(base_url: Option<&str>, url: &str) -> SceneResult<String> {
    if url.contains("://") || url.starts_with("about:") || url.starts_with("data:") {
        return Ok(url.to_string());
    }
    let base = base_url.ok_or_else(|| {
        SceneError::config(format!("relative url '{url}' requires a suite base_url"))
    })?;
    let base = base.trim_end_matches('/');
    if url.starts_with('/') {
        Ok(format!("{base}{url}"))
    } else {
        Ok(format!("{base}/{url}"))
    }
}

/// File path for a named artifact; the stem is reduced to a safe file name
#[must_use]
pub fn artifact_path(dir: &Path, stem: &str) -> PathBuf {
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{safe}.png"))
}

/// Write PNG bytes under `dir`, creating it if needed
pub async fn write_artifact(dir: &Path, stem: &str, png: &[u8]) -> SceneResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = artifact_path(dir, stem);
    tokio::fs::write(&path, png).await?;
    Ok(path)
}

/// Performs action steps
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    locators: Arc<LocatorSet>,
    config: Arc<RunnerConfig>,
    base_url: Option<String>,
}

impl ActionExecutor {
    /// Create an executor over shared tables and configuration
    #[must_use]
    pub fn new(locators: Arc<LocatorSet>, config: Arc<RunnerConfig>) -> Self {
        Self {
            locators,
            config,
            base_url: None,
        }
    }

    /// Set the base URL relative navigations are joined onto
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Execute one action step; side effects are confined to `session`
    pub async fn execute(&self, session: &mut dyn BrowserSession, step: &Step) -> ActionOutcome {
        let max_attempts = if self.config.retry_not_interactable {
            MAX_ATTEMPTS
        } else {
            1
        };
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(session, step).await {
                Ok(()) => {
                    return ActionOutcome {
                        attempts,
                        result: Ok(()),
                    }
                }
                Err(AttemptError::Refused(err)) if attempts < max_attempts => {
                    debug!(step = %step.describe(), error = %err, "action refused, retrying");
                }
                Err(AttemptError::Refused(err) | AttemptError::Final(err)) => {
                    return ActionOutcome {
                        attempts,
                        result: Err(err),
                    }
                }
            }
        }
    }

    async fn actionable(
        &self,
        session: &dyn BrowserSession,
        locator: &LocatorRef,
        timeout_ms: Option<u64>,
    ) -> SceneResult<String> {
        let options = self.config.wait_options(timeout_ms);
        wait_for_actionable(session, &self.locators, locator, &options).await
    }

    async fn attempt(
        &self,
        session: &mut dyn BrowserSession,
        step: &Step,
    ) -> Result<(), AttemptError> {
        match step {
            Step::Navigate { url, timeout_ms } => {
                self.navigate(session, url, *timeout_ms).await?;
            }
            Step::Fill {
                locator,
                value,
                timeout_ms,
            } => {
                let selector = self.actionable(&*session, locator, *timeout_ms).await?;
                session.fill(&selector, value).await.map_err(refused)?;
            }
            Step::Click {
                locator,
                timeout_ms,
            } => {
                let selector = self.actionable(&*session, locator, *timeout_ms).await?;
                session.click(&selector).await.map_err(refused)?;
            }
            Step::Select {
                locator,
                value,
                timeout_ms,
            } => {
                let selector = self.actionable(&*session, locator, *timeout_ms).await?;
                session.select_option(&selector, value).await.map_err(refused)?;
            }
            Step::Hover {
                locator,
                timeout_ms,
            } => {
                let selector = self.actionable(&*session, locator, *timeout_ms).await?;
                session.hover(&selector).await.map_err(refused)?;
            }
            Step::WaitFor {
                locator,
                condition,
                timeout_ms,
            } => {
                let options = self.config.wait_options(*timeout_ms);
                wait_for_condition(&*session, &self.locators, locator, *condition, &options)
                    .await?;
            }
            Step::GoBack => session.go_back().await?,
            Step::Screenshot { name } => self.screenshot(&*session, name).await?,
            Step::Assert { .. } => {
                return Err(AttemptError::Final(SceneError::config(
                    "assert steps are evaluated by the assertion engine",
                )))
            }
            Step::Fixture { name } => {
                return Err(AttemptError::Final(SceneError::config(format!(
                    "fixture '{name}' was not expanded at load time"
                ))))
            }
        }
        Ok(())
    }

    async fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        timeout_ms: Option<u64>,
    ) -> SceneResult<()> {
        let target = resolve_url(self.base_url.as_deref(), url)?;
        let ms = timeout_ms.unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_MS);
        let response = tokio::time::timeout(Duration::from_millis(ms), session.navigate(&target))
            .await
            .map_err(|_| SceneError::Timeout {
                target: format!("navigation to {target}"),
                ms,
            })??;
        if !response.is_success() {
            return Err(SceneError::NavigationError {
                url: target,
                message: format!(
                    "HTTP status {}",
                    response.status.map_or_else(String::new, |s| s.to_string())
                ),
            });
        }
        debug!(url = %response.url, status = ?response.status, "navigated");
        Ok(())
    }

    async fn screenshot(&self, session: &dyn BrowserSession, name: &str) -> SceneResult<()> {
        let Some(dir) = self.config.artifacts_dir.as_deref() else {
            debug!(name, "no artifacts directory configured, screenshot skipped");
            return Ok(());
        };
        let png = session.screenshot().await?;
        let path = write_artifact(dir, name, &png).await?;
        info!(path = %path.display(), "screenshot saved");
        Ok(())
    }
}

fn refused(err: SceneError) -> AttemptError {
    match err {
        SceneError::ElementNotInteractable { .. } => AttemptError::Refused(err),
        other => AttemptError::Final(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{BrowserDriver, MockDriver, MockEffect, MockElement, MockPage, MockSite};
    use crate::locator::LocatorTable;
    use crate::scenario::WaitCondition;

    const BASE: &str = "https://shop.test";

    fn locators() -> Arc<LocatorSet> {
        Arc::new(
            LocatorSet::new().with_page(
                "shop",
                LocatorTable::new()
                    .with_url_contains("shop.test")
                    .with_locator("user", "#user")
                    .with_locator("buy", "#buy")
                    .with_locator("sort", "select.sort")
                    .with_locator("menu", "#menu")
                    .with_locator("banner", "#banner"),
            ),
        )
    }

    fn executor(config: RunnerConfig) -> ActionExecutor {
        ActionExecutor::new(locators(), Arc::new(config)).with_base_url(BASE)
    }

    fn fast() -> RunnerConfig {
        RunnerConfig::builder()
            .default_timeout_ms(200)
            .poll_interval_ms(10)
            .build()
            .unwrap()
    }

    fn site(buy: MockElement) -> MockSite {
        MockSite::new()
            .page(
                "https://shop.test/",
                MockPage::new("Shop")
                    .element(MockElement::new("#user", ""))
                    .element(buy)
                    .element(MockElement::new("select.sort", "").with_options(&["az", "za"]))
                    .element(MockElement::new("#menu", "Menu").on_hover(MockEffect::Show(
                        "#banner".to_string(),
                    )))
                    .element(MockElement::new("#banner", "Sale").hidden()),
            )
            .page("https://shop.test/done", MockPage::new("Done"))
            .page("https://shop.test/broken", MockPage::new("Oops").with_status(500))
    }

    async fn open(site: MockSite) -> (MockDriver, Box<dyn BrowserSession>) {
        let driver = MockDriver::new(site);
        let session = driver.open_session().await.unwrap();
        (driver, session)
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_resolve_relative_and_absolute() {
            assert_eq!(
                resolve_url(Some("https://a.test/"), "/inventory.html").unwrap(),
                "https://a.test/inventory.html"
            );
            assert_eq!(
                resolve_url(Some("https://a.test"), "cart.html").unwrap(),
                "https://a.test/cart.html"
            );
            assert_eq!(
                resolve_url(None, "https://b.test/").unwrap(),
                "https://b.test/"
            );
            assert!(resolve_url(None, "/").is_err());
        }

        #[test]
        fn test_artifact_path_sanitized() {
            let path = artifact_path(Path::new("/tmp/a"), "login valid/1");
            assert_eq!(path, Path::new("/tmp/a/login_valid_1.png"));
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_fill_click() {
            let buy = MockElement::new("#buy", "Buy")
                .on_click(MockEffect::Navigate("https://shop.test/done".to_string()));
            let (_driver, mut s) = open(site(buy)).await;
            let exec = executor(fast());
            assert!(exec.execute(&mut *s, &Step::navigate("/")).await.is_ok());
            let fill = exec.execute(&mut *s, &Step::fill("user", "alice")).await;
            assert_eq!(fill.attempts, 1);
            assert!(fill.is_ok());
            assert_eq!(s.input_value("#user").await.unwrap().as_deref(), Some("alice"));
            assert!(exec.execute(&mut *s, &Step::click("buy")).await.is_ok());
            assert_eq!(s.current_url().await.unwrap(), "https://shop.test/done");
            assert!(exec.execute(&mut *s, &Step::GoBack).await.is_ok());
            assert_eq!(s.current_url().await.unwrap(), "https://shop.test/");
        }

        #[tokio::test(start_paused = true)]
        async fn test_navigation_error_on_500() {
            let (_driver, mut s) = open(site(MockElement::new("#buy", "Buy"))).await;
            let outcome = executor(fast())
                .execute(&mut *s, &Step::navigate("/broken"))
                .await;
            let err = outcome.result.unwrap_err();
            assert_eq!(err.kind(), "NavigationError");
            assert!(err.to_string().contains("500"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_layout_shift_retried_once() {
            let buy = MockElement::new("#buy", "Buy").layout_shifts(1);
            let (_driver, mut s) = open(site(buy)).await;
            let exec = executor(fast());
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            let outcome = exec.execute(&mut *s, &Step::click("buy")).await;
            assert!(outcome.is_ok());
            assert_eq!(outcome.attempts, 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_second_refusal_surfaces() {
            let buy = MockElement::new("#buy", "Buy").layout_shifts(2);
            let (_driver, mut s) = open(site(buy)).await;
            let exec = executor(fast());
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            let outcome = exec.execute(&mut *s, &Step::click("buy")).await;
            assert_eq!(outcome.attempts, 2);
            assert_eq!(outcome.result.unwrap_err().kind(), "ElementNotInteractable");
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_can_be_disabled() {
            let buy = MockElement::new("#buy", "Buy").layout_shifts(1);
            let (_driver, mut s) = open(site(buy)).await;
            let config = RunnerConfig::builder()
                .default_timeout_ms(200)
                .retry_not_interactable(false)
                .build()
                .unwrap();
            let exec = executor(config);
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            let outcome = exec.execute(&mut *s, &Step::click("buy")).await;
            assert_eq!(outcome.attempts, 1);
            assert!(!outcome.is_ok());
        }

        #[tokio::test(start_paused = true)]
        async fn test_covered_element_not_retried() {
            let buy = MockElement::new("#buy", "Buy").covered();
            let (_driver, mut s) = open(site(buy)).await;
            let exec = executor(fast());
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            let outcome = exec.execute(&mut *s, &Step::click("buy")).await;
            assert_eq!(outcome.attempts, 1);
            assert_eq!(outcome.result.unwrap_err().kind(), "ElementNotInteractable");
        }

        #[tokio::test(start_paused = true)]
        async fn test_select_rejects_unknown_option() {
            let (_driver, mut s) = open(site(MockElement::new("#buy", "Buy"))).await;
            let exec = executor(fast());
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            assert!(exec.execute(&mut *s, &Step::select("sort", "za")).await.is_ok());
            let bad = exec.execute(&mut *s, &Step::select("sort", "price")).await;
            assert_eq!(bad.result.unwrap_err().kind(), "DriverError");
        }

        #[tokio::test(start_paused = true)]
        async fn test_hover_then_wait_for_visible() {
            let (_driver, mut s) = open(site(MockElement::new("#buy", "Buy"))).await;
            let exec = executor(fast());
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            let wait = Step::wait_for("banner", WaitCondition::Visible);
            assert!(!exec.execute(&mut *s, &wait).await.is_ok());
            assert!(exec.execute(&mut *s, &Step::hover("menu")).await.is_ok());
            assert!(exec.execute(&mut *s, &wait).await.is_ok());
        }

        #[tokio::test(start_paused = true)]
        async fn test_unexpanded_fixture_is_config_error() {
            let (_driver, mut s) = open(site(MockElement::new("#buy", "Buy"))).await;
            let outcome = executor(fast())
                .execute(&mut *s, &Step::fixture("login"))
                .await;
            assert_eq!(outcome.result.unwrap_err().kind(), "ConfigError");
        }
    }

    mod screenshot_tests {
        use super::*;

        #[tokio::test]
        async fn test_screenshot_written_to_artifacts() {
            let dir = tempfile::tempdir().unwrap();
            let config = RunnerConfig::builder()
                .artifacts_dir(dir.path())
                .build()
                .unwrap();
            let (_driver, mut s) = open(site(MockElement::new("#buy", "Buy"))).await;
            let exec = executor(config);
            let _ = exec.execute(&mut *s, &Step::navigate("/")).await;
            let step = Step::Screenshot {
                name: "home".to_string(),
            };
            assert!(exec.execute(&mut *s, &step).await.is_ok());
            let bytes = std::fs::read(dir.path().join("home.png")).unwrap();
            assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        }
    }
}
