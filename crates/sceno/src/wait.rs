//! Bounded polling waits against a live session.
//!
//! All waits share one shape: probe the page, return as soon as the condition
//! holds, otherwise sleep one poll interval and try again until the deadline.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::driver::{BrowserSession, ElementState};
use crate::locator::{LocatorRef, LocatorSet};
use crate::result::{SceneError, SceneResult};
use crate::scenario::WaitCondition;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for element waits (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration; never zero
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// =============================================================================
// PROBING
// =============================================================================

/// What one probe saw for a locator reference
#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe {
    /// No candidate matched
    Absent,
    /// A candidate matched these elements
    Present {
        selector: String,
        elements: Vec<ElementState>,
    },
}

impl Probe {
    fn first(&self) -> Option<&ElementState> {
        match self {
            Self::Absent => None,
            Self::Present { elements, .. } => elements.first(),
        }
    }

    fn satisfies(&self, condition: WaitCondition) -> bool {
        match (condition, self) {
            (WaitCondition::Attached, Self::Present { .. })
            | (WaitCondition::Detached | WaitCondition::Hidden, Self::Absent) => true,
            (WaitCondition::Attached | WaitCondition::Visible | WaitCondition::Enabled, Self::Absent)
            | (WaitCondition::Detached, Self::Present { .. }) => false,
            (WaitCondition::Visible, Self::Present { elements, .. }) => {
                elements.iter().any(|e| e.visible)
            }
            (WaitCondition::Hidden, Self::Present { elements, .. }) => {
                elements.iter().all(|e| !e.visible)
            }
            (WaitCondition::Enabled, Self::Present { elements, .. }) => {
                elements.first().is_some_and(|e| e.visible && e.enabled)
            }
        }
    }
}

async fn probe(
    session: &dyn BrowserSession,
    locators: &LocatorSet,
    reference: &LocatorRef,
) -> SceneResult<Probe> {
    let candidates = locators.candidates_live(session, reference).await?;
    for selector in candidates {
        let elements = session.query_all(selector).await?;
        if !elements.is_empty() {
            return Ok(Probe::Present {
                selector: selector.clone(),
                elements,
            });
        }
    }
    Ok(Probe::Absent)
}

/// Probe once; an unqualified name missing from the current page context
/// counts as absent because the page may still be changing
async fn probe_tolerant(
    session: &dyn BrowserSession,
    locators: &LocatorSet,
    reference: &LocatorRef,
    last_unknown: &mut Option<SceneError>,
) -> SceneResult<Probe> {
    match probe(session, locators, reference).await {
        Err(err @ SceneError::UnknownLocator { .. }) if reference.page().is_none() => {
            *last_unknown = Some(err);
            Ok(Probe::Absent)
        }
        other => {
            *last_unknown = None;
            other
        }
    }
}

async fn pause(deadline: Instant, options: &WaitOptions) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    sleep(options.poll_interval().min(deadline - now)).await;
    true
}

// =============================================================================
// WAITS
// =============================================================================

/// Wait until the referenced element is present, visible, enabled and not
/// obscured; returns the selector that matched
///
/// # Errors
///
/// - [`SceneError::ElementNotInteractable`] if at the deadline the element was
///   present and visible but disabled or covered
/// - [`SceneError::Timeout`] if it never became present and visible
/// - [`SceneError::UnknownLocator`] if the name has no table entry
pub async fn wait_for_actionable(
    session: &dyn BrowserSession,
    locators: &LocatorSet,
    reference: &LocatorRef,
    options: &WaitOptions,
) -> SceneResult<String> {
    let deadline = Instant::now() + options.timeout();
    let mut last_unknown = None;
    let mut last;
    loop {
        last = probe_tolerant(session, locators, reference, &mut last_unknown).await?;
        if let Probe::Present { selector, elements } = &last {
            if elements.first().is_some_and(ElementState::is_actionable) {
                return Ok(selector.clone());
            }
        }
        if !pause(deadline, options).await {
            break;
        }
        trace!(locator = %reference, "element not actionable yet");
    }

    if let Some(err) = last_unknown {
        return Err(err);
    }
    match (&last, last.first()) {
        (Probe::Present { selector, .. }, Some(element)) if element.visible => {
            let reason = if element.enabled {
                "element is covered by another element"
            } else {
                "element is disabled"
            };
            Err(SceneError::not_interactable(selector.clone(), reason))
        }
        _ => Err(SceneError::Timeout {
            target: reference.to_string(),
            ms: options.timeout_ms,
        }),
    }
}

/// Wait until the referenced element reaches `condition`
///
/// # Errors
///
/// Returns [`SceneError::Timeout`] if the condition does not hold before the
/// deadline, or [`SceneError::UnknownLocator`] if the name has no table entry
pub async fn wait_for_condition(
    session: &dyn BrowserSession,
    locators: &LocatorSet,
    reference: &LocatorRef,
    condition: WaitCondition,
    options: &WaitOptions,
) -> SceneResult<()> {
    let deadline = Instant::now() + options.timeout();
    let mut last_unknown = None;
    loop {
        let seen = probe_tolerant(session, locators, reference, &mut last_unknown).await?;
        if last_unknown.is_none() && seen.satisfies(condition) {
            return Ok(());
        }
        if !pause(deadline, options).await {
            break;
        }
    }
    match last_unknown {
        Some(err) => Err(err),
        None => Err(SceneError::Timeout {
            target: format!("{reference} to be {condition}"),
            ms: options.timeout_ms,
        }),
    }
}
