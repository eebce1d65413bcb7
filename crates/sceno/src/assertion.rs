//! Assertion engine: evaluates expectations against current page state.
//!
//! Evaluation is a single read of the page; there is no polling here. Use a
//! `wait_for` step first when the page needs time to settle.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::driver::BrowserSession;
use crate::locator::{LocatorRef, LocatorSet};
use crate::result::{SceneError, SceneResult};
use crate::scenario::Expectation;

/// Detail recorded when the target element does not exist
pub const ELEMENT_NOT_FOUND: &str = "ElementNotFound";

const NOT_FOUND_ACTUAL: &str = "<element not found>";

/// Result of evaluating one expectation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionOutcome {
    /// The expectation held
    Passed,
    /// The expectation did not hold
    Failed {
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
        /// Extra context, e.g. [`ELEMENT_NOT_FOUND`]
        detail: Option<String>,
    },
}

impl AssertionOutcome {
    fn failed(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Failed {
            expected: expected.into(),
            actual: actual.into(),
            detail: None,
        }
    }

    fn not_found(expected: impl Into<String>) -> Self {
        Self::Failed {
            expected: expected.into(),
            actual: NOT_FOUND_ACTUAL.to_string(),
            detail: Some(ELEMENT_NOT_FOUND.to_string()),
        }
    }

    fn check(ok: bool, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        if ok {
            Self::Passed
        } else {
            Self::failed(expected, actual)
        }
    }

    /// Whether the expectation held
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for AssertionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed {
                expected,
                actual,
                detail,
            } => {
                write!(f, "expected {expected:?}, actual {actual:?}")?;
                if let Some(detail) = detail {
                    write!(f, " ({detail})")?;
                }
                Ok(())
            }
        }
    }
}

fn text_matches(actual: &str, expected: &str, ignore_case: bool, contains: bool) -> bool {
    let actual = actual.trim();
    if ignore_case {
        let (actual, expected) = (actual.to_lowercase(), expected.to_lowercase());
        if contains {
            actual.contains(&expected)
        } else {
            actual == expected
        }
    } else if contains {
        actual.contains(expected)
    } else {
        actual == expected
    }
}

/// Evaluates [`Expectation`]s against a session
#[derive(Debug, Clone)]
pub struct AssertionEngine {
    locators: Arc<LocatorSet>,
}

impl AssertionEngine {
    /// Create an engine over shared locator tables
    #[must_use]
    pub const fn new(locators: Arc<LocatorSet>) -> Self {
        Self { locators }
    }

    /// Resolve to a live selector; `None` when no candidate matches or an
    /// unqualified name is not known on the current page
    async fn find(
        &self,
        session: &dyn BrowserSession,
        reference: &LocatorRef,
    ) -> SceneResult<Option<String>> {
        match self.locators.resolve_live(session, reference).await {
            Ok(selector) => Ok(Some(selector)),
            Err(SceneError::LocatorNotFound { .. }) => Ok(None),
            // The current page has no entry for an unqualified name
            Err(SceneError::UnknownLocator { .. }) if reference.page().is_none() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn first_text(
        &self,
        session: &dyn BrowserSession,
        reference: &LocatorRef,
    ) -> SceneResult<Option<String>> {
        let Some(selector) = self.find(session, reference).await? else {
            return Ok(None);
        };
        Ok(session
            .query_all(&selector)
            .await?
            .into_iter()
            .next()
            .map(|e| e.text))
    }

    /// Evaluate one expectation
    ///
    /// A missing target element is a failed expectation, not an error. Errors
    /// are reserved for driver failures and page-qualified names with no table
    /// entry.
    pub async fn evaluate(
        &self,
        session: &dyn BrowserSession,
        expectation: &Expectation,
    ) -> SceneResult<AssertionOutcome> {
        let outcome = match expectation {
            Expectation::TextEquals {
                locator,
                expected,
                ignore_case,
            }
            | Expectation::TextContains {
                locator,
                expected,
                ignore_case,
            } => {
                let contains = matches!(expectation, Expectation::TextContains { .. });
                match self.first_text(session, locator).await? {
                    None => AssertionOutcome::not_found(expected.clone()),
                    Some(text) => AssertionOutcome::check(
                        text_matches(&text, expected, *ignore_case, contains),
                        expected.clone(),
                        text.trim(),
                    ),
                }
            }
            Expectation::UrlEquals { expected } => {
                let url = session.current_url().await?;
                AssertionOutcome::check(url == *expected, expected.clone(), url)
            }
            Expectation::UrlContains { expected } => {
                let url = session.current_url().await?;
                AssertionOutcome::check(url.contains(expected.as_str()), expected.clone(), url)
            }
            Expectation::UrlMatches { pattern } => {
                let re = Regex::new(pattern)
                    .map_err(|e| SceneError::config(format!("invalid url pattern: {e}")))?;
                let url = session.current_url().await?;
                AssertionOutcome::check(re.is_match(&url), format!("/{pattern}/"), url)
            }
            Expectation::TitleEquals {
                expected,
                ignore_case,
            } => {
                let title = session.title().await?;
                AssertionOutcome::check(
                    text_matches(&title, expected, *ignore_case, false),
                    expected.clone(),
                    title.trim(),
                )
            }
            Expectation::ElementVisible { locator } => match self.find(session, locator).await? {
                None => AssertionOutcome::not_found("visible"),
                Some(selector) => {
                    let visible = session.query_all(&selector).await?.iter().any(|e| e.visible);
                    AssertionOutcome::check(visible, "visible", "hidden")
                }
            },
            Expectation::ElementHidden { locator } => match self.find(session, locator).await? {
                None => AssertionOutcome::Passed,
                Some(selector) => {
                    let visible = session.query_all(&selector).await?.iter().any(|e| e.visible);
                    AssertionOutcome::check(!visible, "hidden", "visible")
                }
            },
            Expectation::CountEquals { locator, count } => {
                let actual = match self.find(session, locator).await? {
                    None => 0,
                    Some(selector) => session.query_all(&selector).await?.len(),
                };
                AssertionOutcome::check(actual == *count, count.to_string(), actual.to_string())
            }
            Expectation::AttributeEquals {
                locator,
                attribute,
                expected,
            } => match self.find(session, locator).await? {
                None => AssertionOutcome::not_found(expected.clone()),
                Some(selector) => match session.attribute(&selector, attribute).await? {
                    Some(value) => {
                        AssertionOutcome::check(value == *expected, expected.clone(), value)
                    }
                    None => AssertionOutcome::Failed {
                        expected: expected.clone(),
                        actual: "<absent>".to_string(),
                        detail: Some(format!("attribute '{attribute}' not set")),
                    },
                },
            },
            Expectation::ValueEquals { locator, expected } => {
                match self.find(session, locator).await? {
                    None => AssertionOutcome::not_found(expected.clone()),
                    Some(selector) => {
                        let value = session.input_value(&selector).await?.unwrap_or_default();
                        AssertionOutcome::check(value == *expected, expected.clone(), value)
                    }
                }
            }
        };
        Ok(outcome)
    }
}
