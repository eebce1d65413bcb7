//! Scenario, step and expectation types.
//!
//! These are plain data: a scenario is built once (from a suite file or the
//! builder methods below) and never mutated while it runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::locator::LocatorRef;

/// One independently runnable end-to-end test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Identifier, unique within a suite
    pub id: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an assertion step
    #[must_use]
    pub fn expect(self, expectation: Expectation) -> Self {
        self.step(Step::Assert {
            expect: expectation,
        })
    }
}

/// Condition awaited by a `wait_for` step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// At least one matching element is visible
    #[default]
    Visible,
    /// No matching element is visible
    Hidden,
    /// At least one matching element exists
    Attached,
    /// No matching element exists
    Detached,
    /// A matching element is visible and enabled
    Enabled,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Enabled => "enabled",
        };
        f.write_str(name)
    }
}

/// One UI action or assertion within a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL (absolute, or a path joined onto the suite base URL)
    Navigate {
        /// Target URL
        url: String,
        /// Wait budget override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Replace the value of an input
    Fill {
        /// Target element
        locator: LocatorRef,
        /// Value to enter
        value: String,
        /// Wait budget override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Click an element
    Click {
        /// Target element
        locator: LocatorRef,
        /// Wait budget override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Choose an option of a `<select>`
    Select {
        /// Target element
        locator: LocatorRef,
        /// Option value
        value: String,
        /// Wait budget override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Move the pointer over an element
    Hover {
        /// Target element
        locator: LocatorRef,
        /// Wait budget override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Wait until an element reaches a condition
    WaitFor {
        /// Target element
        locator: LocatorRef,
        /// Condition to reach
        #[serde(default)]
        condition: WaitCondition,
        /// Wait budget override
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Go back one entry in session history
    GoBack,
    /// Capture a PNG of the page into the artifacts directory
    Screenshot {
        /// Artifact file stem
        name: String,
    },
    /// Evaluate an expectation
    Assert {
        /// The expectation
        expect: Expectation,
    },
    /// Include the steps of a suite fixture (expanded at load time)
    Fixture {
        /// Fixture name
        name: String,
    },
}

impl Step {
    /// Navigate step
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate {
            url: url.into(),
            timeout_ms: None,
        }
    }

    /// Fill step
    #[must_use]
    pub fn fill(locator: &str, value: impl Into<String>) -> Self {
        Self::Fill {
            locator: LocatorRef::parse(locator),
            value: value.into(),
            timeout_ms: None,
        }
    }

    /// Click step
    #[must_use]
    pub fn click(locator: &str) -> Self {
        Self::Click {
            locator: LocatorRef::parse(locator),
            timeout_ms: None,
        }
    }

    /// Select step
    #[must_use]
    pub fn select(locator: &str, value: impl Into<String>) -> Self {
        Self::Select {
            locator: LocatorRef::parse(locator),
            value: value.into(),
            timeout_ms: None,
        }
    }

    /// Hover step
    #[must_use]
    pub fn hover(locator: &str) -> Self {
        Self::Hover {
            locator: LocatorRef::parse(locator),
            timeout_ms: None,
        }
    }

    /// Wait-for step
    #[must_use]
    pub fn wait_for(locator: &str, condition: WaitCondition) -> Self {
        Self::WaitFor {
            locator: LocatorRef::parse(locator),
            condition,
            timeout_ms: None,
        }
    }

    /// Fixture include
    #[must_use]
    pub fn fixture(name: impl Into<String>) -> Self {
        Self::Fixture { name: name.into() }
    }

    /// Override the wait budget of an action step; no effect on other steps
    #[must_use]
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        match &mut self {
            Self::Navigate { timeout_ms, .. }
            | Self::Fill { timeout_ms, .. }
            | Self::Click { timeout_ms, .. }
            | Self::Select { timeout_ms, .. }
            | Self::Hover { timeout_ms, .. }
            | Self::WaitFor { timeout_ms, .. } => *timeout_ms = Some(ms),
            Self::GoBack | Self::Screenshot { .. } | Self::Assert { .. } | Self::Fixture { .. } => {
            }
        }
        self
    }

    /// Per-step wait budget, if overridden
    #[must_use]
    pub const fn timeout_ms(&self) -> Option<u64> {
        match self {
            Self::Navigate { timeout_ms, .. }
            | Self::Fill { timeout_ms, .. }
            | Self::Click { timeout_ms, .. }
            | Self::Select { timeout_ms, .. }
            | Self::Hover { timeout_ms, .. }
            | Self::WaitFor { timeout_ms, .. } => *timeout_ms,
            Self::GoBack | Self::Screenshot { .. } | Self::Assert { .. } | Self::Fixture { .. } => {
                None
            }
        }
    }

    /// Element referenced by the step, if any
    #[must_use]
    pub fn locator(&self) -> Option<&LocatorRef> {
        match self {
            Self::Fill { locator, .. }
            | Self::Click { locator, .. }
            | Self::Select { locator, .. }
            | Self::Hover { locator, .. }
            | Self::WaitFor { locator, .. } => Some(locator),
            Self::Assert { expect } => expect.locator(),
            Self::Navigate { .. } | Self::GoBack | Self::Screenshot { .. } | Self::Fixture { .. } => {
                None
            }
        }
    }

    /// Whether this is an assertion step
    #[must_use]
    pub const fn is_assert(&self) -> bool {
        matches!(self, Self::Assert { .. })
    }

    /// Short human-readable description used in reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Navigate { url, .. } => format!("navigate {url}"),
            Self::Fill { locator, .. } => format!("fill {locator}"),
            Self::Click { locator, .. } => format!("click {locator}"),
            Self::Select { locator, value, .. } => format!("select {locator} = {value}"),
            Self::Hover { locator, .. } => format!("hover {locator}"),
            Self::WaitFor {
                locator, condition, ..
            } => format!("wait_for {locator} {condition}"),
            Self::GoBack => "go_back".to_string(),
            Self::Screenshot { name } => format!("screenshot {name}"),
            Self::Assert { expect } => format!("assert {}", expect.describe()),
            Self::Fixture { name } => format!("fixture {name}"),
        }
    }
}

/// A declarative check against current page state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Element text equals `expected`
    TextEquals {
        /// Target element
        locator: LocatorRef,
        /// Expected text
        expected: String,
        /// Compare ignoring case
        #[serde(default)]
        ignore_case: bool,
    },
    /// Element text contains `expected`
    TextContains {
        /// Target element
        locator: LocatorRef,
        /// Expected substring
        expected: String,
        /// Compare ignoring case
        #[serde(default)]
        ignore_case: bool,
    },
    /// Current URL equals `expected`
    UrlEquals {
        /// Expected URL
        expected: String,
    },
    /// Current URL contains `expected`
    UrlContains {
        /// Expected substring
        expected: String,
    },
    /// Current URL matches a regular expression
    UrlMatches {
        /// Regular expression
        pattern: String,
    },
    /// Document title equals `expected`
    TitleEquals {
        /// Expected title
        expected: String,
        /// Compare ignoring case
        #[serde(default)]
        ignore_case: bool,
    },
    /// At least one matching element is visible
    ElementVisible {
        /// Target element
        locator: LocatorRef,
    },
    /// No matching element is visible
    ElementHidden {
        /// Target element
        locator: LocatorRef,
    },
    /// Number of matching elements
    CountEquals {
        /// Target element
        locator: LocatorRef,
        /// Expected count
        count: usize,
    },
    /// Attribute of the element equals `expected`
    AttributeEquals {
        /// Target element
        locator: LocatorRef,
        /// Attribute name
        attribute: String,
        /// Expected attribute value
        expected: String,
    },
    /// Input value of the element equals `expected`
    ValueEquals {
        /// Target element
        locator: LocatorRef,
        /// Expected value
        expected: String,
    },
}

impl Expectation {
    /// Exact text expectation
    #[must_use]
    pub fn text_equals(locator: &str, expected: impl Into<String>) -> Self {
        Self::TextEquals {
            locator: LocatorRef::parse(locator),
            expected: expected.into(),
            ignore_case: false,
        }
    }

    /// Substring text expectation
    #[must_use]
    pub fn text_contains(locator: &str, expected: impl Into<String>) -> Self {
        Self::TextContains {
            locator: LocatorRef::parse(locator),
            expected: expected.into(),
            ignore_case: false,
        }
    }

    /// URL expectation
    #[must_use]
    pub fn url_equals(expected: impl Into<String>) -> Self {
        Self::UrlEquals {
            expected: expected.into(),
        }
    }

    /// Visibility expectation
    #[must_use]
    pub fn element_visible(locator: &str) -> Self {
        Self::ElementVisible {
            locator: LocatorRef::parse(locator),
        }
    }

    /// Count expectation
    #[must_use]
    pub fn count_equals(locator: &str, count: usize) -> Self {
        Self::CountEquals {
            locator: LocatorRef::parse(locator),
            count,
        }
    }

    /// Opt into case-insensitive comparison for text expectations
    #[must_use]
    pub fn ignoring_case(mut self) -> Self {
        match &mut self {
            Self::TextEquals { ignore_case, .. }
            | Self::TextContains { ignore_case, .. }
            | Self::TitleEquals { ignore_case, .. } => *ignore_case = true,
            _ => {}
        }
        self
    }

    /// Element referenced by the expectation, if any
    #[must_use]
    pub fn locator(&self) -> Option<&LocatorRef> {
        match self {
            Self::TextEquals { locator, .. }
            | Self::TextContains { locator, .. }
            | Self::ElementVisible { locator }
            | Self::ElementHidden { locator }
            | Self::CountEquals { locator, .. }
            | Self::AttributeEquals { locator, .. }
            | Self::ValueEquals { locator, .. } => Some(locator),
            Self::UrlEquals { .. }
            | Self::UrlContains { .. }
            | Self::UrlMatches { .. }
            | Self::TitleEquals { .. } => None,
        }
    }

    /// Short human-readable description used in reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::TextEquals { locator, .. } => format!("text_equals {locator}"),
            Self::TextContains { locator, .. } => format!("text_contains {locator}"),
            Self::UrlEquals { .. } => "url_equals".to_string(),
            Self::UrlContains { .. } => "url_contains".to_string(),
            Self::UrlMatches { pattern } => format!("url_matches /{pattern}/"),
            Self::TitleEquals { .. } => "title_equals".to_string(),
            Self::ElementVisible { locator } => format!("element_visible {locator}"),
            Self::ElementHidden { locator } => format!("element_hidden {locator}"),
            Self::CountEquals { locator, .. } => format!("count_equals {locator}"),
            Self::AttributeEquals {
                locator, attribute, ..
            } => format!("attribute_equals {locator}[{attribute}]"),
            Self::ValueEquals { locator, .. } => format!("value_equals {locator}"),
        }
    }
}
