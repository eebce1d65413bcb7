//! Locator tables and resolution of symbolic element names.
//!
//! Scenarios never name CSS selectors directly. They refer to elements by a
//! symbolic name (`login.username`, `cart_badge`) which is resolved against a
//! [`LocatorSet`]: one [`LocatorTable`] per logical page, each mapping names to an
//! ordered chain of candidate selectors.
//!
//! # Resolution
//!
//! - `page.name` resolves in the `page` table only.
//! - `name` resolves in the table whose `url_contains` matches the current URL,
//!   then in the [`COMMON_PAGE`] table.
//! - Live resolution walks the candidate chain in registration order and returns
//!   the first selector that matches at least one element.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::driver::BrowserSession;
use crate::result::{SceneError, SceneResult};

/// Name of the table consulted for unqualified names on every page
pub const COMMON_PAGE: &str = "common";

/// A symbolic reference to an element, optionally qualified by page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LocatorRef {
    page: Option<String>,
    name: String,
}

impl LocatorRef {
    /// Parse a reference of the form `page.name` or `name`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((page, name)) => Self {
                page: Some(page.trim().to_string()),
                name: name.trim().to_string(),
            },
            None => Self {
                page: None,
                name: raw.trim().to_string(),
            },
        }
    }

    /// Create an explicitly qualified reference
    #[must_use]
    pub fn qualified(page: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            page: Some(page.into()),
            name: name.into(),
        }
    }

    /// Page qualifier, if any
    #[must_use]
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    /// Symbolic name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<String> for LocatorRef {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for LocatorRef {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<LocatorRef> for String {
    fn from(reference: LocatorRef) -> Self {
        reference.to_string()
    }
}

impl fmt::Display for LocatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.page {
            Some(page) => write!(f, "{page}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Selectors for one logical page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorTable {
    /// Substring of the URL identifying this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<String>,
    /// Symbolic name to candidate selectors, in fallback order
    #[serde(default)]
    pub locators: BTreeMap<String, Vec<String>>,
}

impl LocatorTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URL pattern identifying the page
    #[must_use]
    pub fn with_url_contains(mut self, pattern: impl Into<String>) -> Self {
        self.url_contains = Some(pattern.into());
        self
    }

    /// Register a candidate selector; repeated calls extend the fallback chain
    #[must_use]
    pub fn with_locator(mut self, name: impl Into<String>, selector: impl Into<String>) -> Self {
        self.locators
            .entry(name.into())
            .or_default()
            .push(selector.into());
        self
    }
}

/// All locator tables of a suite; read-only once built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorSet {
    pages: BTreeMap<String, LocatorTable>,
}

impl LocatorSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a page table
    #[must_use]
    pub fn with_page(mut self, page: impl Into<String>, table: LocatorTable) -> Self {
        let _ = self.pages.insert(page.into(), table);
        self
    }

    /// Page tables by name
    #[must_use]
    pub fn pages(&self) -> &BTreeMap<String, LocatorTable> {
        &self.pages
    }

    /// Page whose `url_contains` matches `url`; the longest pattern wins
    #[must_use]
    pub fn context_for_url(&self, url: &str) -> Option<&str> {
        self.pages
            .iter()
            .filter_map(|(page, table)| {
                table
                    .url_contains
                    .as_deref()
                    .filter(|pattern| url.contains(pattern))
                    .map(|pattern| (page.as_str(), pattern.len()))
            })
            .fold(None, |best: Option<(&str, usize)>, (page, len)| match best {
                Some((_, best_len)) if best_len >= len => best,
                _ => Some((page, len)),
            })
            .map(|(page, _)| page)
    }

    /// Candidate selectors for `name` in `page`
    pub fn resolve(&self, page: &str, name: &str) -> SceneResult<&[String]> {
        self.pages
            .get(page)
            .and_then(|table| table.locators.get(name))
            .map(Vec::as_slice)
            .ok_or_else(|| SceneError::UnknownLocator {
                page: page.to_string(),
                name: name.to_string(),
            })
    }

    /// Candidate selectors for a reference, given the current page context
    pub fn resolve_ref(
        &self,
        context: Option<&str>,
        reference: &LocatorRef,
    ) -> SceneResult<&[String]> {
        if let Some(page) = reference.page() {
            return self.resolve(page, reference.name());
        }
        if let Some(found) = context.and_then(|page| self.resolve(page, reference.name()).ok()) {
            return Ok(found);
        }
        self.resolve(COMMON_PAGE, reference.name())
            .map_err(|_| SceneError::UnknownLocator {
                page: context.unwrap_or(COMMON_PAGE).to_string(),
                name: reference.name().to_string(),
            })
    }

    /// Static check that a reference can resolve on some page
    pub fn validate(&self, reference: &LocatorRef) -> SceneResult<()> {
        if reference.name().is_empty() || reference.page() == Some("") {
            return Err(SceneError::config(format!(
                "malformed locator reference '{reference}'"
            )));
        }
        let known = match reference.page() {
            Some(page) => self.resolve(page, reference.name()).is_ok(),
            None => self
                .pages
                .values()
                .any(|table| table.locators.contains_key(reference.name())),
        };
        if known {
            Ok(())
        } else {
            Err(SceneError::config(format!(
                "locator '{reference}' is not defined in any page table"
            )))
        }
    }

    /// Check every table entry has at least one non-empty candidate
    pub fn validate_tables(&self) -> SceneResult<()> {
        for (page, table) in &self.pages {
            for (name, candidates) in &table.locators {
                if candidates.is_empty() || candidates.iter().any(|c| c.trim().is_empty()) {
                    return Err(SceneError::config(format!(
                        "locator '{page}.{name}' has an empty selector"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Candidate selectors for a reference in the session's current page context
    pub async fn candidates_live(
        &self,
        session: &dyn BrowserSession,
        reference: &LocatorRef,
    ) -> SceneResult<&[String]> {
        let context = if reference.page().is_some() {
            None
        } else {
            let url = session.current_url().await?;
            self.context_for_url(&url).map(str::to_string)
        };
        self.resolve_ref(context.as_deref(), reference)
    }

    /// Resolve against live page state, walking the fallback chain
    pub async fn resolve_live(
        &self,
        session: &dyn BrowserSession,
        reference: &LocatorRef,
    ) -> SceneResult<String> {
        let candidates = self.candidates_live(session, reference).await?;
        for selector in candidates {
            if !session.query_all(selector).await?.is_empty() {
                return Ok(selector.clone());
            }
        }
        Err(SceneError::LocatorNotFound {
            name: reference.to_string(),
            candidates: candidates.to_vec(),
        })
    }
}
