//! Suite definition files.
//!
//! A suite bundles locator tables, reusable fixtures and scenarios. Loading
//! always expands fixtures and validates the result, so a [`Suite`] obtained
//! from [`Suite::from_path`], [`Suite::from_yaml_str`] or [`SuiteBuilder`] is
//! ready to run.
//!
//! ```yaml
//! version: "1.0"
//! name: shop
//! base_url: https://shop.test
//! pages:
//!   login:
//!     url_contains: "shop.test/"
//!     locators:
//!       username: ["#user-name", "[data-test=username]"]
//! fixtures:
//!   open_login:
//!     - { type: navigate, url: / }
//! scenarios:
//!   - id: login_page_loads
//!     steps:
//!       - { type: fixture, name: open_login }
//!       - type: assert
//!         expect: { kind: element_visible, locator: login.username }
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::executor::resolve_url;
use crate::locator::{LocatorSet, LocatorTable};
use crate::result::{SceneError, SceneResult};
use crate::runner::SuiteSettings;
use crate::scenario::{Expectation, Scenario, Step};

/// Suite file format version understood by this crate
pub const SUPPORTED_VERSION: &str = "1.0";

fn default_version() -> String {
    SUPPORTED_VERSION.to_string()
}

/// A named collection of scenarios with their locator tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Suite {
    /// File format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Suite name
    pub name: String,
    /// Base URL relative navigations are joined onto
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Run settings overriding the built-in defaults
    #[serde(default)]
    pub settings: SuiteSettings,
    /// Locator tables by page name
    #[serde(default)]
    pub pages: LocatorSet,
    /// Named step sequences included with `type: fixture`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixtures: BTreeMap<String, Vec<Step>>,
    /// Scenarios in submission order
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl Suite {
    /// Start building a suite in code
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SuiteBuilder {
        SuiteBuilder::new(name)
    }

    /// Parse, expand and validate a YAML suite
    pub fn from_yaml_str(yaml: &str) -> SceneResult<Self> {
        let suite: Self = serde_yaml_ng::from_str(yaml)?;
        suite.prepared()
    }

    /// Parse, expand and validate a JSON suite
    pub fn from_json_str(json: &str) -> SceneResult<Self> {
        let suite: Self = serde_json::from_str(json)
            .map_err(|e| SceneError::config(format!("invalid suite JSON: {e}")))?;
        suite.prepared()
    }

    /// Load a suite file; `.json` files are JSON, anything else YAML
    pub fn from_path(path: &Path) -> SceneResult<Self> {
        let body = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&body)
        } else {
            Self::from_yaml_str(&body)
        }
    }

    fn prepared(mut self) -> SceneResult<Self> {
        self.expand_fixtures()?;
        self.validate()?;
        Ok(self)
    }

    /// Scenario by id
    #[must_use]
    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// Replace every `fixture` step with the fixture's steps
    ///
    /// Fixtures may not include other fixtures.
    pub fn expand_fixtures(&mut self) -> SceneResult<()> {
        for (name, steps) in &self.fixtures {
            if steps.iter().any(|s| matches!(s, Step::Fixture { .. })) {
                return Err(SceneError::config(format!(
                    "fixture '{name}' includes another fixture"
                )));
            }
        }
        for scenario in &mut self.scenarios {
            let mut expanded = Vec::with_capacity(scenario.steps.len());
            for step in scenario.steps.drain(..) {
                match step {
                    Step::Fixture { name } => {
                        let body = self.fixtures.get(&name).ok_or_else(|| {
                            SceneError::config(format!(
                                "scenario '{}' uses unknown fixture '{name}'",
                                scenario.id
                            ))
                        })?;
                        expanded.extend(body.iter().cloned());
                    }
                    other => expanded.push(other),
                }
            }
            scenario.steps = expanded;
        }
        Ok(())
    }

    /// Static checks run before any session opens
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ConfigError`] describing the first problem found
    pub fn validate(&self) -> SceneResult<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(SceneError::config(format!(
                "unsupported suite version '{}' (expected {SUPPORTED_VERSION})",
                self.version
            )));
        }
        if self.settings.parallel == Some(0) {
            return Err(SceneError::config("settings.parallel must be at least 1"));
        }
        self.pages.validate_tables()?;

        let mut ids = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.id.trim().is_empty() {
                return Err(SceneError::config("scenario id must not be empty"));
            }
            if !ids.insert(scenario.id.as_str()) {
                return Err(SceneError::config(format!(
                    "duplicate scenario id '{}'",
                    scenario.id
                )));
            }
            self.validate_steps(&format!("scenario '{}'", scenario.id), &scenario.steps)?;
        }
        for (name, steps) in &self.fixtures {
            self.validate_steps(&format!("fixture '{name}'"), steps)?;
        }
        Ok(())
    }

    fn validate_steps(&self, owner: &str, steps: &[Step]) -> SceneResult<()> {
        for (index, step) in steps.iter().enumerate() {
            let at = |msg: String| {
                SceneError::config(format!("{owner} step {}: {msg}", index + 1))
            };
            if let Some(reference) = step.locator() {
                self.pages.validate(reference).map_err(|e| at(e.to_string()))?;
            }
            match step {
                Step::Navigate { url, .. } => {
                    let _ = resolve_url(self.base_url.as_deref(), url)
                        .map_err(|e| at(e.to_string()))?;
                }
                Step::Assert {
                    expect: Expectation::UrlMatches { pattern },
                } => {
                    let _ = Regex::new(pattern)
                        .map_err(|e| at(format!("invalid url pattern: {e}")))?;
                }
                Step::Fixture { name } => {
                    return Err(at(format!("fixture '{name}' was not expanded")));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Builder for suites defined in code
#[derive(Debug, Clone)]
pub struct SuiteBuilder {
    suite: Suite,
}

impl SuiteBuilder {
    /// Create a builder for an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            suite: Suite {
                version: default_version(),
                name: name.into(),
                base_url: None,
                settings: SuiteSettings::default(),
                pages: LocatorSet::new(),
                fixtures: BTreeMap::new(),
                scenarios: Vec::new(),
            },
        }
    }

    /// Set base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.suite.base_url = Some(url.into());
        self
    }

    /// Set run settings
    #[must_use]
    pub fn settings(mut self, settings: SuiteSettings) -> Self {
        self.suite.settings = settings;
        self
    }

    /// Replace all locator tables
    #[must_use]
    pub fn pages(mut self, pages: LocatorSet) -> Self {
        self.suite.pages = pages;
        self
    }

    /// Add or replace one locator table
    #[must_use]
    pub fn page(mut self, name: impl Into<String>, table: LocatorTable) -> Self {
        self.suite.pages = self.suite.pages.with_page(name, table);
        self
    }

    /// Add a fixture
    #[must_use]
    pub fn fixture(mut self, name: impl Into<String>, steps: Vec<Step>) -> Self {
        let _ = self.suite.fixtures.insert(name.into(), steps);
        self
    }

    /// Add a scenario
    #[must_use]
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.suite.scenarios.push(scenario);
        self
    }

    /// Expand fixtures and validate
    pub fn build(self) -> SceneResult<Suite> {
        self.suite.prepared()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::COMMON_PAGE;

    const SUITE: &str = r##"
version: "1.0"
name: shop
base_url: https://shop.test
settings:
  default_timeout_ms: 2000
  parallel: 2
pages:
  common:
    locators:
      cart_badge: [".shopping_cart_badge"]
  login:
    url_contains: "shop.test/"
    locators:
      username: ["#user-name", "[data-test=username]"]
      button: ["#login-button"]
fixtures:
  login_standard:
    - { type: navigate, url: / }
    - { type: fill, locator: login.username, value: standard_user }
    - { type: click, locator: login.button }
scenarios:
  - id: login_valid
    steps:
      - { type: fixture, name: login_standard }
      - type: assert
        expect: { kind: url_equals, expected: "https://shop.test/inventory.html" }
  - id: badge
    steps:
      - { type: fixture, name: login_standard }
      - type: assert
        expect: { kind: text_equals, locator: cart_badge, expected: "1" }
"##;

    mod load_tests {
        use super::*;

        #[test]
        fn test_load_expands_fixtures() {
            let suite = Suite::from_yaml_str(SUITE).unwrap();
            assert_eq!(suite.scenarios.len(), 2);
            let login = suite.scenario("login_valid").unwrap();
            assert_eq!(login.steps.len(), 4);
            assert_eq!(login.steps[0], Step::navigate("/"));
            assert!(login.steps[3].is_assert());
            assert_eq!(suite.settings.parallel, Some(2));
            assert_eq!(
                suite.pages.resolve("login", "username").unwrap(),
                ["#user-name", "[data-test=username]"]
            );
        }

        #[test]
        fn test_json_suite() {
            let yaml: serde_json::Value = serde_yaml_ng::from_str(SUITE).unwrap();
            let suite = Suite::from_json_str(&yaml.to_string()).unwrap();
            assert_eq!(suite.name, "shop");
        }

        #[test]
        fn test_from_path_by_extension() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("suite.yaml");
            std::fs::write(&path, SUITE).unwrap();
            assert_eq!(Suite::from_path(&path).unwrap().scenarios.len(), 2);
            let missing = Suite::from_path(&dir.path().join("nope.yaml")).unwrap_err();
            assert_eq!(missing.kind(), "DriverError");
        }

        #[test]
        fn test_malformed_yaml_is_config_error() {
            let err = Suite::from_yaml_str("name: [unterminated").unwrap_err();
            assert_eq!(err.kind(), "ConfigError");
        }
    }

    mod validate_tests {
        use super::*;

        fn expect_config_error(yaml: &str, needle: &str) {
            let err = Suite::from_yaml_str(yaml).unwrap_err();
            assert_eq!(err.kind(), "ConfigError", "{err}");
            assert!(err.to_string().contains(needle), "{err}");
        }

        #[test]
        fn test_wrong_version() {
            expect_config_error(&SUITE.replace("\"1.0\"", "\"2.0\""), "unsupported suite version");
        }

        #[test]
        fn test_duplicate_ids() {
            expect_config_error(&SUITE.replace("id: badge", "id: login_valid"), "duplicate");
        }

        #[test]
        fn test_unknown_fixture() {
            expect_config_error(
                &SUITE.replace("name: login_standard }\n      - type: assert\n        expect: { kind: text_equals", "name: nope }\n      - type: assert\n        expect: { kind: text_equals"),
                "unknown fixture 'nope'",
            );
        }

        #[test]
        fn test_unknown_locator() {
            expect_config_error(&SUITE.replace("locator: cart_badge", "locator: cart_total"), "cart_total");
        }

        #[test]
        fn test_empty_selector_chain() {
            expect_config_error(&SUITE.replace("[\"#login-button\"]", "[]"), "empty selector");
        }

        #[test]
        fn test_zero_parallel() {
            expect_config_error(&SUITE.replace("parallel: 2", "parallel: 0"), "parallel");
        }

        #[test]
        fn test_unknown_step_type() {
            let err = Suite::from_yaml_str(&SUITE.replace("type: click", "type: tap")).unwrap_err();
            assert_eq!(err.kind(), "ConfigError");
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_builder_rejects_recursive_fixture() {
            let err = Suite::builder("s")
                .fixture("a", vec![Step::fixture("b")])
                .fixture("b", vec![Step::navigate("https://x.test/")])
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("includes another fixture"));
        }

        #[test]
        fn test_builder_relative_url_needs_base() {
            let err = Suite::builder("s")
                .scenario(Scenario::new("a").step(Step::navigate("/")))
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("base_url"));
        }

        #[test]
        fn test_builder_invalid_url_pattern() {
            let err = Suite::builder("s")
                .scenario(Scenario::new("a").expect(Expectation::UrlMatches {
                    pattern: "([".to_string(),
                }))
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("invalid url pattern"));
        }

        #[test]
        fn test_builder_ok() {
            let suite = Suite::builder("s")
                .base_url("https://x.test")
                .page(COMMON_PAGE, LocatorTable::new().with_locator("badge", ".badge"))
                .fixture("home", vec![Step::navigate("/")])
                .scenario(
                    Scenario::new("a")
                        .step(Step::fixture("home"))
                        .expect(Expectation::element_visible("badge")),
                )
                .build()
                .unwrap();
            assert_eq!(suite.scenarios[0].steps.len(), 2);
        }
    }
}
