//! In-memory site and driver for unit testing.
//!
//! A [`MockSite`] is a template: every session opened by [`MockDriver`] gets its
//! own copy of the pages, so mutations made by one scenario are invisible to
//! every other scenario.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{BrowserDriver, BrowserSession, ElementState, NavigationResponse};
use crate::result::{SceneError, SceneResult};

const BLANK: &str = "about:blank";

/// Page mutation triggered by an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Load another page
    Navigate(String),
    /// Replace the text of matching elements
    SetText {
        /// Target selector
        selector: String,
        /// New text
        text: String,
    },
    /// Treat the text of matching elements as a counter and add one
    IncrementText(String),
    /// Make matching elements visible
    Show(String),
    /// Make matching elements invisible
    Hide(String),
    /// Remove matching elements
    Remove(String),
    /// Apply `then` if every `(selector, value)` input matches, else `otherwise`
    When {
        /// Required input values
        inputs: Vec<(String, String)>,
        /// Effects when all inputs match
        then: Vec<MockEffect>,
        /// Effects otherwise
        otherwise: Vec<MockEffect>,
    },
    /// Simulate a driver bug by panicking
    Crash(String),
}

/// Element on a mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Selector this element answers to (exact match)
    pub selector: String,
    /// Text content
    pub text: String,
    /// Input value
    pub value: String,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Visible
    pub visible: bool,
    /// Enabled
    pub enabled: bool,
    /// Permanently covered by another element
    pub covered: bool,
    /// Number of clicks refused as not interactable before one succeeds
    pub layout_shifts: u32,
    /// Number of queries before the element is attached
    pub reveal_after: u32,
    /// Allowed option values for a select (empty = anything)
    pub options: Vec<String>,
    /// Effects of a click
    pub on_click: Vec<MockEffect>,
    /// Effects of a select
    pub on_change: Vec<MockEffect>,
    /// Effects of a hover
    pub on_hover: Vec<MockEffect>,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            value: String::new(),
            attributes: BTreeMap::new(),
            visible: true,
            enabled: true,
            covered: false,
            layout_shifts: 0,
            reveal_after: 0,
            options: Vec::new(),
            on_click: Vec::new(),
            on_change: Vec::new(),
            on_hover: Vec::new(),
        }
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Keep covered by an overlay
    #[must_use]
    pub fn covered(mut self) -> Self {
        self.covered = true;
        self
    }

    /// Refuse the first `count` clicks as if the layout shifted
    #[must_use]
    pub fn layout_shifts(mut self, count: u32) -> Self {
        self.layout_shifts = count;
        self
    }

    /// Attach only after `queries` lookups
    #[must_use]
    pub fn reveal_after(mut self, queries: u32) -> Self {
        self.reveal_after = queries;
        self
    }

    /// Set the input value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Restrict select options
    #[must_use]
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| (*o).to_string()).collect();
        self
    }

    /// Add a click effect
    #[must_use]
    pub fn on_click(mut self, effect: MockEffect) -> Self {
        self.on_click.push(effect);
        self
    }

    /// Add a change effect
    #[must_use]
    pub fn on_change(mut self, effect: MockEffect) -> Self {
        self.on_change.push(effect);
        self
    }

    /// Add a hover effect
    #[must_use]
    pub fn on_hover(mut self, effect: MockEffect) -> Self {
        self.on_hover.push(effect);
        self
    }

    fn state(&self) -> ElementState {
        ElementState {
            text: self.text.clone(),
            visible: self.visible,
            enabled: self.enabled,
            obscured: self.covered,
        }
    }
}

/// One page of a mock site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPage {
    /// Document title
    pub title: String,
    /// HTTP status served for the page
    pub status: u16,
    /// Elements in document order
    pub elements: Vec<MockElement>,
}

impl MockPage {
    /// Create an empty page served with status 200
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: 200,
            elements: Vec::new(),
        }
    }

    /// Set the HTTP status
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add an element
    #[must_use]
    pub fn element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }
}

/// Template of pages keyed by URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockSite {
    pages: BTreeMap<String, MockPage>,
}

impl MockSite {
    /// Create an empty site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page
    #[must_use]
    pub fn page(mut self, url: impl Into<String>, page: MockPage) -> Self {
        let _ = self.pages.insert(url.into(), page);
        self
    }
}

/// Session bookkeeping shared between a driver and its sessions
#[derive(Debug, Default)]
pub struct SessionCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    close_calls: AtomicUsize,
}

impl SessionCounters {
    /// Sessions opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Calls to `close`, including rejected repeats
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Sessions opened but not closed
    #[must_use]
    pub fn leaked(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

/// Driver handing out sessions over a [`MockSite`]
#[derive(Debug, Clone)]
pub struct MockDriver {
    site: Arc<MockSite>,
    counters: Arc<SessionCounters>,
    fail_open: bool,
}

impl MockDriver {
    /// Create a driver over a site template
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site: Arc::new(site),
            counters: Arc::new(SessionCounters::default()),
            fail_open: false,
        }
    }

    /// Make every `open_session` call fail
    #[must_use]
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Shared session counters
    #[must_use]
    pub fn counters(&self) -> Arc<SessionCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_session(&self) -> SceneResult<Box<dyn BrowserSession>> {
        if self.fail_open {
            return Err(SceneError::driver("mock browser refused to open a session"));
        }
        let _ = self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            state: Mutex::new(MockState {
                pages: self.site.pages.clone(),
                current_url: BLANK.to_string(),
                history: Vec::new(),
                closed: false,
            }),
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[derive(Debug)]
struct MockState {
    pages: BTreeMap<String, MockPage>,
    current_url: String,
    history: Vec<String>,
    closed: bool,
}

impl MockState {
    fn elements_mut(&mut self) -> Option<&mut Vec<MockElement>> {
        self.pages
            .get_mut(&self.current_url)
            .map(|page| &mut page.elements)
    }

    fn load(&mut self, url: &str) -> Option<u16> {
        if self.current_url != BLANK {
            self.history.push(self.current_url.clone());
        }
        self.current_url = url.to_string();
        self.pages.get(url).map(|page| page.status)
    }

    fn input_value(&self, selector: &str) -> Option<String> {
        self.pages
            .get(&self.current_url)?
            .elements
            .iter()
            .find(|e| e.selector == selector && e.reveal_after == 0)
            .map(|e| e.value.clone())
    }

    fn for_each(&mut self, selector: &str, mut f: impl FnMut(&mut MockElement)) {
        if let Some(elements) = self.elements_mut() {
            elements
                .iter_mut()
                .filter(|e| e.selector == selector)
                .for_each(&mut f);
        }
    }

    /// Apply effects in order; returns a crash message if one was requested
    fn apply(&mut self, effects: &[MockEffect]) -> Option<String> {
        for effect in effects {
            match effect {
                MockEffect::Navigate(url) => {
                    let _ = self.load(url);
                }
                MockEffect::SetText { selector, text } => {
                    self.for_each(selector, |e| e.text.clone_from(text));
                }
                MockEffect::IncrementText(selector) => self.for_each(selector, |e| {
                    let n = e.text.trim().parse::<u64>().unwrap_or(0);
                    e.text = (n + 1).to_string();
                    e.visible = true;
                }),
                MockEffect::Show(selector) => self.for_each(selector, |e| e.visible = true),
                MockEffect::Hide(selector) => self.for_each(selector, |e| e.visible = false),
                MockEffect::Remove(selector) => {
                    if let Some(elements) = self.elements_mut() {
                        elements.retain(|e| &e.selector != selector);
                    }
                }
                MockEffect::When {
                    inputs,
                    then,
                    otherwise,
                } => {
                    let matched = inputs
                        .iter()
                        .all(|(sel, want)| self.input_value(sel).as_deref() == Some(want));
                    let branch = if matched { then } else { otherwise };
                    if let Some(crash) = self.apply(branch) {
                        return Some(crash);
                    }
                }
                MockEffect::Crash(message) => return Some(message.clone()),
            }
        }
        None
    }
}

#[derive(Debug)]
struct MockSession {
    state: Mutex<MockState>,
    counters: Arc<SessionCounters>,
}

impl MockSession {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_state(&self) -> SceneResult<MutexGuard<'_, MockState>> {
        let state = self.state();
        if state.closed {
            return Err(SceneError::driver("session is closed"));
        }
        Ok(state)
    }

    /// Run `check` on the first attached match, then apply the effects it returns
    #[allow(clippy::panic)]
    fn interact(
        &self,
        selector: &str,
        check: impl FnOnce(&mut MockElement) -> SceneResult<Vec<MockEffect>>,
    ) -> SceneResult<()> {
        let crash = {
            let mut state = self.open_state()?;
            let effects = {
                let element = state
                    .elements_mut()
                    .and_then(|els| {
                        els.iter_mut()
                            .find(|e| e.selector == selector && e.reveal_after == 0)
                    })
                    .ok_or_else(|| SceneError::driver(format!("no element matches {selector}")))?;
                if !element.visible {
                    return Err(SceneError::not_interactable(selector, "element is hidden"));
                }
                check(element)?
            };
            state.apply(&effects)
        };
        if let Some(message) = crash {
            panic!("mock driver crash: {message}");
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&mut self, url: &str) -> SceneResult<NavigationResponse> {
        let mut state = self.open_state()?;
        let status = state.load(url).unwrap_or(404);
        Ok(NavigationResponse {
            url: url.to_string(),
            status: Some(status),
        })
    }

    async fn current_url(&self) -> SceneResult<String> {
        Ok(self.open_state()?.current_url.clone())
    }

    async fn title(&self) -> SceneResult<String> {
        let state = self.open_state()?;
        Ok(state
            .pages
            .get(&state.current_url)
            .map(|p| p.title.clone())
            .unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> SceneResult<Vec<ElementState>> {
        let mut state = self.open_state()?;
        let Some(elements) = state.elements_mut() else {
            return Ok(Vec::new());
        };
        let mut found = Vec::new();
        for element in elements.iter_mut().filter(|e| e.selector == selector) {
            if element.reveal_after > 0 {
                element.reveal_after -= 1;
            } else {
                found.push(element.state());
            }
        }
        Ok(found)
    }

    async fn attribute(&self, selector: &str, name: &str) -> SceneResult<Option<String>> {
        let state = self.open_state()?;
        Ok(state.pages.get(&state.current_url).and_then(|page| {
            page.elements
                .iter()
                .find(|e| e.selector == selector && e.reveal_after == 0)
                .and_then(|e| e.attributes.get(name).cloned())
        }))
    }

    async fn input_value(&self, selector: &str) -> SceneResult<Option<String>> {
        Ok(self.open_state()?.input_value(selector))
    }

    async fn click(&mut self, selector: &str) -> SceneResult<()> {
        self.interact(selector, |element| {
            if !element.enabled {
                return Err(SceneError::not_interactable(&element.selector, "element is disabled"));
            }
            if element.covered {
                return Err(SceneError::not_interactable(
                    &element.selector,
                    "element is covered by another element",
                ));
            }
            if element.layout_shifts > 0 {
                element.layout_shifts -= 1;
                return Err(SceneError::not_interactable(
                    &element.selector,
                    "element moved during click",
                ));
            }
            Ok(element.on_click.clone())
        })
    }

    async fn fill(&mut self, selector: &str, value: &str) -> SceneResult<()> {
        self.interact(selector, |element| {
            if !element.enabled {
                return Err(SceneError::not_interactable(&element.selector, "element is disabled"));
            }
            element.value = value.to_string();
            Ok(Vec::new())
        })
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> SceneResult<()> {
        self.interact(selector, |element| {
            if !element.options.is_empty() && !element.options.iter().any(|o| o == value) {
                return Err(SceneError::driver(format!(
                    "option '{value}' not available in {}",
                    element.selector
                )));
            }
            element.value = value.to_string();
            Ok(element.on_change.clone())
        })
    }

    async fn hover(&mut self, selector: &str) -> SceneResult<()> {
        self.interact(selector, |element| Ok(element.on_hover.clone()))
    }

    async fn go_back(&mut self) -> SceneResult<()> {
        let mut state = self.open_state()?;
        let previous = state
            .history
            .pop()
            .ok_or_else(|| SceneError::driver("no history entry to go back to"))?;
        state.current_url = previous;
        Ok(())
    }

    async fn screenshot(&self) -> SceneResult<Vec<u8>> {
        let state = self.open_state()?;
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(state.current_url.as_bytes());
        Ok(png)
    }

    async fn close(&mut self) -> SceneResult<()> {
        let _ = self.counters.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if state.closed {
            return Err(SceneError::driver("session closed twice"));
        }
        state.closed = true;
        let _ = self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn site() -> MockSite {
        MockSite::new()
            .page(
                "https://shop.test/",
                MockPage::new("Shop")
                    .element(MockElement::new("#user", ""))
                    .element(MockElement::new("#error", "Bad login").hidden())
                    .element(MockElement::new("#go", "Login").on_click(MockEffect::When {
                        inputs: vec![("#user".to_string(), "alice".to_string())],
                        then: vec![MockEffect::Navigate("https://shop.test/home".to_string())],
                        otherwise: vec![MockEffect::Show("#error".to_string())],
                    })),
            )
            .page(
                "https://shop.test/home",
                MockPage::new("Home").element(MockElement::new("#badge", "")),
            )
    }

    #[tokio::test]
    async fn test_conditional_click_navigates() {
        let driver = MockDriver::new(site());
        let mut session = driver.open_session().await.unwrap();
        let resp = session.navigate("https://shop.test/").await.unwrap();
        assert_eq!(resp.status, Some(200));
        session.fill("#user", "alice").await.unwrap();
        session.click("#go").await.unwrap();
        assert_eq!(session.current_url().await.unwrap(), "https://shop.test/home");
        assert_eq!(session.title().await.unwrap(), "Home");
        session.go_back().await.unwrap();
        assert_eq!(session.current_url().await.unwrap(), "https://shop.test/");
    }

    #[tokio::test]
    async fn test_conditional_click_otherwise_branch() {
        let driver = MockDriver::new(site());
        let mut session = driver.open_session().await.unwrap();
        let _ = session.navigate("https://shop.test/").await.unwrap();
        session.click("#go").await.unwrap();
        let error = session.query_all("#error").await.unwrap();
        assert!(error[0].visible);
    }

    #[tokio::test]
    async fn test_unknown_url_is_404() {
        let driver = MockDriver::new(site());
        let mut session = driver.open_session().await.unwrap();
        let resp = session.navigate("https://shop.test/missing").await.unwrap();
        assert_eq!(resp.status, Some(404));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let driver = MockDriver::new(site());
        let mut first = driver.open_session().await.unwrap();
        let mut second = driver.open_session().await.unwrap();
        let _ = first.navigate("https://shop.test/").await.unwrap();
        let _ = second.navigate("https://shop.test/").await.unwrap();
        first.fill("#user", "alice").await.unwrap();
        assert_eq!(second.input_value("#user").await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_layout_shift_then_success() {
        let site = MockSite::new().page(
            "https://shop.test/",
            MockPage::new("Shop").element(MockElement::new("#buy", "Buy").layout_shifts(1)),
        );
        let driver = MockDriver::new(site);
        let mut session = driver.open_session().await.unwrap();
        let _ = session.navigate("https://shop.test/").await.unwrap();
        assert!(matches!(
            session.click("#buy").await,
            Err(SceneError::ElementNotInteractable { .. })
        ));
        assert!(session.click("#buy").await.is_ok());
    }

    #[tokio::test]
    async fn test_reveal_after_queries() {
        let site = MockSite::new().page(
            "https://shop.test/",
            MockPage::new("Shop").element(MockElement::new("#late", "Hi").reveal_after(2)),
        );
        let driver = MockDriver::new(site);
        let mut session = driver.open_session().await.unwrap();
        let _ = session.navigate("https://shop.test/").await.unwrap();
        assert!(session.query_all("#late").await.unwrap().is_empty());
        assert!(session.query_all("#late").await.unwrap().is_empty());
        assert_eq!(session.query_all("#late").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_close_counts_and_rejects_repeat() {
        let driver = MockDriver::new(site());
        let counters = driver.counters();
        let mut session = driver.open_session().await.unwrap();
        assert_eq!(counters.leaked(), 1);
        session.close().await.unwrap();
        assert!(session.close().await.is_err());
        assert_eq!(counters.closed(), 1);
        assert_eq!(counters.close_calls(), 2);
        assert_eq!(counters.leaked(), 0);
    }

    #[tokio::test]
    async fn test_failing_open() {
        let driver = MockDriver::new(site()).failing_open();
        assert!(driver.open_session().await.is_err());
        assert_eq!(driver.counters().opened(), 0);
    }
}
