//! Browser driving surface.
//!
//! The runner only ever talks to these two traits, so the core never depends on a
//! particular automation library.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BrowserDriver::open_session()  ──►  Box<dyn BrowserSession>      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐          ┌────────────────────────────┐  │
//! │  │  MockDriver        │          │  CdpDriver (`browser`)     │  │
//! │  │  in-memory site    │          │  chromiumoxide, one        │  │
//! │  │  for unit tests    │          │  browser context / session │  │
//! │  └────────────────────┘          └────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#[cfg(feature = "browser")]
mod cdp;
mod mock;

#[cfg(feature = "browser")]
pub use cdp::CdpDriver;
pub use mock::{MockDriver, MockEffect, MockElement, MockPage, MockSite, SessionCounters};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::result::SceneResult;

/// Snapshot of one element matched by a selector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Text content
    pub text: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Covered by another element at its center point
    pub obscured: bool,
}

impl ElementState {
    /// Create a visible, enabled element with text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visible: true,
            enabled: true,
            obscured: false,
        }
    }

    /// Check if the element can receive input
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.visible && self.enabled && !self.obscured
    }
}

/// Outcome of a navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// URL after redirects
    pub url: String,
    /// HTTP status of the main document, when known
    pub status: Option<u16>,
}

impl NavigationResponse {
    /// 2xx and 3xx count as success; an unknown status is trusted
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.map_or(true, |s| (200..400).contains(&s))
    }
}

/// Browser configuration for drivers
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub executable_path: Option<String>,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            executable_path: None,
            navigation_timeout: Duration::from_secs(30),
            sandbox: true,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Factory for isolated browser sessions
///
/// Implementations must hand out sessions that share no cookies, storage or page
/// state with each other.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Driver name for logs
    fn name(&self) -> &str;

    /// Open a fresh isolated session
    async fn open_session(&self) -> SceneResult<Box<dyn BrowserSession>>;
}

/// One isolated browser context plus page
///
/// Reads take `&self`; anything that can change page state takes `&mut self`.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to URL
    async fn navigate(&mut self, url: &str) -> SceneResult<NavigationResponse>;

    /// Get current URL
    async fn current_url(&self) -> SceneResult<String>;

    /// Get document title
    async fn title(&self) -> SceneResult<String>;

    /// Query all elements matching a selector, in document order
    async fn query_all(&self, selector: &str) -> SceneResult<Vec<ElementState>>;

    /// Attribute of the first matching element
    async fn attribute(&self, selector: &str, name: &str) -> SceneResult<Option<String>>;

    /// Input value of the first matching element
    async fn input_value(&self, selector: &str) -> SceneResult<Option<String>>;

    /// Click the first matching element
    async fn click(&mut self, selector: &str) -> SceneResult<()>;

    /// Replace the value of the first matching input
    async fn fill(&mut self, selector: &str, value: &str) -> SceneResult<()>;

    /// Select an option by value
    async fn select_option(&mut self, selector: &str, value: &str) -> SceneResult<()>;

    /// Hover the first matching element
    async fn hover(&mut self, selector: &str) -> SceneResult<()>;

    /// Go back in history
    async fn go_back(&mut self) -> SceneResult<()>;

    /// Take a PNG screenshot
    async fn screenshot(&self) -> SceneResult<Vec<u8>>;

    /// Close the session and release its browser context
    async fn close(&mut self) -> SceneResult<()>;
}
