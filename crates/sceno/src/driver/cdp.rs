//! Chrome DevTools Protocol driver backed by chromiumoxide.
//!
//! One browser process is shared by all workers; every session gets its own
//! browser context (separate cookies and storage) and a single page in it.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{BrowserDriver, BrowserSession, DriverConfig, ElementState, NavigationResponse};
use crate::result::{SceneError, SceneResult};

fn cdp_error(e: impl Display) -> SceneError {
    SceneError::driver(e.to_string())
}

/// Quote a string as a JavaScript literal
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

const QUERY_ALL_JS: &str = r"(sel) => Array.from(document.querySelectorAll(sel)).map(el => {
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const visible = style.visibility !== 'hidden' && style.display !== 'none'
        && rect.width > 0 && rect.height > 0;
    let obscured = false;
    if (visible) {
        const top = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
        obscured = top !== null && top !== el && !el.contains(top);
    }
    return { text: el.textContent || '', visible, enabled: !el.disabled, obscured };
})";

// React-controlled inputs ignore plain `el.value = ...`; use the native setter.
const SET_VALUE_JS: &str = r"(sel, value) => {
    const el = document.querySelector(sel);
    if (!el) { return false; }
    el.focus();
    const setter = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value').set;
    setter.call(el, value);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
}";

// Setting `value` to an unknown option only clears the selection, so check first.
const SELECT_OPTION_JS: &str = r"(sel, value) => {
    const el = document.querySelector(sel);
    if (!el) { return 'missing'; }
    if (el.tagName === 'SELECT' && !Array.from(el.options).some(o => o.value === value)) {
        return 'no-option';
    }
    el.focus();
    const setter = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value').set;
    setter.call(el, value);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return 'ok';
}";

/// Map the result of [`SELECT_OPTION_JS`] onto the driver contract
fn select_outcome(status: &str, selector: &str, value: &str) -> SceneResult<()> {
    match status {
        "ok" => Ok(()),
        "no-option" => Err(SceneError::driver(format!(
            "option '{value}' not available in {selector}"
        ))),
        _ => Err(SceneError::driver(format!("no element matches {selector}"))),
    }
}

const NAV_STATUS_JS: &str = r"(() => {
    const entry = performance.getEntriesByType('navigation')[0];
    return entry && entry.responseStatus ? entry.responseStatus : null;
})()";

/// Driver launching one chromium instance
pub struct CdpDriver {
    config: DriverConfig,
    browser: Arc<Mutex<CdpBrowser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for CdpDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CdpDriver {
    /// Launch chromium
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched
    pub async fn launch(config: DriverConfig) -> SceneResult<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(config.navigation_timeout);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(cdp_error)?;
        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(cdp_error)?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Get the driver configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Close the browser process
    pub async fn shutdown(self) -> SceneResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(cdp_error)?;
        let _ = browser.wait().await;
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn open_session(&self) -> SceneResult<Box<dyn BrowserSession>> {
        let mut browser = self.browser.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(cdp_error)?;
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(SceneError::driver)?;
        let page = browser.new_page(params).await.map_err(cdp_error)?;
        debug!(context = ?context, "opened browser context");

        Ok(Box::new(CdpSession {
            browser: Arc::clone(&self.browser),
            page: Some(page),
            context: Some(context),
        }))
    }
}

struct CdpSession {
    browser: Arc<Mutex<CdpBrowser>>,
    page: Option<CdpPage>,
    context: Option<BrowserContextId>,
}

impl CdpSession {
    fn page(&self) -> SceneResult<&CdpPage> {
        self.page
            .as_ref()
            .ok_or_else(|| SceneError::driver("session is closed"))
    }

    async fn eval<T: DeserializeOwned>(&self, expr: String) -> SceneResult<T> {
        self.page()?
            .evaluate(expr)
            .await
            .map_err(cdp_error)?
            .into_value()
            .map_err(cdp_error)
    }

    async fn set_value(&self, selector: &str, value: &str) -> SceneResult<()> {
        let found: bool = self
            .eval(format!(
                "({SET_VALUE_JS})({}, {})",
                js_string(selector),
                js_string(value)
            ))
            .await?;
        if found {
            Ok(())
        } else {
            Err(SceneError::driver(format!("no element matches {selector}")))
        }
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn navigate(&mut self, url: &str) -> SceneResult<NavigationResponse> {
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| SceneError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status: Option<u16> = self.eval(NAV_STATUS_JS.to_string()).await?;
        let final_url = self.current_url().await?;
        Ok(NavigationResponse {
            url: final_url,
            status,
        })
    }

    async fn current_url(&self) -> SceneResult<String> {
        Ok(self
            .page()?
            .url()
            .await
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    async fn title(&self) -> SceneResult<String> {
        Ok(self
            .page()?
            .get_title()
            .await
            .map_err(cdp_error)?
            .unwrap_or_default())
    }

    async fn query_all(&self, selector: &str) -> SceneResult<Vec<ElementState>> {
        self.eval(format!("({QUERY_ALL_JS})({})", js_string(selector)))
            .await
    }

    async fn attribute(&self, selector: &str, name: &str) -> SceneResult<Option<String>> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
            js_string(selector),
            js_string(name)
        ))
        .await
    }

    async fn input_value(&self, selector: &str) -> SceneResult<Option<String>> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); return el && el.value !== undefined ? String(el.value) : null; }})()",
            js_string(selector)
        ))
        .await
    }

    async fn click(&mut self, selector: &str) -> SceneResult<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(cdp_error)?;
        element
            .click()
            .await
            .map_err(|e| SceneError::not_interactable(selector, e.to_string()))?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> SceneResult<()> {
        self.set_value(selector, value).await
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> SceneResult<()> {
        let status: String = self
            .eval(format!(
                "({SELECT_OPTION_JS})({}, {})",
                js_string(selector),
                js_string(value)
            ))
            .await?;
        select_outcome(&status, selector, value)
    }

    async fn hover(&mut self, selector: &str) -> SceneResult<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(cdp_error)?;
        element
            .hover()
            .await
            .map_err(|e| SceneError::not_interactable(selector, e.to_string()))?;
        Ok(())
    }

    async fn go_back(&mut self) -> SceneResult<()> {
        let page = self.page()?;
        page.evaluate("history.back()").await.map_err(cdp_error)?;
        page.wait_for_navigation().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn screenshot(&self) -> SceneResult<Vec<u8>> {
        self.page()?
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(cdp_error)
    }

    async fn close(&mut self) -> SceneResult<()> {
        let page = self
            .page
            .take()
            .ok_or_else(|| SceneError::driver("session closed twice"))?;
        let page_result = page.close().await.map_err(cdp_error);
        if let Some(context) = self.context.take() {
            let browser = self.browser.lock().await;
            if let Err(e) = browser.dispose_browser_context(context).await {
                warn!(error = %e, "failed to dispose browser context");
            }
        }
        page_result
    }
}
