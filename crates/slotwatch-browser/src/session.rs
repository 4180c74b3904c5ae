//! One isolated browsing session (own browser context, one page).

use crate::actions::{extract_domain, BrowserActions};
use crate::error::{BrowserError, Result};
use crate::script;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use slotwatch_core::Locator;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum gap between consecutive interactions with the site.
#[derive(Debug)]
pub(crate) struct Pacer {
    last_action: Option<Instant>,
    min_gap: Duration,
}

impl Pacer {
    pub(crate) fn new(min_gap: Duration) -> Self {
        Self {
            last_action: None,
            min_gap,
        }
    }

    /// Sleep until the gap since the previous interaction has elapsed.
    pub(crate) async fn wait_turn(&mut self) {
        if let Some(last) = self.last_action {
            let elapsed = last.elapsed();
            if elapsed < self.min_gap {
                tokio::time::sleep(self.min_gap - elapsed).await;
            }
        }
        self.last_action = Some(Instant::now());
    }
}

/// A page inside its own browser context.
pub struct BrowserSession {
    page: Page,
    context_id: BrowserContextId,
    pacer: Mutex<Pacer>,
    action_timeout: Duration,
    mark_counter: AtomicU64,
}

impl BrowserSession {
    pub(crate) fn new(
        page: Page,
        context_id: BrowserContextId,
        min_action_gap: Duration,
        action_timeout: Duration,
    ) -> Self {
        Self {
            page,
            context_id,
            pacer: Mutex::new(Pacer::new(min_action_gap)),
            action_timeout,
            mark_counter: AtomicU64::new(0),
        }
    }

    pub(crate) fn into_parts(self) -> (Page, BrowserContextId) {
        (self.page, self.context_id)
    }

    async fn paced(&self) {
        self.pacer.lock().await.wait_turn().await;
    }

    async fn eval_json<T: DeserializeOwned>(&self, js: String) -> Result<T> {
        let raw: String = tokio::time::timeout(self.action_timeout, self.page.evaluate(js))
            .await
            .map_err(|_| BrowserError::Timeout("page script".to_string()))??
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| BrowserError::Script(e.to_string()))
    }

    /// Resolve the locator in the page and return it as a native element.
    async fn marked_element(&self, locator: &Locator, clear: bool) -> Result<Element> {
        let token = format!("m{}", self.mark_counter.fetch_add(1, Ordering::Relaxed));
        let found: bool = self.eval_json(script::mark(locator, &token, clear)).await?;
        if !found {
            return Err(BrowserError::SelectorNotFound(locator.to_string()));
        }
        Ok(self.page.find_element(script::marked_selector(&token)).await?)
    }
}

#[async_trait]
impl BrowserActions for BrowserSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let host = extract_domain(url)?;
        self.paced().await;
        debug!("Navigating to {} ({})", url, host);

        tokio::time::timeout(timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .map_err(|_| {
            BrowserError::Timeout(format!("navigation to {host} after {}ms", timeout.as_millis()))
        })?
        .map_err(|e| BrowserError::NavigationError(e.to_string()))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.eval_json(script::is_visible(locator)).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.paced().await;
        let element = self.marked_element(locator, false).await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        self.paced().await;
        let element = self.marked_element(locator, true).await?;
        element.click().await?;
        element.type_str(value).await?;
        Ok(())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.eval_json(script::attribute(locator, name)).await
    }

    async fn texts(&self, locator: &Locator) -> Result<Vec<String>> {
        self.eval_json(script::texts(locator)).await
    }

    async fn page_text(&self) -> Result<String> {
        self.eval_json(script::PAGE_TEXT.to_string()).await
    }

    async fn screenshot_element(&self, locator: &Locator) -> Result<Vec<u8>> {
        self.paced().await;
        let element = self.marked_element(locator, false).await?;
        Ok(element.screenshot(CaptureScreenshotFormat::Png).await?)
    }

    async fn press_escape(&self) -> Result<()> {
        self.paced().await;
        self.page.find_element("body").await?.press_key("Escape").await?;
        Ok(())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.save_screenshot(params, path).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }
}
