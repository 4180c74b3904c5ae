use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use slotwatch_core::Locator;
use std::path::Path;
use std::time::Duration;

/// How often `wait_for` re-checks visibility.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser actions for automation
#[async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL and wait for the page to load
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Whether the located element exists and is rendered
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Click the located element
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Replace the value of the located input
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Read an attribute of the located element
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    /// Visible text of every element matching the locator (ignores `nth`)
    async fn texts(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Visible text of the whole page
    async fn page_text(&self) -> Result<String>;

    /// PNG screenshot of the located element
    async fn screenshot_element(&self, locator: &Locator) -> Result<Vec<u8>>;

    /// Press the Escape key
    async fn press_escape(&self) -> Result<()>;

    /// Save a full-page PNG screenshot
    async fn save_screenshot(&self, path: &Path) -> Result<()>;

    /// URL currently shown
    async fn current_url(&self) -> Result<String>;

    /// Wait until the located element becomes visible
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_visible(locator).await.unwrap_or(false) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{locator} not visible after {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

/// Source of isolated browsing sessions.
///
/// Each session has its own cookies and storage. Closing is infallible at the
/// call site so callers can release sessions on every exit path.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Session type handed out by this provider
    type Session: BrowserActions;

    /// Open a fresh isolated session
    async fn open_session(&self) -> Result<Self::Session>;

    /// Release a session and everything it holds
    async fn close_session(&self, session: Self::Session);
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://secure.e-konsulat.gov.pl/placowki/200").unwrap(),
            "secure.e-konsulat.gov.pl"
        );
        assert_eq!(
            extract_domain("http://subdomain.example.com:8080/path").unwrap(),
            "subdomain.example.com"
        );
    }

    #[test]
    fn test_extract_domain_invalid() {
        assert!(extract_domain("not-a-url").is_err());
    }

    /// Page that becomes visible after a number of checks.
    struct SlowPage {
        checks: AtomicU32,
        visible_after: u32,
    }

    #[async_trait]
    impl BrowserActions for SlowPage {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn is_visible(&self, _locator: &Locator) -> Result<bool> {
            Ok(self.checks.fetch_add(1, Ordering::SeqCst) + 1 >= self.visible_after)
        }
        async fn click(&self, _locator: &Locator) -> Result<()> {
            Ok(())
        }
        async fn fill(&self, _locator: &Locator, _value: &str) -> Result<()> {
            Ok(())
        }
        async fn attribute(&self, _locator: &Locator, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn texts(&self, _locator: &Locator) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn page_text(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn screenshot_element(&self, _locator: &Locator) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn press_escape(&self) -> Result<()> {
            Ok(())
        }
        async fn save_screenshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String> {
            Ok("about:blank".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_succeeds_once_visible() {
        let page = SlowPage {
            checks: AtomicU32::new(0),
            visible_after: 3,
        };
        let result = page
            .wait_for(&Locator::css("img"), Duration::from_secs(5))
            .await;
        assert!(result.is_ok());
        assert_eq!(page.checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let page = SlowPage {
            checks: AtomicU32::new(0),
            visible_after: u32::MAX,
        };
        let result = page
            .wait_for(&Locator::css("img"), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(BrowserError::Timeout(_))));
    }
}
