use crate::actions::SessionProvider;
use crate::error::{BrowserError, Result};
use crate::session::BrowserSession;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::handler::viewport::Viewport;
use futures_util::stream::StreamExt;
use slotwatch_core::BrowserConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Browser automation engine
///
/// Owns one Chromium process. Every session it hands out lives in its own
/// browser context, so cookies and storage never leak between poll cycles.
pub struct BrowserEngine {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    user_agent: Option<String>,
    language: String,
    min_action_gap: Duration,
    action_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chromium with the given settings
    pub async fn launch(config: &BrowserConfig, min_action_gap: Duration) -> Result<Self> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .viewport(Viewport {
                width: config.window_width,
                height: config.window_height,
                ..Viewport::default()
            })
            .args(launch_args(config));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &config.executable {
            builder = builder.chrome_executable(exe);
        }

        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chrome_config).await?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            user_agent: config.user_agent.clone(),
            language: config.language.clone(),
            min_action_gap,
            action_timeout: config.action_timeout(),
        })
    }

    /// Close the browser process
    pub async fn shutdown(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        self.handler.abort();
    }
}

#[async_trait]
impl SessionProvider for BrowserEngine {
    type Session = BrowserSession;

    async fn open_session(&self) -> Result<BrowserSession> {
        let browser = self.browser.lock().await;

        let context_id = browser
            .execute(CreateBrowserContextParams::default())
            .await?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(BrowserError::ChromiumError)?;

        let page = match browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                // Do not leave an empty context behind
                let _ = browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await;
                return Err(e.into());
            }
        };

        if let Some(user_agent) = &self.user_agent {
            let ua = SetUserAgentOverrideParams::builder()
                .user_agent(user_agent.clone())
                .accept_language(self.language.clone())
                .build()
                .map_err(BrowserError::ChromiumError)?;
            if let Err(e) = page.set_user_agent(ua).await {
                warn!("Could not override user agent: {}", e);
            }
        }

        debug!("Opened browser session in context {:?}", context_id);
        Ok(BrowserSession::new(
            page,
            context_id,
            self.min_action_gap,
            self.action_timeout,
        ))
    }

    async fn close_session(&self, session: BrowserSession) {
        let (page, context_id) = session.into_parts();

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        let browser = self.browser.lock().await;
        match browser
            .execute(DisposeBrowserContextParams::new(context_id.clone()))
            .await
        {
            Ok(_) => debug!("Disposed browser context {:?}", context_id),
            Err(e) => warn!("Failed to dispose browser context {:?}: {}", context_id, e),
        }
    }
}

/// Chromium flags derived from configuration.
fn launch_args(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![format!("--lang={}", config.language)];
    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }
    args
}
