#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use slotwatch_browser::{BrowserActions, BrowserError, Locator, Result, SessionProvider};
use slotwatch_captcha::{
    CaptchaResolver, Preprocessor, Recognition, Recognizer, StrategySelector,
};
use slotwatch_core::{AppConfig, PacingConfig};
use slotwatch_poller::OperatorGate;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn captcha_png() -> Vec<u8> {
    let img = GrayImage::from_fn(60, 20, |x, _| if x % 6 < 2 { Luma([20]) } else { Luma([230]) });
    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    png
}

/// Scripted booking page. Locators are matched by their display form.
#[derive(Default)]
pub struct FakePage {
    pub text: String,
    pub visible: HashSet<String>,
    pub missing: HashSet<String>,
    pub attributes: HashMap<(String, String), String>,
    pub option_texts: Vec<String>,
    pub fail_navigation: bool,
    pub actions: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn show(mut self, locator: &Locator) -> Self {
        self.visible.insert(locator.to_string());
        self
    }

    pub fn unclickable(mut self, locator: &Locator) -> Self {
        self.missing.insert(locator.to_string());
        self
    }

    pub fn attr(mut self, locator: &Locator, name: &str, value: &str) -> Self {
        self.attributes
            .insert((locator.to_string(), name.to_string()), value.to_string());
        self
    }

    pub fn options(mut self, texts: &[&str]) -> Self {
        self.option_texts = texts.iter().map(ToString::to_string).collect();
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl BrowserActions for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.record(format!("goto {url}"));
        if self.fail_navigation {
            return Err(BrowserError::NavigationError(
                "net::ERR_CONNECTION_RESET".to_string(),
            ));
        }
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        Ok(self.visible.contains(&locator.to_string()))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        if self.missing.contains(&locator.to_string()) {
            return Err(BrowserError::SelectorNotFound(locator.to_string()));
        }
        self.record(format!("click {locator}"));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        self.record(format!("fill {locator} {value}"));
        Ok(())
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        Ok(self
            .attributes
            .get(&(locator.to_string(), name.to_string()))
            .cloned())
    }

    async fn texts(&self, _locator: &Locator) -> Result<Vec<String>> {
        Ok(self.option_texts.clone())
    }

    async fn page_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn screenshot_element(&self, _locator: &Locator) -> Result<Vec<u8>> {
        Ok(captcha_png())
    }

    async fn press_escape(&self) -> Result<()> {
        self.record("escape".to_string());
        Ok(())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record(format!("screenshot {name}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok("https://booking.test/form".to_string())
    }
}

type PageFactory = Box<dyn Fn(u32) -> Option<FakePage> + Send + Sync>;

/// Hands out fake pages and counts opened / closed sessions.
///
/// `None` from the factory simulates a session that cannot be opened.
pub struct CountingProvider {
    factory: PageFactory,
    requests: AtomicU32,
    pub opened: AtomicU32,
    pub closed: AtomicU32,
    pub last_actions: Mutex<Vec<String>>,
}

impl CountingProvider {
    pub fn new(factory: impl Fn(u32) -> Option<FakePage> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            factory: Box::new(factory),
            requests: AtomicU32::new(0),
            opened: AtomicU32::new(0),
            closed: AtomicU32::new(0),
            last_actions: Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn last_actions(&self) -> Vec<String> {
        self.last_actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for CountingProvider {
    type Session = FakePage;

    async fn open_session(&self) -> Result<FakePage> {
        let request = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        match (self.factory)(request) {
            Some(page) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(page)
            }
            None => Err(BrowserError::ChromiumError("browser crashed".to_string())),
        }
    }

    async fn close_session(&self, session: FakePage) {
        *self.last_actions.lock().unwrap() = session.actions();
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Reads the same text from every image.
pub struct FixedRecognizer(pub &'static str);

#[async_trait]
impl Recognizer for FixedRecognizer {
    async fn recognize(&self, _image: &[u8]) -> slotwatch_captcha::Result<Recognition> {
        Ok(Recognition {
            text: self.0.to_string(),
            confidence: 90.0,
        })
    }
}

#[derive(Default)]
pub struct CountingGate {
    pub resumes: AtomicU32,
}

#[async_trait]
impl OperatorGate for CountingGate {
    async fn wait_for_resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Never lets the operator resume.
#[derive(Default)]
pub struct HangingGate {
    pub entered: AtomicU32,
}

#[async_trait]
impl OperatorGate for HangingGate {
    async fn wait_for_resume(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
    }
}

/// Config with no pacing delays and a short poll interval.
pub fn fast_config(screenshot_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.pacing = PacingConfig {
        min_action_gap_ms: 0,
        captcha_render_ms: 0,
        refresh_ms: 0,
        typing_ms: 0,
        submit_ms: 0,
        form_step_ms: 0,
        form_done_ms: 0,
        availability_ms: 0,
        manual_poll_ms: 5,
    };
    config.polling.interval_ms = 5;
    config.polling.max_cycles = 3;
    config.captcha.image_wait_ms = 20;
    config.captcha.manual_wait_ms = 30;
    config.paths.screenshot_dir = screenshot_dir.to_path_buf();
    config
}

pub fn resolver(config: &AppConfig) -> CaptchaResolver {
    let selector = StrategySelector::new(Arc::new(FixedRecognizer("AB12")), Preprocessor::new());
    CaptchaResolver::new(selector, &config.captcha)
        .with_manual_poll(PacingConfig::ms(config.pacing.manual_poll_ms))
}

/// Page that passes the CAPTCHA immediately (booking form already visible).
pub fn unlocked_page(config: &AppConfig) -> FakePage {
    FakePage::new()
        .show(&config.site.captcha_image)
        .show(&config.site.form_marker)
}
