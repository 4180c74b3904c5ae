//! Configuration management for Slotwatch.
//!
//! Configuration is loaded exactly once at startup from an optional TOML file,
//! then overridden by environment-style keys (a `.env` file in the working
//! directory is honoured). The resulting [`AppConfig`] is read-only and is
//! shared with every component by `Arc`.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Locator;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page being watched
    pub target: TargetConfig,
    /// Outer poll loop settings
    pub polling: PollingConfig,
    /// CAPTCHA resolution settings
    pub captcha: CaptchaConfig,
    /// Literal booking form selections
    pub form: FormConfig,
    /// Element locators for the watched site
    pub site: SiteConfig,
    /// Deliberate delays between page interactions
    pub pacing: PacingConfig,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Notification channels
    pub notifications: NotificationConfig,
    /// Artifact and log locations
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// An explicit `path` must exist. Without one, the platform config
    /// directory is consulted and defaults are used when no file is there.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::NotFound {
                    path: p.display().to_string(),
                })
            }
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with `.env` and process environment overrides, then validate.
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::load(path)?;

        match dotenvy::dotenv() {
            Ok(env_path) => tracing::debug!("Loaded environment from {}", env_path.display()),
            Err(e) if e.not_found() => tracing::debug!("No .env file found"),
            Err(e) => return Err(e.into()),
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style key overrides.
    ///
    /// `lookup` returns the raw value for a key, if set. Supported keys:
    /// `CONSULATE_URL`, `POLL_INTERVAL_MS`, `MAX_RETRIES`, `MAX_CAPTCHA_ATTEMPTS`,
    /// `CAPTCHA_TIMEOUT_MS`, `MANUAL_CAPTCHA_WAIT_MS`, `SERVICE_TYPE`, `LOCATION`,
    /// `NUM_PEOPLE`, `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`, `CAPTCHA_DEBUG`,
    /// `HEADED`, `SCREENSHOT_DIR`, `LOG_FILE`, `OCR_LANGUAGE`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CONSULATE_URL") {
            self.target.url = val;
        }
        if let Some(val) = lookup("POLL_INTERVAL_MS") {
            self.polling.interval_ms = parse_value("POLL_INTERVAL_MS", &val)?;
        }
        if let Some(val) = lookup("MAX_RETRIES") {
            self.polling.max_cycles = parse_value("MAX_RETRIES", &val)?;
        }
        if let Some(val) = lookup("MAX_CAPTCHA_ATTEMPTS") {
            self.captcha.max_attempts = parse_value("MAX_CAPTCHA_ATTEMPTS", &val)?;
        }
        if let Some(val) = lookup("CAPTCHA_TIMEOUT_MS") {
            self.captcha.timeout_ms = parse_value("CAPTCHA_TIMEOUT_MS", &val)?;
        }
        if let Some(val) = lookup("MANUAL_CAPTCHA_WAIT_MS") {
            self.captcha.manual_wait_ms = parse_value("MANUAL_CAPTCHA_WAIT_MS", &val)?;
        }
        if let Some(val) = lookup("SERVICE_TYPE") {
            self.form.service_type = val;
        }
        if let Some(val) = lookup("LOCATION") {
            self.form.location = val;
        }
        if let Some(val) = lookup("NUM_PEOPLE") {
            self.form.party_size = val;
        }
        if let Some(val) = lookup("TELEGRAM_BOT_TOKEN") {
            self.notifications.telegram_bot_token = non_empty(val);
        }
        if let Some(val) = lookup("TELEGRAM_CHAT_ID") {
            self.notifications.telegram_chat_id = non_empty(val);
        }
        if let Some(val) = lookup("CAPTCHA_DEBUG") {
            self.captcha.debug = parse_flag("CAPTCHA_DEBUG", &val)?;
        }
        if let Some(val) = lookup("HEADED") {
            self.browser.headless = !parse_flag("HEADED", &val)?;
        }
        if let Some(val) = lookup("SCREENSHOT_DIR") {
            self.paths.screenshot_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("LOG_FILE") {
            self.paths.log_file = PathBuf::from(val);
        }
        if let Some(val) = lookup("OCR_LANGUAGE") {
            self.captcha.ocr_language = val;
        }
        Ok(())
    }

    /// Check that every value is usable before any component is built.
    pub fn validate(&self) -> ConfigResult<()> {
        let url = url::Url::parse(&self.target.url)
            .map_err(|e| ConfigError::invalid("target.url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "target.url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::invalid(
                "polling.interval_ms",
                "must be greater than zero",
            ));
        }
        if self.polling.max_cycles == 0 {
            return Err(ConfigError::invalid("polling.max_cycles", "must be at least 1"));
        }
        if self.captcha.max_attempts == 0 {
            return Err(ConfigError::invalid("captcha.max_attempts", "must be at least 1"));
        }
        for (field, value) in [
            ("captcha.timeout_ms", self.captcha.timeout_ms),
            ("captcha.manual_wait_ms", self.captcha.manual_wait_ms),
            ("captcha.image_wait_ms", self.captcha.image_wait_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }
        if self.browser.language.trim().is_empty() {
            return Err(ConfigError::invalid("browser.language", "must not be empty"));
        }
        for (field, value) in [
            ("form.service_type", &self.form.service_type),
            ("form.location", &self.form.location),
            ("form.party_size", &self.form.party_size),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/slotwatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "slotwatch", "slotwatch").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_value<T>(field: &str, raw: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(field, format!("'{raw}': {e}")))
}

fn parse_flag(field: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(field, format!("'{other}' is not a boolean"))),
    }
}

fn non_empty(val: String) -> Option<String> {
    if val.trim().is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Target page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// URL of the CAPTCHA-gated booking page
    pub url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "https://secure.e-konsulat.gov.pl/placowki/200/wiza-krajowa/wizyty/weryfikacja-obrazkowa"
                .to_string(),
        }
    }
}

/// Outer poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between cycles in milliseconds
    pub interval_ms: u64,
    /// Maximum number of cycles before the process stops
    pub max_cycles: u32,
    /// Block for the operator after a slot is found
    pub pause_on_found: bool,
}

impl PollingConfig {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            max_cycles: 500,
            pause_on_found: true,
        }
    }
}

/// CAPTCHA resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// OCR attempts before falling back to a human
    pub max_attempts: u32,
    /// Hard deadline for the whole resolution in milliseconds
    pub timeout_ms: u64,
    /// How long the manual fallback waits for the operator
    pub manual_wait_ms: u64,
    /// How long to wait for the CAPTCHA image to appear
    pub image_wait_ms: u64,
    /// Write preprocessed images to the debug directory
    pub debug: bool,
    /// Tesseract language code
    pub ocr_language: String,
    /// Tesseract page segmentation mode
    pub ocr_psm: u8,
    /// Tesseract executable
    pub tesseract_bin: String,
}

impl CaptchaConfig {
    /// Overall resolution deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Manual fallback wait.
    #[must_use]
    pub fn manual_wait(&self) -> Duration {
        Duration::from_millis(self.manual_wait_ms)
    }

    /// CAPTCHA image visibility wait.
    #[must_use]
    pub fn image_wait(&self) -> Duration {
        Duration::from_millis(self.image_wait_ms)
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_ms: 60_000,
            manual_wait_ms: 300_000,
            image_wait_ms: 10_000,
            debug: false,
            ocr_language: "eng".to_string(),
            ocr_psm: 7,
            tesseract_bin: "tesseract".to_string(),
        }
    }
}

/// Literal option texts chosen in the booking form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Service type ("Rodzaj usługi")
    pub service_type: String,
    /// Consulate location ("Lokalizacja")
    pub location: String,
    /// Party size ("Chcę zarezerwować termin dla")
    pub party_size: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            service_type: "Wiza krajowa".to_string(),
            location: "Abu Zabi".to_string(),
            party_size: "1 osob".to_string(),
        }
    }
}

/// Element locators for the watched site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// CAPTCHA image
    pub captcha_image: Locator,
    /// CAPTCHA answer textbox
    pub captcha_input: Locator,
    /// CAPTCHA refresh button
    pub refresh_button: Locator,
    /// Submit / continue button
    pub submit_button: Locator,
    /// Element only present once the booking form is shown
    pub form_marker: Locator,
    /// Dropdown triggers; service, location, party size and date are the
    /// first four matches in that order
    pub dropdown_css: String,
    /// Options inside an opened dropdown
    pub option_css: String,
    /// Phrases meaning "no free slots", matched case-insensitively
    pub no_slots_phrases: Vec<String>,
}

impl SiteConfig {
    /// Locator for the `index`-th dropdown trigger.
    #[must_use]
    pub fn dropdown(&self, index: usize) -> Locator {
        Locator::css(self.dropdown_css.clone()).nth(index)
    }

    /// Locator for any dropdown option.
    #[must_use]
    pub fn options(&self) -> Locator {
        Locator::css(self.option_css.clone())
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            captcha_image: Locator::with_text("img", "Weryfikacja obrazkowa"),
            captcha_input: Locator::with_text("input", "znaki"),
            refresh_button: Locator::with_text("button", "Odśwież"),
            submit_button: Locator::with_text("button", "Dalej"),
            form_marker: Locator::with_text("mat-label, label", "Rodzaj usługi"),
            dropdown_css: "mat-select".to_string(),
            option_css: "mat-option, [role='option']".to_string(),
            no_slots_phrases: [
                "wszystkie udostępnione terminy zostały zarezerwowane",
                "brak wolnych termin",
                "brak dostępnych termin",
                "brak miejsc",
                "nie ma wolnych",
                "brak terminów",
                "aktualnie brak",
                "prosimy spróbować",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Deliberate pauses between interactions with the site.
///
/// These keep the interaction rate close to a human's and give the page time
/// to render; they are part of the polling contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Minimum gap between any two browser interactions
    pub min_action_gap_ms: u64,
    /// Wait after the CAPTCHA image becomes visible
    pub captcha_render_ms: u64,
    /// Wait after clicking refresh
    pub refresh_ms: u64,
    /// Wait after typing the answer
    pub typing_ms: u64,
    /// Wait after submitting the answer
    pub submit_ms: u64,
    /// Wait between dropdown interactions
    pub form_step_ms: u64,
    /// Wait after the last form selection
    pub form_done_ms: u64,
    /// Wait before reading the availability state
    pub availability_ms: u64,
    /// Poll period of the manual fallback wait
    pub manual_poll_ms: u64,
}

impl PacingConfig {
    /// Convert one of the millisecond fields to a `Duration`.
    #[must_use]
    pub fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_action_gap_ms: 100,
            captcha_render_ms: 1000,
            refresh_ms: 2000,
            typing_ms: 300,
            submit_ms: 2000,
            form_step_ms: 500,
            form_done_ms: 1000,
            availability_ms: 2000,
            manual_poll_ms: 1000,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
    /// Timeout for a single element interaction in milliseconds
    pub action_timeout_ms: u64,
    /// Explicit Chrome/Chromium executable
    pub executable: Option<PathBuf>,
    /// Browser UI language, also sent as `Accept-Language`
    pub language: String,
    /// Fixed user agent; Chromium's own when unset
    pub user_agent: Option<String>,
}

impl BrowserConfig {
    /// Navigation timeout as a `Duration`.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Action timeout as a `Duration`.
    #[must_use]
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1280,
            window_height: 720,
            navigation_timeout_ms: 30_000,
            action_timeout_ms: 15_000,
            executable: None,
            language: "pl-PL".to_string(),
            user_agent: None,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct NotificationConfig {
    /// Enable desktop notifications
    pub desktop: bool,
    /// Enable text-to-speech
    pub speech: bool,
    /// Enable audible alerts
    pub sound: bool,
    /// Telegram bot token (chat channel disabled when unset)
    pub telegram_bot_token: Option<String>,
    /// Telegram chat id
    pub telegram_chat_id: Option<String>,
}

impl NotificationConfig {
    /// Both chat credentials, if configured.
    #[must_use]
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            speech: true,
            sound: true,
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

/// Artifact and log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for timestamped screenshots
    pub screenshot_dir: PathBuf,
    /// Append-only run log
    pub log_file: PathBuf,
}

impl PathsConfig {
    /// Create the screenshot and log directories.
    pub fn ensure_dirs(&self) -> crate::Result<()> {
        fs::create_dir_all(&self.screenshot_dir)?;
        if let Some(parent) = self.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("screenshots"),
            log_file: PathBuf::from("logs/slotwatch.log"),
        }
    }
}
