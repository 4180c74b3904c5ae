//! Slotwatch Core - Foundation crate for the appointment slot watcher.
//!
//! This crate provides the shared error types, the process-wide configuration
//! and small shared helpers that every other Slotwatch crate depends on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML configuration with `.env` and environment overrides
//! - [`types`] - Shared value types (`Timestamp`, `Locator`)
//!
//! # Example
//!
//! ```rust
//! use slotwatch_core::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//! assert_eq!(config.captcha.max_attempts, 3);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CaptchaConfig, FormConfig, NotificationConfig, PacingConfig,
    PathsConfig, PollingConfig, SiteConfig, TargetConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{Locator, Timestamp};
