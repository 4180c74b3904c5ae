//! Slotwatch Notify - operator notification channels.
//!
//! All channels sit behind the narrow [`Notifier`] capability. Delivery is
//! best effort: failures are logged and never reach the caller.
//!
//! - [`DesktopNotifier`]: desktop toast, text-to-speech and alert sound
//! - [`TelegramNotifier`]: chat message through the Telegram Bot API
//! - [`CompositeNotifier`]: fan-out to several channels
//! - [`NoopNotifier`] / [`RecordingNotifier`]: silent and recording fakes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod desktop;
pub mod error;
pub mod notifier;
pub mod telegram;

pub use desktop::{AlertSound, DesktopNotifier};
pub use error::{NotifyError, Result};
pub use notifier::{CompositeNotifier, NoopNotifier, Notification, Notifier, RecordingNotifier};
pub use telegram::TelegramNotifier;

use slotwatch_core::NotificationConfig;

/// Build the production notifier set from configuration.
#[must_use]
pub fn from_config(config: &NotificationConfig) -> CompositeNotifier {
    let mut composite = CompositeNotifier::new();
    composite.push(DesktopNotifier::new(
        config.desktop,
        config.speech,
        config.sound,
    ));
    match config.telegram_credentials() {
        Some((token, chat_id)) => match TelegramNotifier::new(token, chat_id) {
            Ok(telegram) => composite.push(telegram),
            Err(e) => tracing::warn!("Telegram disabled: {}", e),
        },
        None => tracing::warn!(
            "Telegram not configured (set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID to enable)"
        ),
    }
    composite
}
