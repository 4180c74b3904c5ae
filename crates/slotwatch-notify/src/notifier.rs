//! The notification capability and its composite / fake implementations.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Narrow capability for reaching the human operator.
///
/// Every method is best effort and returns nothing: a channel that cannot
/// deliver logs the failure and carries on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a desktop notification.
    async fn notify(&self, title: &str, body: &str);

    /// Read text aloud.
    async fn speak(&self, text: &str);

    /// Play the alert sound `times` times.
    async fn alert(&self, times: u32);

    /// Send a chat message (HTML formatted).
    async fn message(&self, text: &str);

    /// Desktop notification plus a chat message carrying the same content.
    async fn notify_all(&self, title: &str, body: &str) {
        self.notify(title, body).await;
        self.message(&format!("<b>{}</b>\n\n{}", escape_html(title), escape_html(body)))
            .await;
    }
}

/// Escape text for Telegram's HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Fans every call out to all contained channels, in insertion order.
#[derive(Default)]
pub struct CompositeNotifier {
    channels: Vec<Box<dyn Notifier>>,
}

impl CompositeNotifier {
    /// Empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel.
    pub fn push(&mut self, channel: impl Notifier + 'static) {
        self.channels.push(Box::new(channel));
    }

    /// Number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for CompositeNotifier {
    async fn notify(&self, title: &str, body: &str) {
        for channel in &self.channels {
            channel.notify(title, body).await;
        }
    }

    async fn speak(&self, text: &str) {
        for channel in &self.channels {
            channel.speak(text).await;
        }
    }

    async fn alert(&self, times: u32) {
        for channel in &self.channels {
            channel.alert(times).await;
        }
    }

    async fn message(&self, text: &str) {
        for channel in &self.channels {
            channel.message(text).await;
        }
    }
}

/// Notifier that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _title: &str, _body: &str) {}
    async fn speak(&self, _text: &str) {}
    async fn alert(&self, _times: u32) {}
    async fn message(&self, _text: &str) {}
}

/// One call captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `notify(title, body)`
    Desktop {
        /// Title
        title: String,
        /// Body
        body: String,
    },
    /// `speak(text)`
    Speech(String),
    /// `alert(times)`
    Alert(u32),
    /// `message(text)`
    Chat(String),
}

/// Notifier that records every call, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<Notification> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: Notification) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) {
        self.record(Notification::Desktop {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    async fn speak(&self, text: &str) {
        self.record(Notification::Speech(text.to_string()));
    }

    async fn alert(&self, times: u32) {
        self.record(Notification::Alert(times));
    }

    async fn message(&self, text: &str) {
        self.record(Notification::Chat(text.to_string()));
    }
}
