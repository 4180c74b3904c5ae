//! Telegram Bot API chat channel.

use crate::error::{NotifyError, Result};
use crate::notifier::Notifier;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

const API_BASE: &str = "https://api.telegram.org";

/// Sends chat messages through a Telegram bot.
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramNotifier {
    /// Create a notifier for the given bot token and chat.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            base_url: API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    /// Point the notifier at another Bot API host (local bot server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }

    /// Send an HTML-formatted message.
    pub async fn send(&self, text: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self.client.post(self.endpoint()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotifyError::ChatApi {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, _title: &str, _body: &str) {}
    async fn speak(&self, _text: &str) {}
    async fn alert(&self, _times: u32) {}

    async fn message(&self, text: &str) {
        match self.send(text).await {
            Ok(()) => debug!("Telegram message sent"),
            Err(e) => error!("Failed to send Telegram message: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_embeds_token() {
        let notifier = TelegramNotifier::new("123:abc", "42").unwrap();
        assert_eq!(
            notifier.endpoint(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );

        let local = notifier.with_base_url("http://localhost:8081/");
        assert_eq!(local.endpoint(), "http://localhost:8081/bot123:abc/sendMessage");
    }

    #[test]
    fn test_request_body_shape() {
        let body = SendMessage {
            chat_id: "42",
            text: "<b>hi</b>",
            parse_mode: "HTML",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"chat_id": "42", "text": "<b>hi</b>", "parse_mode": "HTML"})
        );
    }

    #[tokio::test]
    async fn test_unreachable_api_is_swallowed() {
        let notifier = TelegramNotifier::new("t", "c")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        // Logged, not propagated
        notifier.message("hello").await;
        assert!(notifier.send("hello").await.is_err());
    }
}
