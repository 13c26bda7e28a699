//! WhatsApp delivery through an HTTP bridge.
//!
//! The bridge accepts `POST <WHATSAPP_BRIDGE_URL>` with a JSON body
//! `{"chatId": <group id>, "message": <text>}`. One attempt is made per
//! message; a non-2xx response is a failure.

use std::time::Duration;

use async_trait::async_trait;
use kehila_core::channels::CHANNEL_WHATSAPP;

use super::{DeliveryError, NotificationSink, OutboundMessage};

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("WhatsApp bridge returned HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub bridge_url: String,
    /// Chat id of the committee group.
    pub group_id: String,
}

impl WhatsAppConfig {
    /// Returns `None` unless both `WHATSAPP_BRIDGE_URL` and
    /// `WHATSAPP_GROUP_ID` are set.
    pub fn from_env() -> Option<Self> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            bridge_url: non_empty("WHATSAPP_BRIDGE_URL")?,
            group_id: non_empty("WHATSAPP_GROUP_ID")?,
        })
    }
}

pub struct WhatsAppDelivery {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppDelivery {
    pub fn new(config: WhatsAppConfig) -> Result<Self, WhatsAppError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// Post one message to `chat_id`.
    pub async fn deliver(&self, chat_id: &str, text: &str) -> Result<(), WhatsAppError> {
        let response = self
            .client
            .post(&self.config.bridge_url)
            .json(&serde_json::json!({ "chatId": chat_id, "message": text }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WhatsAppError::HttpStatus(response.status().as_u16()));
        }
        tracing::info!(chat_id, "WhatsApp message sent");
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for WhatsAppDelivery {
    fn channel(&self) -> &'static str {
        CHANNEL_WHATSAPP
    }

    fn default_recipient(&self) -> Option<&str> {
        Some(&self.config.group_id)
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        self.deliver(&message.recipient, &message.body)
            .await
            .map_err(DeliveryError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_http_status() {
        assert_eq!(
            WhatsAppError::HttpStatus(502).to_string(),
            "WhatsApp bridge returned HTTP 502"
        );
    }

    #[test]
    fn sink_targets_configured_group() {
        let sink = WhatsAppDelivery::new(WhatsAppConfig {
            bridge_url: "http://127.0.0.1:9/send".into(),
            group_id: "committee@g.us".into(),
        })
        .unwrap();
        assert_eq!(sink.channel(), "whatsapp");
        assert_eq!(sink.default_recipient(), Some("committee@g.us"));
    }

    #[tokio::test]
    async fn unreachable_bridge_is_an_error() {
        let sink = WhatsAppDelivery::new(WhatsAppConfig {
            bridge_url: "http://127.0.0.1:9/send".into(),
            group_id: "committee@g.us".into(),
        })
        .unwrap();
        let result = sink.deliver("committee@g.us", "hello").await;
        assert!(matches!(result, Err(WhatsAppError::Request(_))));
    }
}
