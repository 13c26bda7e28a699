//! Outbound delivery channels.
//!
//! Each channel implements [`NotificationSink`]. The dispatcher holds sinks
//! as trait objects so tests can substitute their own.

pub mod email;
pub mod whatsapp;

use async_trait::async_trait;

use self::email::EmailError;
use self::whatsapp::WhatsAppError;

/// A formatted message ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    WhatsApp(#[from] WhatsAppError),

    /// Failure reported by a sink outside this crate.
    #[error("{0}")]
    Other(String),
}

/// A transport that makes exactly one delivery attempt per call.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Channel name stored on notification records (`email`, `whatsapp`).
    fn channel(&self) -> &'static str;

    /// Recipient used for group messages, if this sink has one.
    fn default_recipient(&self) -> Option<&str> {
        None
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}
