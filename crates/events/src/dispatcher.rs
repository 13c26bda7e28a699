//! Notification dispatcher.
//!
//! [`NotificationDispatcher`] subscribes to the [`EventBus`](crate::EventBus)
//! and turns each [`LifecycleEvent`] into zero or more outbound messages.
//! Every message produces exactly one `notifications` row. Delivery is
//! attempted once; failures are recorded and logged, never propagated.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use kehila_core::channels::{enabled_setting_key, CHANNEL_EMAIL, CHANNEL_WHATSAPP};
use kehila_db::models::notification::CreateNotification;
use kehila_db::models::request::Request;
use kehila_db::repositories::{NotificationRepo, RequestRepo, SettingsRepo};
use kehila_db::DbPool;

use crate::bus::{
    LifecycleEvent, REQUEST_ASSIGNED, REQUEST_COMMENT, REQUEST_CREATED, REQUEST_STATUS_CHANGED,
};
use crate::delivery::{NotificationSink, OutboundMessage};
use crate::format;

/// Recipient recorded for group messages when no WhatsApp group is
/// configured.
const UNCONFIGURED_GROUP: &str = "committee-group";

/// Who a planned message goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A specific address (the submitter's email).
    Address(String),
    /// The committee group of the sink (WhatsApp).
    Group,
}

/// A message the dispatcher intends to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMessage {
    pub channel: &'static str,
    pub recipient: Recipient,
    pub subject: Option<String>,
    pub body: String,
}

impl PlannedMessage {
    fn email(to: &str, text: format::EmailText) -> Self {
        Self {
            channel: CHANNEL_EMAIL,
            recipient: Recipient::Address(to.to_string()),
            subject: Some(text.subject),
            body: text.body,
        }
    }

    fn group(body: String) -> Self {
        Self {
            channel: CHANNEL_WHATSAPP,
            recipient: Recipient::Group,
            subject: None,
            body,
        }
    }
}

/// Decide which messages an event produces for `request`.
pub fn plan(event: &LifecycleEvent, request: &Request) -> Vec<PlannedMessage> {
    let to = request.submitter_email.as_str();
    match event.event_type.as_str() {
        REQUEST_CREATED => vec![
            PlannedMessage::email(to, format::request_received(request)),
            PlannedMessage::group(format::new_request_summary(request)),
        ],
        REQUEST_STATUS_CHANGED => {
            let new_status = event.payload_str("new_status").unwrap_or(request.status.as_str());
            vec![PlannedMessage::email(
                to,
                format::status_changed(request, new_status, event.payload_str("note")),
            )]
        }
        REQUEST_COMMENT => match (event.payload_bool("is_public"), event.payload_str("note")) {
            (Some(true), Some(note)) => {
                vec![PlannedMessage::email(to, format::comment_added(request, note))]
            }
            _ => Vec::new(),
        },
        REQUEST_ASSIGNED => vec![PlannedMessage::group(format::assignment_summary(
            request,
            event.payload_str("assignee_name"),
        ))],
        _ => Vec::new(),
    }
}

pub struct NotificationDispatcher {
    pool: DbPool,
    email: Option<Arc<dyn NotificationSink>>,
    whatsapp: Option<Arc<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    /// A dispatcher with no sinks configured; add them with
    /// [`with_email`](Self::with_email) and [`with_whatsapp`](Self::with_whatsapp).
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            email: None,
            whatsapp: None,
        }
    }

    pub fn with_email(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.email = Some(sink);
        self
    }

    pub fn with_whatsapp(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.whatsapp = Some(sink);
        self
    }

    /// Consume events until the bus closes or `cancel` fires.
    ///
    /// On cancellation, events already queued for this receiver are still
    /// delivered before the loop exits.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<LifecycleEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                result = receiver.recv() => match result {
                    Ok(event) => {
                        self.dispatch(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Notification dispatcher lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, notification dispatcher shutting down");
                        break;
                    }
                },
                _ = cancel.cancelled() => {
                    let drained = self.drain(&mut receiver).await;
                    tracing::info!(drained, "Notification dispatcher cancelled");
                    break;
                }
            }
        }
    }

    /// Dispatch whatever is already queued without waiting for more.
    async fn drain(&self, receiver: &mut broadcast::Receiver<LifecycleEvent>) -> usize {
        let mut drained = 0;
        loop {
            match receiver.try_recv() {
                Ok(event) => {
                    self.dispatch(&event).await;
                    drained += 1;
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged, events skipped");
                }
                Err(_) => break,
            }
        }
        drained
    }

    /// Handle one event. Returns how many messages were sent successfully.
    pub async fn dispatch(&self, event: &LifecycleEvent) -> usize {
        let request = match RequestRepo::find_by_id(&self.pool, event.request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!(
                    request_id = event.request_id,
                    event_type = %event.event_type,
                    "Request gone before notification, skipping"
                );
                return 0;
            }
            Err(e) => {
                tracing::warn!(error = %e, request_id = event.request_id, "Failed to load request for notification");
                return 0;
            }
        };

        let mut sent = 0;
        for message in plan(event, &request) {
            if self.deliver(event, &message).await {
                sent += 1;
            }
        }
        sent
    }

    /// Record and attempt one message. Returns `true` only when the sink
    /// accepted it.
    pub async fn deliver(&self, event: &LifecycleEvent, message: &PlannedMessage) -> bool {
        let sink = match message.channel {
            CHANNEL_EMAIL => self.email.as_ref(),
            CHANNEL_WHATSAPP => self.whatsapp.as_ref(),
            _ => None,
        };

        let recipient = match (&message.recipient, sink) {
            (Recipient::Address(addr), _) => addr.clone(),
            (Recipient::Group, Some(sink)) => sink
                .default_recipient()
                .unwrap_or(UNCONFIGURED_GROUP)
                .to_string(),
            (Recipient::Group, None) => UNCONFIGURED_GROUP.to_string(),
        };

        let record = CreateNotification {
            request_id: Some(event.request_id),
            event_type: event.event_type.clone(),
            channel: message.channel.to_string(),
            recipient: recipient.clone(),
            subject: message.subject.clone(),
            content: message.body.clone(),
        };

        let enabled = SettingsRepo::get_flag(&self.pool, &enabled_setting_key(message.channel), true)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, channel = message.channel, "Failed to read channel setting");
                false
            });

        let skip_reason = if !enabled {
            Some(format!("{} channel disabled", message.channel))
        } else if sink.is_none()
            || (message.recipient == Recipient::Group && recipient == UNCONFIGURED_GROUP)
        {
            Some(format!("{} channel not configured", message.channel))
        } else {
            None
        };

        if let Some(reason) = skip_reason {
            tracing::debug!(channel = message.channel, event_type = %event.event_type, %reason, "Notification not sent");
            if let Err(e) = NotificationRepo::create_failed(&self.pool, &record, &reason).await {
                tracing::warn!(error = %e, "Failed to record skipped notification");
            }
            return false;
        }
        let Some(sink) = sink else {
            return false;
        };

        let pending = match NotificationRepo::create_pending(&self.pool, &record).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to record notification, not sending");
                return false;
            }
        };

        let outbound = OutboundMessage {
            recipient,
            subject: message.subject.clone(),
            body: message.body.clone(),
        };

        match sink.send(&outbound).await {
            Ok(()) => {
                if let Err(e) = NotificationRepo::mark_sent(&self.pool, pending.id).await {
                    tracing::warn!(error = %e, notification_id = pending.id, "Failed to mark notification sent");
                }
                true
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    channel = message.channel,
                    request_id = event.request_id,
                    "Notification delivery failed"
                );
                if let Err(e) =
                    NotificationRepo::mark_failed(&self.pool, pending.id, &err.to_string()).await
                {
                    tracing::warn!(error = %e, notification_id = pending.id, "Failed to mark notification failed");
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn request() -> Request {
        let now = Utc::now();
        Request {
            id: 5,
            reference_number: "REQ-2026-0005".into(),
            submitter_name: "Avi".into(),
            submitter_email: "avi@example.com".into(),
            submitter_phone: None,
            submitter_address: None,
            subject: "pothole".into(),
            description: None,
            category: "infrastructure".into(),
            priority: "normal".into(),
            status: "new".into(),
            assigned_to: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    #[test]
    fn created_notifies_submitter_and_group() {
        let planned = plan(&LifecycleEvent::new(REQUEST_CREATED, 5), &request());
        assert_eq!(planned.len(), 2);
        assert_eq!(planned[0].channel, CHANNEL_EMAIL);
        assert_eq!(planned[0].recipient, Recipient::Address("avi@example.com".into()));
        assert_eq!(planned[1].channel, CHANNEL_WHATSAPP);
        assert_eq!(planned[1].recipient, Recipient::Group);
    }

    #[test]
    fn internal_comment_notifies_nobody() {
        let event = LifecycleEvent::new(REQUEST_COMMENT, 5)
            .with_payload(serde_json::json!({"note": "internal", "is_public": false}));
        assert!(plan(&event, &request()).is_empty());

        let public = LifecycleEvent::new(REQUEST_COMMENT, 5)
            .with_payload(serde_json::json!({"note": "on the way", "is_public": true}));
        assert_eq!(plan(&public, &request()).len(), 1);
    }

    #[test]
    fn unknown_event_plans_nothing() {
        assert!(plan(&LifecycleEvent::new("request.archived", 5), &request()).is_empty());
    }
}
