//! Notification channel and delivery status names.
//!
//! These must match the `CHECK` constraints on `notifications.channel` and
//! `notifications.status`, and the setting keys that enable each channel.

/// Email to the request submitter, delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// Message to the committee WhatsApp group, delivered via the HTTP bridge.
pub const CHANNEL_WHATSAPP: &str = "whatsapp";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_SENT: &str = "sent";
pub const STATUS_FAILED: &str = "failed";

/// Setting key that toggles a channel at runtime (`"true"` / `"false"`).
/// A missing row means enabled.
pub fn enabled_setting_key(channel: &str) -> String {
    format!("notifications.{channel}.enabled")
}
