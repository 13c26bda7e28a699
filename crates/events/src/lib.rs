//! Lifecycle event bus and outbound notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LifecycleEvent`]: the envelope published after a request mutation
//!   commits.
//! - [`delivery`]: the email and WhatsApp sinks behind
//!   [`NotificationSink`].
//! - [`NotificationDispatcher`]: background consumer that turns events into
//!   notification records and delivery attempts.

pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod format;

pub use bus::{EventBus, LifecycleEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::whatsapp::{WhatsAppConfig, WhatsAppDelivery};
pub use delivery::{DeliveryError, NotificationSink, OutboundMessage};
pub use dispatcher::NotificationDispatcher;
