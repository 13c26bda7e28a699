use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use kehila_core::error::CoreError;
use kehila_core::realtime::Channel;
use kehila_core::roles::Role;
use kehila_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Authenticated user, or `None` for a guest connection.
    pub user: Option<(DbId, Role)>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Channels this connection currently receives broadcasts for.
    pub channels: HashSet<Channel>,
    pub connected_at: Timestamp,
}

/// All live WebSocket connections and their channel subscriptions.
///
/// Designed to be wrapped in `Arc` and shared across the application.
/// Broadcasting pushes onto unbounded per-connection queues and never
/// waits on a client.
pub struct WsHub {
    connections: RwLock<HashMap<String, WsConnection>>,
}

/// Wire shape of every server-to-client frame.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// Serialize `{ "event": ..., "data": ... }` into a text frame.
pub fn event_message<T: Serialize>(event: &str, data: &T) -> Result<Message, serde_json::Error> {
    let text = serde_json::to_string(&Envelope { event, data })?;
    Ok(Message::Text(text.into()))
}

impl WsHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection with no subscriptions.
    ///
    /// Returns the receiver half of the outbound queue so the caller can
    /// forward messages to the socket.
    pub async fn add(
        &self,
        conn_id: String,
        user: Option<(DbId, Role)>,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user,
            sender: tx,
            channels: HashSet::new(),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and all its subscriptions.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// The authenticated user behind a connection, if any.
    pub async fn session(&self, conn_id: &str) -> Option<(DbId, Role)> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .and_then(|conn| conn.user)
    }

    /// Subscribe a connection to `channel` after checking it may.
    ///
    /// `owns_request` must say whether the connection's user created the
    /// request named by a [`Channel::Request`]; it is ignored otherwise.
    pub async fn subscribe(
        &self,
        conn_id: &str,
        channel: Channel,
        owns_request: bool,
    ) -> Result<(), CoreError> {
        let mut conns = self.connections.write().await;
        let conn = conns
            .get_mut(conn_id)
            .ok_or_else(|| CoreError::Validation(format!("Unknown connection '{conn_id}'")))?;
        channel.authorize(conn.user, owns_request)?;
        conn.channels.insert(channel);
        Ok(())
    }

    /// Drop a subscription. Returns whether it existed.
    pub async fn unsubscribe(&self, conn_id: &str, channel: Channel) -> bool {
        self.connections
            .write()
            .await
            .get_mut(conn_id)
            .is_some_and(|conn| conn.channels.remove(&channel))
    }

    /// Send `{event, data}` to every connection subscribed to at least one
    /// of `scopes`. Each connection receives the message at most once.
    ///
    /// Returns the number of connections the message was queued for.
    /// Connections whose queues are closed are skipped; they are cleaned up
    /// when their receive loop ends.
    pub async fn publish<T: Serialize>(&self, event: &str, data: &T, scopes: &[Channel]) -> usize {
        let message = match event_message(event, data) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(event, error = %e, "Failed to serialize broadcast");
                return 0;
            }
        };

        let conns = self.connections.read().await;
        let mut delivered = 0;
        for conn in conns.values() {
            if !scopes.iter().any(|scope| conn.channels.contains(scope)) {
                continue;
            }
            if conn.sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        tracing::debug!(event, delivered, "Broadcast published");
        delivered
    }

    /// Queue a message for one connection. Returns `false` if it is gone.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        self.connections
            .read()
            .await
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Close every connection authenticated as `user_id`.
    ///
    /// Used after an account is deactivated or its role changes, so that
    /// subscriptions granted under the old role do not outlive it. Returns
    /// the number of connections closed.
    pub async fn disconnect_user(&self, user_id: DbId) -> usize {
        let mut conns = self.connections.write().await;
        let before = conns.len();
        conns.retain(|_, conn| {
            if conn.user.is_some_and(|(id, _)| id == user_id) {
                let _ = conn.sender.send(Message::Close(None));
                false
            } else {
                true
            }
        });
        let closed = before - conns.len();
        if closed > 0 {
            tracing::info!(user_id, closed, "Closed WebSocket connections for user");
        }
        closed
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsHub {
    fn default() -> Self {
        Self::new()
    }
}
