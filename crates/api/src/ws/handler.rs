use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use kehila_core::realtime::Channel;
use kehila_core::roles::Role;
use kehila_core::types::DbId;
use kehila_db::repositories::RequestRepo;

use crate::middleware::auth::{bearer_token, AuthUser};
use crate::state::AppState;
use crate::ws::hub::event_message;

/// Handshake query string: `GET /api/v1/ws?token=<jwt>`.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Inbound client frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The token is taken from `?token=` or the `Authorization` header. A
/// missing or invalid token yields a guest connection, which may stay
/// connected but cannot subscribe to anything.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = params
        .token
        .as_deref()
        .or_else(|| bearer_token(&headers))
        .map(str::to_string);

    let user = match token {
        Some(t) => match AuthUser::authenticate(&t, &state.config.jwt, &state.pool).await {
            Ok(user) => Some((user.user_id, user.role)),
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket token rejected, connecting as guest");
                None
            }
        },
        None => None,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink and a stream, registers the connection
/// with the hub, spawns a sender task draining the hub's queue, and
/// processes inbound frames on the current task until the client leaves.
async fn handle_socket(socket: WebSocket, state: AppState, user: Option<(DbId, Role)>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        conn_id = %conn_id,
        user_id = user.map(|(id, _)| id),
        "WebSocket connected"
    );

    let mut rx = state.ws_hub.add(conn_id.clone(), user).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_client_message(&state, &conn_id, user, text.as_str()).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.ws_hub.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    conn_id: &str,
    user: Option<(DbId, Role)>,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            reply(state, conn_id, "error", json!({ "message": format!("Malformed message: {e}") }))
                .await;
            return;
        }
    };

    match message {
        ClientMessage::Ping => reply(state, conn_id, "pong", json!({})).await,
        ClientMessage::Subscribe { channel } => {
            let parsed: Channel = match channel.parse() {
                Ok(parsed) => parsed,
                Err(e) => {
                    reply(state, conn_id, "error", json!({ "message": e.to_string(), "channel": channel }))
                        .await;
                    return;
                }
            };

            let owns_request = match (parsed, user) {
                (Channel::Request(request_id), Some((user_id, role)))
                    if !role.can_view_dashboard() =>
                {
                    RequestRepo::is_owned_by(&state.pool, request_id, user_id)
                        .await
                        .unwrap_or_else(|e| {
                            tracing::error!(request_id, error = %e, "Ownership lookup failed");
                            false
                        })
                }
                _ => false,
            };

            match state.ws_hub.subscribe(conn_id, parsed, owns_request).await {
                Ok(()) => {
                    tracing::debug!(conn_id, channel = %parsed, "Subscribed");
                    reply(state, conn_id, "subscribed", json!({ "channel": channel })).await;
                }
                Err(e) => {
                    reply(state, conn_id, "error", json!({ "message": e.to_string(), "channel": channel }))
                        .await;
                }
            }
        }
        ClientMessage::Unsubscribe { channel } => match channel.parse::<Channel>() {
            Ok(parsed) => {
                state.ws_hub.unsubscribe(conn_id, parsed).await;
                reply(state, conn_id, "unsubscribed", json!({ "channel": channel })).await;
            }
            Err(e) => {
                reply(state, conn_id, "error", json!({ "message": e.to_string(), "channel": channel }))
                    .await;
            }
        },
    }
}

async fn reply(state: &AppState, conn_id: &str, event: &str, data: serde_json::Value) {
    match event_message(event, &data) {
        Ok(message) => {
            state.ws_hub.send_to(conn_id, message).await;
        }
        Err(e) => tracing::error!(error = %e, "Failed to serialize WebSocket reply"),
    }
}
