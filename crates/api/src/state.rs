use std::sync::Arc;

use kehila_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsHub;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference-counted internally and everything
/// else sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: kehila_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connections and their channel subscriptions.
    pub ws_hub: Arc<WsHub>,
    /// Lifecycle events consumed by the notification dispatcher.
    pub event_bus: Arc<EventBus>,
}
