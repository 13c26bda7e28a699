use std::sync::Arc;
use std::time::Duration;

use crate::ws::hub::WsHub;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that pings every connected client.
///
/// Runs until aborted through the returned handle during shutdown.
pub fn start_heartbeat(ws_hub: Arc<WsHub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = ws_hub.connection_count().await;
            tracing::debug!(count, "WebSocket heartbeat ping");
            ws_hub.ping_all().await;
        }
    })
}
