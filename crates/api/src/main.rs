use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kehila_api::background::backup::{self, BackupService};
use kehila_api::config::ServerConfig;
use kehila_api::router::build_app_router;
use kehila_api::state::AppState;
use kehila_api::{auth, ws};
use kehila_events::{
    EmailConfig, EmailDelivery, EventBus, NotificationDispatcher, WhatsAppConfig,
    WhatsAppDelivery,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();

    // `kehila-api restore <snapshot>` swaps the database file and exits.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, name] = args.as_slice() {
        if command == "restore" {
            restore(&config, name).await;
            return;
        }
    }
    if !args.is_empty() {
        eprintln!("usage: kehila-api [restore <snapshot-name>]");
        std::process::exit(2);
    }

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    std::fs::create_dir_all(&config.data_dir).expect("Failed to create DATA_DIR");

    let pool = kehila_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open database");
    tracing::info!("Database connection pool created");

    kehila_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    kehila_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    if let Some(admin) = &config.bootstrap_admin {
        auth::bootstrap::ensure_admin(&pool, admin)
            .await
            .expect("Failed to create bootstrap admin");
    }

    // --- WebSocket hub ---
    let ws_hub = Arc::new(ws::WsHub::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_hub));

    // --- Event bus and notifications ---
    let event_bus = Arc::new(EventBus::default());

    let mut dispatcher = NotificationDispatcher::new(pool.clone());
    match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(host = %email.smtp_host, "Email delivery enabled");
            dispatcher = dispatcher.with_email(Arc::new(EmailDelivery::new(email)));
        }
        None => tracing::warn!("SMTP not configured, email notifications will be recorded as failed"),
    }
    match WhatsAppConfig::from_env().map(WhatsAppDelivery::new) {
        Some(Ok(whatsapp)) => {
            tracing::info!("WhatsApp delivery enabled");
            dispatcher = dispatcher.with_whatsapp(Arc::new(whatsapp));
        }
        Some(Err(e)) => tracing::error!(error = %e, "Failed to build WhatsApp client"),
        None => tracing::warn!("WhatsApp bridge not configured, group notifications will be recorded as failed"),
    }
    let dispatcher_cancel = CancellationToken::new();
    let dispatcher_handle =
        tokio::spawn(dispatcher.run(event_bus.subscribe(), dispatcher_cancel.clone()));

    // --- Backups ---
    let backup_cancel = CancellationToken::new();
    let backup_handle = match BackupService::from_config(&config) {
        Some(service) => Some(tokio::spawn(backup::run(
            service,
            pool.clone(),
            Duration::from_secs(config.backup_interval_hours * 3600),
            backup_cancel.clone(),
        ))),
        None => {
            tracing::warn!("In-memory database, scheduled backups disabled");
            None
        }
    };

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_hub: Arc::clone(&ws_hub),
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    backup_cancel.cancel();
    if let Some(handle) = backup_handle {
        let _ = tokio::time::timeout(grace, handle).await;
    }
    tracing::info!("Backup scheduler stopped");

    // WebSocket tasks may still hold the bus, so stop the dispatcher directly.
    dispatcher_cancel.cancel();
    let _ = tokio::time::timeout(grace, dispatcher_handle).await;
    tracing::info!("Notification dispatcher stopped");

    let ws_count = ws_hub.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_hub.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Human-readable logs by default; `LOG_FORMAT=json` for one JSON object per
/// line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "kehila_api=debug,kehila_events=debug,kehila_db=info,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Offline restore. The server must not be running against the same file.
async fn restore(config: &ServerConfig, name: &str) {
    let Some(service) = BackupService::from_config(config) else {
        eprintln!("Cannot restore an in-memory database");
        std::process::exit(1);
    };

    match service.restore(name).await {
        Ok(Some(saved)) => {
            println!("Restored {name}; previous database saved as {}", saved.display());
        }
        Ok(None) => println!("Restored {name}"),
        Err(e) => {
            eprintln!("Restore failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
