#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tower::ServiceExt;

use kehila_api::auth::jwt::{generate_access_token, JwtConfig};
use kehila_api::auth::password::hash_password;
use kehila_api::config::ServerConfig;
use kehila_api::router::build_app_router;
use kehila_api::state::AppState;
use kehila_api::ws::WsHub;
use kehila_core::roles::Role;
use kehila_db::models::user::{CreateUser, User};
use kehila_db::repositories::UserRepo;
use kehila_events::EventBus;

pub const TEST_PASSWORD: &str = "correct-horse-42";

/// Build a test `ServerConfig` with safe defaults and an in-memory database
/// URL (backups disabled).
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: test_jwt_config(),
        data_dir: PathBuf::from("./data"),
        database_url: "sqlite::memory:".to_string(),
        backup_dir: PathBuf::from("./data/backups"),
        backup_retention: 7,
        backup_interval_hours: 24,
        request_number_prefix: "REQ".to_string(),
        bootstrap_admin: None,
    }
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-for-integration-tests".to_string(),
        access_token_expiry_mins: 60,
    }
}

/// Shared state with a fresh hub and bus.
pub fn test_state(pool: SqlitePool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        ws_hub: Arc::new(WsHub::new()),
        event_bus: Arc::new(EventBus::default()),
    }
}

/// The production router and middleware stack over `pool`. The state is
/// returned too so tests can watch the hub and the bus.
pub fn build_test_app(pool: SqlitePool) -> (Router, AppState) {
    let state = test_state(pool);
    let app = build_app_router(state.clone(), &state.config);
    (app, state)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn create_user_with_role(pool: &SqlitePool, email: &str, role: Role) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
            display_name: format!("Test {role}"),
            role: role.as_str().to_string(),
        },
    )
    .await
    .expect("user creation should succeed")
}

pub fn token_for(user: &User) -> String {
    let role = Role::parse(&user.role).expect("valid role");
    generate_access_token(user.id, role, &test_jwt_config()).expect("token generation")
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn patch_json(
    app: Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PATCH, uri, token, Some(body)).await
}

/// A valid submission body for the given category.
pub fn pothole(category: &str) -> serde_json::Value {
    serde_json::json!({
        "submitter_name": "Yossi Cohen",
        "submitter_email": "yossi@example.com",
        "submitter_phone": "050-1234567",
        "subject": "בור בכביש ברחוב הזית",
        "description": "בור עמוק ליד בית מספר 12",
        "category": category,
        "priority": "high",
    })
}
