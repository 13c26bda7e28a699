//! Login, current-user and user administration through the router.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::SqlitePool;

use kehila_api::auth::bootstrap::ensure_admin;
use kehila_api::config::BootstrapAdmin;
use kehila_core::realtime::Channel;
use kehila_core::roles::Role;
use kehila_db::models::user::UpdateUser;
use kehila_db::repositories::UserRepo;

use common::{
    body_json, build_test_app, create_user_with_role, get, patch_json, pothole, post_json, send,
    token_for, TEST_PASSWORD,
};

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_token_and_user(pool: SqlitePool) {
    let user = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, _state) = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/login",
        None,
        json!({ "email": "STAFF@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["user"]["id"], user.id);
    assert!(json["user"].get("password_hash").is_none());

    let token = json["access_token"].as_str().unwrap();
    let response = get(app, "/api/v1/auth/me", Some(token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "staff@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_and_unknown_email_look_the_same(pool: SqlitePool) {
    create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, _state) = build_test_app(pool);

    let wrong = post_json(
        app.clone(),
        "/api/v1/auth/login",
        None,
        json!({ "email": "staff@example.com", "password": "nope-nope-nope" }),
    )
    .await;
    let unknown = post_json(
        app,
        "/api/v1/auth/login",
        None,
        json!({ "email": "ghost@example.com", "password": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong).await, body_json(unknown).await);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inactive_accounts_cannot_log_in(pool: SqlitePool) {
    let user = create_user_with_role(&pool, "gone@example.com", Role::Staff).await;
    UserRepo::update(
        &pool,
        user.id,
        &UpdateUser {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let (app, _state) = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/login",
        None,
        json!({ "email": "gone@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deactivated_staff_lose_access_with_existing_token(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, state) = build_test_app(pool);
    let staff_token = token_for(&staff);

    let response = post_json(app.clone(), "/api/v1/requests", Some(&staff_token), pothole("infrastructure")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let _socket = state.ws_hub.add("staff-socket".into(), Some((staff.id, Role::Staff))).await;
    state.ws_hub.subscribe("staff-socket", Channel::Requests, false).await.unwrap();

    let response = send(
        app.clone(),
        Method::PUT,
        &format!("/api/v1/admin/users/{}", staff.id),
        Some(&token_for(&admin)),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.ws_hub.connection_count().await, 0);

    let response = patch_json(
        app.clone(),
        &format!("/api/v1/requests/{id}/status"),
        Some(&staff_token),
        json!({ "status": "in_progress" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(app, "/api/v1/auth/me", Some(&staff_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn demotion_applies_to_tokens_already_issued(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, state) = build_test_app(pool);
    let staff_token = token_for(&staff);

    let response = post_json(app.clone(), "/api/v1/requests", Some(&staff_token), pothole("infrastructure")).await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let _socket = state.ws_hub.add("staff-socket".into(), Some((staff.id, Role::Staff))).await;

    let response = send(
        app.clone(),
        Method::PUT,
        &format!("/api/v1/admin/users/{}", staff.id),
        Some(&token_for(&admin)),
        Some(json!({ "role": "citizen" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.ws_hub.connection_count().await, 0);

    let response = patch_json(
        app.clone(),
        &format!("/api/v1/requests/{id}/status"),
        Some(&staff_token),
        json!({ "status": "in_progress" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Still a valid account, now with citizen rights.
    let response = get(app, "/api/v1/auth/me", Some(&staff_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["role"], "citizen");
}

// ---------------------------------------------------------------------------
// User administration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_super_admin_manages_admins(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let root = create_user_with_role(&pool, "root@example.com", Role::SuperAdmin).await;
    let (app, _state) = build_test_app(pool);

    let new_admin = json!({
        "email": "second@example.com",
        "password": "long-enough-pw",
        "display_name": "Second Admin",
        "role": "admin",
    });

    let response = post_json(app.clone(), "/api/v1/admin/users", Some(&token_for(&admin)), new_admin.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(app.clone(), "/api/v1/admin/users", Some(&token_for(&root)), new_admin).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Plain admins may still create staff.
    let response = post_json(
        app,
        "/api/v1/admin/users",
        Some(&token_for(&admin)),
        json!({
            "email": "clerk@example.com",
            "password": "long-enough-pw",
            "display_name": "Clerk",
            "role": "staff",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn staff_cannot_reach_admin_routes(pool: SqlitePool) {
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, _state) = build_test_app(pool);

    for uri in ["/api/v1/admin/users", "/api/v1/admin/settings", "/api/v1/admin/audit"] {
        let response = get(app.clone(), uri, Some(&token_for(&staff))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admins_cannot_deactivate_themselves(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let (app, _state) = build_test_app(pool);

    let response = send(
        app,
        Method::PUT,
        &format!("/api/v1/admin/users/{}", admin.id),
        Some(&token_for(&admin)),
        Some(json!({ "is_active": false })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_conflicts(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    create_user_with_role(&pool, "taken@example.com", Role::Staff).await;
    let (app, _state) = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/admin/users",
        Some(&token_for(&admin)),
        json!({
            "email": "Taken@example.com",
            "password": "long-enough-pw",
            "display_name": "Dup",
            "role": "staff",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn channel_toggles_must_be_boolean(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let (app, _state) = build_test_app(pool);
    let token = token_for(&admin);

    let uri = "/api/v1/admin/settings/notifications.whatsapp.enabled";
    let response = send(app.clone(), Method::PUT, uri, Some(&token), Some(json!({ "value": "maybe" }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(app, Method::PUT, uri, Some(&token), Some(json!({ "value": "false" }))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["value"], "false");
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn bootstrap_admin_is_created_once(pool: SqlitePool) {
    let seed = BootstrapAdmin {
        email: "root@example.com".to_string(),
        password: "first-run-password".to_string(),
    };

    let created = ensure_admin(&pool, &seed).await.unwrap().expect("created");
    assert_eq!(created.role, "super_admin");
    assert!(ensure_admin(&pool, &seed).await.unwrap().is_none());
}

async fn audit_rows(pool: &SqlitePool, action_type: &str, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE action_type = ?1 AND entity_id = ?2")
        .bind(action_type)
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn user_writes_commit_with_their_audit_row(pool: SqlitePool) {
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, state) = build_test_app(pool);
    let token = token_for(&admin);

    let response = send(
        app.clone(),
        Method::PUT,
        &format!("/api/v1/admin/users/{}", staff.id),
        Some(&token),
        Some(json!({ "display_name": "Renamed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(audit_rows(&state.pool, "user.updated", staff.id).await, 1);

    let response = post_json(
        app.clone(),
        &format!("/api/v1/admin/users/{}/reset-password", staff.id),
        Some(&token),
        json!({ "password": "another-long-pw" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(audit_rows(&state.pool, "user.password_reset", staff.id).await, 1);

    // A rejected write leaves no audit entry.
    let response = send(
        app,
        Method::PUT,
        "/api/v1/admin/users/9999",
        Some(&token),
        Some(json!({ "display_name": "Ghost" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(audit_rows(&state.pool, "user.updated", 9999).await, 0);
}
