//! End-to-end request flows through the full router.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::SqlitePool;

use kehila_core::realtime::Channel;
use kehila_core::roles::Role;

use common::{
    body_json, build_test_app, create_user_with_role, get, patch_json, pothole, post_json, send,
    token_for,
};

// ---------------------------------------------------------------------------
// Public submission and tracking
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn anonymous_submission_can_be_tracked(pool: SqlitePool) {
    let (app, _state) = build_test_app(pool);

    let response = post_json(app.clone(), "/api/v1/public/requests", None, pothole("infrastructure")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let receipt = body_json(response).await;
    let reference = receipt["data"]["reference_number"].as_str().unwrap().to_string();
    assert_eq!(receipt["data"]["status"], "new");

    let response = get(app, &format!("/api/v1/public/requests/{reference}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["data"]["reference_number"], reference.as_str());
    assert_eq!(view["data"]["updates"].as_array().unwrap().len(), 1);
    assert!(view["data"].get("submitter_email").is_none());
    assert!(view["data"].get("submitter_phone").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tracking_unknown_or_malformed_reference(pool: SqlitePool) {
    let (app, _state) = build_test_app(pool);

    let response = get(app.clone(), "/api/v1/public/requests/REQ-2026-9999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app, "/api/v1/public/requests/not-a-reference", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submission_validation_errors(pool: SqlitePool) {
    let (app, _state) = build_test_app(pool);

    let mut body = pothole("infrastructure");
    body["submitter_email"] = json!("not-an-email");
    let response = post_json(app.clone(), "/api/v1/public/requests", None, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(app, "/api/v1/public/requests", None, pothole("no-such-category")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Staff workflow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn pothole_flow_from_submission_to_resolution(pool: SqlitePool) {
    let citizen = create_user_with_role(&pool, "citizen@example.com", Role::Citizen).await;
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let (app, state) = build_test_app(pool);
    let citizen_token = token_for(&citizen);
    let staff_token = token_for(&staff);

    let mut watcher = state.ws_hub.add("watcher".into(), Some((staff.id, Role::Staff))).await;
    state.ws_hub.subscribe("watcher", Channel::Requests, false).await.unwrap();

    // Citizen submits.
    let response = post_json(
        app.clone(),
        "/api/v1/requests",
        Some(&citizen_token),
        pothole("infrastructure"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["created_by"], citizen.id);
    assert!(watcher.try_recv().is_ok());

    // Citizen may not change status.
    let response = patch_json(
        app.clone(),
        &format!("/api/v1/requests/{id}/status"),
        Some(&citizen_token),
        json!({ "status": "in_progress" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Staff assigns, works and resolves.
    let response = patch_json(
        app.clone(),
        &format!("/api/v1/requests/{id}/assign"),
        Some(&staff_token),
        json!({ "assigned_to": staff.id }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    for status in ["in_progress", "resolved"] {
        let response = patch_json(
            app.clone(),
            &format!("/api/v1/requests/{id}/status"),
            Some(&staff_token),
            json!({ "status": status, "note": format!("moved to {status}") }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Skipping straight back to new is not a valid transition.
    let response = patch_json(
        app.clone(),
        &format!("/api/v1/requests/{id}/status"),
        Some(&staff_token),
        json!({ "status": "new" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");

    // Staff sees the full history; the citizen only public entries.
    let response = get(app.clone(), &format!("/api/v1/requests/{id}"), Some(&staff_token)).await;
    let detail = body_json(response).await;
    assert_eq!(detail["data"]["status"], "resolved");
    assert!(detail["data"]["resolved_at"].is_string());
    assert_eq!(detail["data"]["updates"].as_array().unwrap().len(), 4);

    let response = get(app, &format!("/api/v1/inquiries/{id}/updates"), Some(&citizen_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updates = body_json(response).await;
    assert_eq!(updates["data"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn citizens_see_only_their_own_requests(pool: SqlitePool) {
    let alice = create_user_with_role(&pool, "alice@example.com", Role::Citizen).await;
    let bob = create_user_with_role(&pool, "bob@example.com", Role::Citizen).await;
    let (app, _state) = build_test_app(pool);

    let response = post_json(app.clone(), "/api/v1/requests", Some(&token_for(&alice)), pothole("other")).await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = get(app.clone(), "/api/v1/requests", Some(&token_for(&bob))).await;
    let list = body_json(response).await;
    assert_eq!(list["total"], 0);

    let response = get(app.clone(), &format!("/api/v1/requests/{id}"), Some(&token_for(&bob))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get(app, "/api/v1/requests", Some(&token_for(&alice))).await;
    assert_eq!(body_json(response).await["total"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn owners_may_not_post_internal_comments(pool: SqlitePool) {
    let owner = create_user_with_role(&pool, "owner@example.com", Role::Citizen).await;
    let (app, _state) = build_test_app(pool);
    let token = token_for(&owner);

    let response = post_json(app.clone(), "/api/v1/requests", Some(&token), pothole("security")).await;
    let id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/requests/{id}/comment");
    let response = post_json(app.clone(), &uri, Some(&token), json!({ "note": "secret", "is_public": false })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(app, &uri, Some(&token), json!({ "note": "Any news?" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["is_public"], true);
}

// ---------------------------------------------------------------------------
// RBAC
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_or_bad_tokens(pool: SqlitePool) {
    let (app, _state) = build_test_app(pool);

    let response = get(app.clone(), "/api/v1/requests", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get(app, "/api/v1/requests", Some("garbage")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_requires_admin(pool: SqlitePool) {
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let admin = create_user_with_role(&pool, "admin@example.com", Role::Admin).await;
    let (app, _state) = build_test_app(pool);

    let response = post_json(app.clone(), "/api/v1/public/requests", None, pothole("culture")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = get(app.clone(), "/api/v1/requests", Some(&token_for(&staff))).await;
    let id = body_json(response).await["data"][0]["id"].as_i64().unwrap();

    let uri = format!("/api/v1/requests/{id}");
    let response = send(app.clone(), Method::DELETE, &uri, Some(&token_for(&staff)), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(app.clone(), Method::DELETE, &uri, Some(&token_for(&admin)), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(app, &uri, Some(&token_for(&admin))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dashboard_resources_need_viewer_to_read_and_staff_to_write(pool: SqlitePool) {
    let citizen = create_user_with_role(&pool, "c@example.com", Role::Citizen).await;
    let viewer = create_user_with_role(&pool, "v@example.com", Role::Viewer).await;
    let staff = create_user_with_role(&pool, "s@example.com", Role::Staff).await;
    let (app, state) = build_test_app(pool);

    let mut dashboard = state.ws_hub.add("dash".into(), Some((viewer.id, Role::Viewer))).await;
    state.ws_hub.subscribe("dash", Channel::Dashboard, false).await.unwrap();

    let response = get(app.clone(), "/api/v1/transactions", Some(&token_for(&citizen))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let entry = json!({
        "kind": "expense",
        "amount": 1250.5,
        "category": "maintenance",
        "transaction_date": "2026-03-01",
    });
    let response = post_json(app.clone(), "/api/v1/transactions", Some(&token_for(&viewer)), entry.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json(app.clone(), "/api/v1/transactions", Some(&token_for(&staff)), entry).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(dashboard.try_recv().is_ok());

    let response = get(app, "/api/v1/transactions/summary", Some(&token_for(&viewer))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["data"]["expense"], 1250.5);
    assert_eq!(summary["data"]["balance"], -1250.5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_database(pool: SqlitePool) {
    let (app, _state) = build_test_app(pool);

    let response = get(app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
}
