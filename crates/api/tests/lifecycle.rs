//! Integration tests for the request lifecycle service.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Datelike, Utc};
use sqlx::SqlitePool;

use kehila_api::error::AppError;
use kehila_api::lifecycle::{Actor, RequestLifecycle};
use kehila_api::middleware::auth::{AuthUser, ClientIp};
use kehila_api::ws::WsHub;
use kehila_core::error::CoreError;
use kehila_core::realtime::Channel;
use kehila_core::request::{Priority, RequestStatus, ACTION_NOTE, ACTION_STATUS_CHANGED};
use kehila_core::roles::Role;
use kehila_db::models::request::CreateRequest;
use kehila_db::repositories::{AuditLogRepo, RequestUpdateRepo};
use kehila_db::models::audit::AuditQuery;
use kehila_events::bus::{REQUEST_CREATED, REQUEST_STATUS_CHANGED};
use kehila_events::EventBus;

use common::create_user_with_role;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    lifecycle: RequestLifecycle,
    hub: Arc<WsHub>,
    bus: Arc<EventBus>,
}

fn harness(pool: &SqlitePool) -> Harness {
    let hub = Arc::new(WsHub::new());
    let bus = Arc::new(EventBus::default());
    Harness {
        lifecycle: RequestLifecycle::new(
            pool.clone(),
            Arc::clone(&hub),
            Arc::clone(&bus),
            "REQ".to_string(),
        ),
        hub,
        bus,
    }
}

fn submission(category: &str) -> CreateRequest {
    CreateRequest {
        submitter_name: "Yossi Cohen".to_string(),
        submitter_email: "yossi@example.com".to_string(),
        submitter_phone: None,
        submitter_address: None,
        subject: "Broken street light".to_string(),
        description: Some("Dark since Sunday".to_string()),
        category: category.to_string(),
        priority: Priority::Normal,
    }
}

fn staff_actor(user_id: i64) -> Actor {
    Actor::user(
        &AuthUser {
            user_id,
            role: Role::Staff,
        },
        ClientIp(Some("10.0.0.1".to_string())),
    )
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_assigns_reference_and_history(pool: SqlitePool) {
    let h = harness(&pool);
    let mut events = h.bus.subscribe();

    let request = h
        .lifecycle
        .create_request(&submission("infrastructure"), &Actor::anonymous(ClientIp(None)))
        .await
        .unwrap();

    assert_eq!(request.status, "new");
    assert_eq!(
        request.reference_number,
        format!("REQ-{}-0001", Utc::now().year())
    );
    assert!(request.resolved_at.is_none());

    let updates = RequestUpdateRepo::list_for_request(&pool, request.id, false).await.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].new_status.as_deref(), Some("new"));

    let event = events.try_recv().unwrap();
    assert_eq!(event.event_type, REQUEST_CREATED);
    assert_eq!(event.request_id, request.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_category_is_rejected_without_consuming_a_number(pool: SqlitePool) {
    let h = harness(&pool);
    let anon = Actor::anonymous(ClientIp(None));

    let err = h
        .lifecycle
        .create_request(&submission("fireworks"), &anon)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Core(CoreError::Validation(_)));

    let request = h
        .lifecycle
        .create_request(&submission("sanitation"), &anon)
        .await
        .unwrap();
    assert!(request.reference_number.ends_with("-0001"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_submissions_get_distinct_numbers(pool: SqlitePool) {
    let h = harness(&pool);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let lifecycle = h.lifecycle.clone();
        handles.push(tokio::spawn(async move {
            lifecycle
                .create_request(&submission("infrastructure"), &Actor::anonymous(ClientIp(None)))
                .await
                .unwrap()
                .reference_number
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        assert!(numbers.insert(handle.await.unwrap()));
    }
    assert_eq!(numbers.len(), 10);
}

// ---------------------------------------------------------------------------
// Status changes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn resolved_at_is_set_once_and_kept(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let actor = staff_actor(staff.id);

    let request = h
        .lifecycle
        .create_request(&submission("infrastructure"), &actor)
        .await
        .unwrap();

    h.lifecycle
        .change_status(request.id, RequestStatus::InProgress, None, &actor)
        .await
        .unwrap();
    let resolved = h
        .lifecycle
        .change_status(request.id, RequestStatus::Resolved, Some("Fixed"), &actor)
        .await
        .unwrap();
    let first_resolution = resolved.resolved_at.expect("resolved_at set");

    h.lifecycle
        .change_status(request.id, RequestStatus::InProgress, Some("Lamp failed again"), &actor)
        .await
        .unwrap();
    let again = h
        .lifecycle
        .change_status(request.id, RequestStatus::Resolved, None, &actor)
        .await
        .unwrap();

    assert_eq!(again.resolved_at, Some(first_resolution));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_transition_changes_nothing(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let actor = staff_actor(staff.id);
    let request = h
        .lifecycle
        .create_request(&submission("infrastructure"), &actor)
        .await
        .unwrap();

    let err = h
        .lifecycle
        .change_status(request.id, RequestStatus::Resolved, None, &actor)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Core(CoreError::InvalidTransition { .. }));

    let current = h.lifecycle.find(request.id).await.unwrap();
    assert_eq!(current.status, "new");
    assert_eq!(RequestUpdateRepo::count_for_request(&pool, request.id).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn self_transition_writes_history_only_with_a_note(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let actor = staff_actor(staff.id);
    let request = h
        .lifecycle
        .create_request(&submission("infrastructure"), &actor)
        .await
        .unwrap();
    let mut events = h.bus.subscribe();

    let unchanged = h
        .lifecycle
        .change_status(request.id, RequestStatus::New, Some("   "), &actor)
        .await
        .unwrap();
    assert_eq!(unchanged.updated_at, request.updated_at);
    assert_eq!(RequestUpdateRepo::count_for_request(&pool, request.id).await.unwrap(), 1);
    assert!(events.try_recv().is_err());

    h.lifecycle
        .change_status(request.id, RequestStatus::New, Some("Waiting for contractor"), &actor)
        .await
        .unwrap();
    let updates = RequestUpdateRepo::list_for_request(&pool, request.id, false).await.unwrap();
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().any(|u| u.action == ACTION_NOTE));

    h.lifecycle
        .change_status(request.id, RequestStatus::InProgress, None, &actor)
        .await
        .unwrap();
    let updates = RequestUpdateRepo::list_for_request(&pool, request.id, false).await.unwrap();
    assert_eq!(updates.len(), 3);
    assert!(updates.iter().any(|u| u.action == ACTION_STATUS_CHANGED));

    let mut types = Vec::new();
    while let Ok(event) = events.try_recv() {
        types.push(event.event_type);
    }
    assert_eq!(types, vec![REQUEST_STATUS_CHANGED, REQUEST_STATUS_CHANGED]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_change_is_audited_with_ip(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let actor = staff_actor(staff.id);
    let request = h
        .lifecycle
        .create_request(&submission("infrastructure"), &actor)
        .await
        .unwrap();

    h.lifecycle
        .change_status(request.id, RequestStatus::Closed, Some("Duplicate"), &actor)
        .await
        .unwrap();

    let entries = AuditLogRepo::query(
        &pool,
        &AuditQuery {
            action_type: Some("request.status_changed".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].user_id, Some(staff.id));
    assert_eq!(entries[0].ip_address.as_deref(), Some("10.0.0.1"));
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_active_staff_can_be_assigned(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let citizen = create_user_with_role(&pool, "citizen@example.com", Role::Citizen).await;
    let actor = staff_actor(staff.id);
    let request = h
        .lifecycle
        .create_request(&submission("welfare"), &actor)
        .await
        .unwrap();

    let err = h
        .lifecycle
        .assign(request.id, Some(citizen.id), &actor)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Core(CoreError::Validation(_)));

    let assigned = h.lifecycle.assign(request.id, Some(staff.id), &actor).await.unwrap();
    assert_eq!(assigned.assigned_to, Some(staff.id));

    let cleared = h.lifecycle.assign(request.id, None, &actor).await.unwrap();
    assert_eq!(cleared.assigned_to, None);

    // Assignment history is internal.
    let public = RequestUpdateRepo::list_for_request(&pool, request.id, true).await.unwrap();
    assert_eq!(public.len(), 1);
}

// ---------------------------------------------------------------------------
// Comments and broadcast scoping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn internal_comments_reach_staff_but_not_the_owner(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let owner = create_user_with_role(&pool, "owner@example.com", Role::Citizen).await;

    let owner_actor = Actor::user(
        &AuthUser {
            user_id: owner.id,
            role: Role::Citizen,
        },
        ClientIp(None),
    );
    let request = h
        .lifecycle
        .create_request(&submission("education"), &owner_actor)
        .await
        .unwrap();

    let mut staff_rx = h.hub.add("staff".into(), Some((staff.id, Role::Staff))).await;
    let mut owner_rx = h.hub.add("owner".into(), Some((owner.id, Role::Citizen))).await;
    h.hub.subscribe("staff", Channel::Requests, false).await.unwrap();
    h.hub.subscribe("owner", Channel::User(owner.id), false).await.unwrap();
    h.hub.subscribe("owner", Channel::Request(request.id), true).await.unwrap();

    h.lifecycle
        .add_comment(request.id, "Check with the school", false, &staff_actor(staff.id))
        .await
        .unwrap();
    assert!(staff_rx.try_recv().is_ok());
    assert!(owner_rx.try_recv().is_err());

    h.lifecycle
        .add_comment(request.id, "We are on it", true, &staff_actor(staff.id))
        .await
        .unwrap();
    assert!(staff_rx.try_recv().is_ok());
    assert!(owner_rx.try_recv().is_ok());
    assert!(owner_rx.try_recv().is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_count_by_status(pool: SqlitePool) {
    let h = harness(&pool);
    let staff = create_user_with_role(&pool, "staff@example.com", Role::Staff).await;
    let actor = staff_actor(staff.id);

    for _ in 0..3 {
        h.lifecycle
            .create_request(&submission("infrastructure"), &actor)
            .await
            .unwrap();
    }
    let closing = h
        .lifecycle
        .create_request(&submission("other"), &actor)
        .await
        .unwrap();
    h.lifecycle
        .change_status(closing.id, RequestStatus::Closed, None, &actor)
        .await
        .unwrap();

    let stats = h.lifecycle.stats().await.unwrap();
    assert_eq!(stats.total, 4);
    let new = stats.by_status.iter().find(|b| b.key == "new").unwrap();
    assert_eq!(new.count, 3);
    assert!(stats.average_resolution_hours.is_none());
}
