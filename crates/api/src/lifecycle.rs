//! Request lifecycle service.
//!
//! Every mutation of a request goes through [`RequestLifecycle`]. Each
//! operation writes the row, its history record and an audit entry in one
//! transaction; only after the commit does it broadcast to WebSocket
//! subscribers and publish a [`LifecycleEvent`] for the notification
//! dispatcher. Neither side effect can fail the operation.
//!
//! Each transaction starts with a write so SQLite takes the write lock up
//! front instead of upgrading a read snapshot. Reads needed for validation
//! happen before the transaction; the compare-and-swap on `status` catches
//! anything that changed in between.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::json;
use validator::Validate;

use kehila_core::error::CoreError;
use kehila_core::realtime::{
    Channel, EVENT_REQUEST_COMMENT, EVENT_REQUEST_CREATED, EVENT_REQUEST_DELETED,
    EVENT_REQUEST_UPDATED,
};
use kehila_core::reference::format_reference;
use kehila_core::request::{
    status_update_action, validate_note, validate_transition, RequestStatus, ACTION_ASSIGNED,
    ACTION_COMMENT, ACTION_CREATED, STATUS_NEW,
};
use kehila_core::roles::Role;
use kehila_core::stats::average_resolution_hours;
use kehila_core::types::DbId;
use kehila_db::models::audit::CreateAuditLog;
use kehila_db::models::request::{
    CreateRequest, NewRequestUpdate, Request, RequestFilter, RequestStats, RequestUpdate,
    UpdateRequestDetails,
};
use kehila_db::repositories::{
    AuditLogRepo, CategoryRepo, RequestRepo, RequestUpdateRepo, UserRepo,
};
use kehila_db::DbPool;
use kehila_events::bus::{
    REQUEST_ASSIGNED, REQUEST_COMMENT, REQUEST_CREATED, REQUEST_STATUS_CHANGED,
};
use kehila_events::{EventBus, LifecycleEvent};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::state::AppState;
use crate::ws::WsHub;

const ENTITY_REQUEST: &str = "request";

/// Who performed an operation, for history and audit records.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Option<DbId>,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn user(user: &AuthUser, ip: ClientIp) -> Self {
        Self {
            user_id: Some(user.user_id),
            ip_address: ip.0,
        }
    }

    /// An unauthenticated caller, e.g. the public submission form.
    pub fn anonymous(ip: ClientIp) -> Self {
        Self {
            user_id: None,
            ip_address: ip.0,
        }
    }

    fn audit(
        &self,
        action_type: &str,
        entity_id: DbId,
        details: serde_json::Value,
    ) -> CreateAuditLog {
        CreateAuditLog {
            user_id: self.user_id,
            action_type: action_type.to_string(),
            entity_type: ENTITY_REQUEST.to_string(),
            entity_id: Some(entity_id),
            details_json: Some(details),
            ip_address: self.ip_address.clone(),
        }
    }
}

/// Request state machine and its side effects.
#[derive(Clone)]
pub struct RequestLifecycle {
    pool: DbPool,
    ws_hub: Arc<WsHub>,
    event_bus: Arc<EventBus>,
    prefix: String,
}

impl RequestLifecycle {
    pub fn new(pool: DbPool, ws_hub: Arc<WsHub>, event_bus: Arc<EventBus>, prefix: String) -> Self {
        Self {
            pool,
            ws_hub,
            event_bus,
            prefix,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.pool.clone(),
            Arc::clone(&state.ws_hub),
            Arc::clone(&state.event_bus),
            state.config.request_number_prefix.clone(),
        )
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Submit a new request with status `new` and a fresh reference number.
    ///
    /// The sequence counter is per prefix and year; a rejected submission
    /// rolls back and does not consume a number.
    pub async fn create_request(&self, input: &CreateRequest, actor: &Actor) -> AppResult<Request> {
        input.validate()?;
        if input.submitter_name.trim().is_empty() || input.subject.trim().is_empty() {
            return Err(CoreError::Validation(
                "Submitter name and subject must not be blank".into(),
            )
            .into());
        }

        let year = Utc::now().year();
        let scope = format!("{}-{year}", self.prefix);

        let mut tx = self.pool.begin().await?;

        let sequence = RequestRepo::next_sequence(&mut *tx, &scope).await?;

        if CategoryRepo::find_active_by_slug(&mut *tx, &input.category)
            .await?
            .is_none()
        {
            return Err(CoreError::Validation(format!(
                "Unknown or inactive category '{}'",
                input.category
            ))
            .into());
        }

        let reference = format_reference(&self.prefix, year, sequence);
        let request = RequestRepo::create(&mut *tx, &reference, input, actor.user_id).await?;

        RequestUpdateRepo::create(
            &mut *tx,
            &NewRequestUpdate {
                request_id: request.id,
                action: ACTION_CREATED,
                note: None,
                old_status: None,
                new_status: Some(STATUS_NEW),
                actor_id: actor.user_id,
                is_public: true,
            },
        )
        .await?;

        AuditLogRepo::create(
            &mut *tx,
            &actor.audit(
                "request.created",
                request.id,
                json!({
                    "reference_number": request.reference_number,
                    "category": request.category,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = request.id,
            reference = %request.reference_number,
            user_id = actor.user_id,
            "Request created",
        );

        self.broadcast(EVENT_REQUEST_CREATED, &request, &request_scopes(&request))
            .await;
        self.event_bus.publish(
            LifecycleEvent::new(REQUEST_CREATED, request.id).with_actor(actor.user_id),
        );

        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Move a request to `target`, optionally with a note.
    ///
    /// A self-transition without a note changes nothing and has no side
    /// effects. Losing a race against another status change yields
    /// `Conflict`.
    pub async fn change_status(
        &self,
        request_id: DbId,
        target: RequestStatus,
        note: Option<&str>,
        actor: &Actor,
    ) -> AppResult<Request> {
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        if let Some(note) = note {
            validate_note(note)?;
        }

        let current = self.find(request_id).await?;
        let current_status = RequestStatus::parse(&current.status)?;
        validate_transition(current_status, target)?;

        let Some(action) = status_update_action(current_status, target, note) else {
            tracing::debug!(request_id, status = %target, "Status unchanged, nothing to do");
            return Ok(current);
        };

        let mut tx = self.pool.begin().await?;

        let updated =
            RequestRepo::update_status_if(&mut *tx, request_id, &current.status, target.as_str())
                .await?
                .ok_or_else(|| {
                    CoreError::Conflict(format!(
                        "Request {request_id} was modified concurrently; reload and retry"
                    ))
                })?;

        RequestUpdateRepo::create(
            &mut *tx,
            &NewRequestUpdate {
                request_id,
                action,
                note,
                old_status: Some(current_status.as_str()),
                new_status: Some(target.as_str()),
                actor_id: actor.user_id,
                is_public: true,
            },
        )
        .await?;

        AuditLogRepo::create(
            &mut *tx,
            &actor.audit(
                "request.status_changed",
                request_id,
                json!({
                    "old_status": current_status.as_str(),
                    "new_status": target.as_str(),
                    "note": note,
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id,
            from = %current_status,
            to = %target,
            user_id = actor.user_id,
            "Request status changed",
        );

        self.broadcast(EVENT_REQUEST_UPDATED, &updated, &request_scopes(&updated))
            .await;
        self.event_bus.publish(
            LifecycleEvent::new(REQUEST_STATUS_CHANGED, request_id)
                .with_actor(actor.user_id)
                .with_payload(json!({
                    "old_status": current_status.as_str(),
                    "new_status": target.as_str(),
                    "note": note,
                })),
        );

        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Assign a request to an active staff member, or clear the assignee.
    pub async fn assign(
        &self,
        request_id: DbId,
        assignee_id: Option<DbId>,
        actor: &Actor,
    ) -> AppResult<Request> {
        let current = self.find(request_id).await?;

        let assignee_name = match assignee_id {
            Some(user_id) => {
                let user = UserRepo::find_by_id(&self.pool, user_id)
                    .await?
                    .filter(|u| u.is_active)
                    .filter(|u| Role::parse(&u.role).is_ok_and(Role::can_manage_requests))
                    .ok_or_else(|| {
                        CoreError::Validation(format!(
                            "User {user_id} is not an active staff member"
                        ))
                    })?;
                Some(user.display_name)
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let updated = RequestRepo::set_assignee(&mut *tx, request_id, assignee_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Request",
                id: request_id,
            })?;

        RequestUpdateRepo::create(
            &mut *tx,
            &NewRequestUpdate {
                request_id,
                action: ACTION_ASSIGNED,
                note: assignee_name.as_deref(),
                old_status: None,
                new_status: None,
                actor_id: actor.user_id,
                is_public: false,
            },
        )
        .await?;

        AuditLogRepo::create(
            &mut *tx,
            &actor.audit(
                "request.assigned",
                request_id,
                json!({ "from": current.assigned_to, "to": assignee_id }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id, assignee_id, user_id = actor.user_id, "Request assigned");

        self.broadcast(EVENT_REQUEST_UPDATED, &updated, &request_scopes(&updated))
            .await;
        self.event_bus.publish(
            LifecycleEvent::new(REQUEST_ASSIGNED, request_id)
                .with_actor(actor.user_id)
                .with_payload(json!({
                    "assigned_to": assignee_id,
                    "assignee_name": assignee_name,
                })),
        );

        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    /// Append a comment. Internal comments (`is_public = false`) are only
    /// broadcast on the staff `requests` channel.
    pub async fn add_comment(
        &self,
        request_id: DbId,
        note: &str,
        is_public: bool,
        actor: &Actor,
    ) -> AppResult<(Request, RequestUpdate)> {
        let note = note.trim();
        validate_note(note)?;

        let mut tx = self.pool.begin().await?;

        let request = RequestRepo::touch(&mut *tx, request_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Request",
                id: request_id,
            })?;

        let update = RequestUpdateRepo::create(
            &mut *tx,
            &NewRequestUpdate {
                request_id,
                action: ACTION_COMMENT,
                note: Some(note),
                old_status: None,
                new_status: None,
                actor_id: actor.user_id,
                is_public,
            },
        )
        .await?;

        AuditLogRepo::create(
            &mut *tx,
            &actor.audit(
                "request.comment",
                request_id,
                json!({ "update_id": update.id, "is_public": is_public }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id, is_public, user_id = actor.user_id, "Comment added");

        let scopes = if is_public {
            request_scopes(&request)
        } else {
            vec![Channel::Requests]
        };
        self.broadcast(
            EVENT_REQUEST_COMMENT,
            &json!({ "request": request, "update": update }),
            &scopes,
        )
        .await;
        self.event_bus.publish(
            LifecycleEvent::new(REQUEST_COMMENT, request_id)
                .with_actor(actor.user_id)
                .with_payload(json!({ "note": note, "is_public": is_public })),
        );

        Ok((request, update))
    }

    // -----------------------------------------------------------------------
    // Details
    // -----------------------------------------------------------------------

    /// Edit descriptive fields. Never touches status or assignee.
    pub async fn update_details(
        &self,
        request_id: DbId,
        input: &UpdateRequestDetails,
        actor: &Actor,
    ) -> AppResult<Request> {
        input.validate()?;
        if let Some(category) = input.category.as_deref() {
            if CategoryRepo::find_active_by_slug(&self.pool, category)
                .await?
                .is_none()
            {
                return Err(CoreError::Validation(format!(
                    "Unknown or inactive category '{category}'"
                ))
                .into());
            }
        }

        let mut tx = self.pool.begin().await?;

        let updated = RequestRepo::update_details(&mut *tx, request_id, input)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Request",
                id: request_id,
            })?;

        AuditLogRepo::create(
            &mut *tx,
            &actor.audit(
                "request.updated",
                request_id,
                json!({
                    "subject": input.subject,
                    "category": input.category,
                    "priority": input.priority.map(|p| p.as_str()),
                }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id, user_id = actor.user_id, "Request details updated");

        self.broadcast(EVENT_REQUEST_UPDATED, &updated, &request_scopes(&updated))
            .await;

        Ok(updated)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove a request together with its history.
    pub async fn delete(&self, request_id: DbId, actor: &Actor) -> AppResult<()> {
        let current = self.find(request_id).await?;

        let mut tx = self.pool.begin().await?;

        if !RequestRepo::delete(&mut *tx, request_id).await? {
            return Err(CoreError::NotFound {
                entity: "Request",
                id: request_id,
            }
            .into());
        }

        AuditLogRepo::create(
            &mut *tx,
            &actor.audit(
                "request.deleted",
                request_id,
                json!({ "reference_number": current.reference_number }),
            ),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id, user_id = actor.user_id, "Request deleted");

        self.broadcast(
            EVENT_REQUEST_DELETED,
            &json!({ "id": request_id, "reference_number": current.reference_number }),
            &request_scopes(&current),
        )
        .await;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find(&self, request_id: DbId) -> AppResult<Request> {
        RequestRepo::find_by_id(&self.pool, request_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Request",
                id: request_id,
            }))
    }

    /// Totals by status and category plus mean hours to first resolution.
    pub async fn stats(&self) -> AppResult<RequestStats> {
        let total = RequestRepo::count(&self.pool, &RequestFilter::default()).await?;
        let by_status = RequestRepo::count_by_status(&self.pool).await?;
        let by_category = RequestRepo::count_by_category(&self.pool).await?;
        let intervals = RequestRepo::resolution_intervals(&self.pool).await?;

        Ok(RequestStats {
            total,
            by_status,
            by_category,
            average_resolution_hours: average_resolution_hours(&intervals),
        })
    }

    async fn broadcast<T: serde::Serialize>(&self, event: &str, data: &T, scopes: &[Channel]) {
        self.ws_hub.publish(event, data, scopes).await;
    }
}

fn request_scopes(request: &Request) -> Vec<Channel> {
    Channel::for_request(request.id, request.created_by)
}
