//! Handlers for citizen requests (`/requests`, also mounted at `/inquiries`).
//!
//! Every mutation is delegated to [`RequestLifecycle`]. Reads apply the
//! visibility rule: viewers and above see every request and every update;
//! anyone else sees only requests they submitted, and only their public
//! updates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use kehila_core::error::CoreError;
use kehila_core::request::{Priority, RequestStatus};
use kehila_core::types::DbId;
use kehila_db::models::request::{
    AddComment, AssignRequest, CreateRequest, Request, RequestFilter, RequestListParams,
    RequestStats, RequestUpdate, StatusChange, UpdateRequestDetails,
};
use kehila_db::repositories::{page, RequestRepo, RequestUpdateRepo};

use crate::error::{AppError, AppResult};
use crate::lifecycle::{Actor, RequestLifecycle};
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::middleware::rbac::{RequireAdmin, RequireStaff, RequireViewer};
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

const NOT_YOUR_REQUEST: &str = "אין לך הרשאה לצפות בפנייה זו";

/// A request with its visible history.
#[derive(Debug, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: Request,
    pub updates: Vec<RequestUpdate>,
}

fn can_read(user: &AuthUser, request: &Request) -> bool {
    user.role.can_view_dashboard() || request.created_by == Some(user.user_id)
}

async fn load_visible(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Request> {
    let request = RequestLifecycle::from_state(state).find(id).await?;
    if !can_read(user, &request) {
        return Err(AppError::Core(CoreError::Forbidden(NOT_YOUR_REQUEST.into())));
    }
    Ok(request)
}

// ---------------------------------------------------------------------------
// GET /requests
// ---------------------------------------------------------------------------

/// List requests, newest first. Citizens only ever see their own.
pub async fn list_requests(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> AppResult<Json<PagedResponse<Request>>> {
    let status = params
        .status
        .as_deref()
        .map(RequestStatus::parse)
        .transpose()?
        .map(|s| s.as_str().to_string());
    let priority = params
        .priority
        .as_deref()
        .map(Priority::parse)
        .transpose()?
        .map(|p| p.as_str().to_string());

    let filter = RequestFilter {
        status,
        category: params.category,
        priority,
        assigned_to: params.assigned_to,
        created_by: (!auth.role.can_view_dashboard()).then_some(auth.user_id),
        search: params.q.filter(|q| !q.trim().is_empty()),
    };

    let (limit, offset) = page(params.limit, params.offset);
    let requests = RequestRepo::list(&state.pool, &filter, limit, offset).await?;
    let total = RequestRepo::count(&state.pool, &filter).await?;

    Ok(Json(PagedResponse {
        data: requests,
        total,
        limit,
        offset,
    }))
}

// ---------------------------------------------------------------------------
// GET /requests/{id}
// ---------------------------------------------------------------------------

pub async fn get_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RequestDetail>>> {
    let request = load_visible(&state, &auth, id).await?;
    let public_only = !auth.role.can_view_dashboard();
    let updates = RequestUpdateRepo::list_for_request(&state.pool, id, public_only).await?;
    Ok(Json(DataResponse {
        data: RequestDetail { request, updates },
    }))
}

// ---------------------------------------------------------------------------
// POST /requests
// ---------------------------------------------------------------------------

/// Submit a request as the authenticated user, who becomes its owner.
pub async fn create_request(
    auth: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateRequest>,
) -> AppResult<impl IntoResponse> {
    let request = RequestLifecycle::from_state(&state)
        .create_request(&input, &Actor::user(&auth, ip))
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

// ---------------------------------------------------------------------------
// PUT|PATCH /requests/{id}
// ---------------------------------------------------------------------------

pub async fn update_request(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRequestDetails>,
) -> AppResult<Json<DataResponse<Request>>> {
    let request = RequestLifecycle::from_state(&state)
        .update_details(id, &input, &Actor::user(&staff, ip))
        .await?;
    Ok(Json(DataResponse { data: request }))
}

// ---------------------------------------------------------------------------
// PATCH /requests/{id}/status
// ---------------------------------------------------------------------------

pub async fn change_status(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<StatusChange>,
) -> AppResult<Json<DataResponse<Request>>> {
    let target = RequestStatus::parse(&input.status)?;
    let request = RequestLifecycle::from_state(&state)
        .change_status(id, target, input.note.as_deref(), &Actor::user(&staff, ip))
        .await?;
    Ok(Json(DataResponse { data: request }))
}

// ---------------------------------------------------------------------------
// PATCH /requests/{id}/assign
// ---------------------------------------------------------------------------

pub async fn assign_request(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<AssignRequest>,
) -> AppResult<Json<DataResponse<Request>>> {
    let request = RequestLifecycle::from_state(&state)
        .assign(id, input.assigned_to, &Actor::user(&staff, ip))
        .await?;
    Ok(Json(DataResponse { data: request }))
}

// ---------------------------------------------------------------------------
// POST /requests/{id}/comment
// ---------------------------------------------------------------------------

/// Staff may post public or internal comments; the owner may post public
/// comments on their own request.
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<AddComment>,
) -> AppResult<impl IntoResponse> {
    let lifecycle = RequestLifecycle::from_state(&state);

    if !auth.role.can_manage_requests() {
        let request = lifecycle.find(id).await?;
        if request.created_by != Some(auth.user_id) {
            return Err(AppError::Core(CoreError::Forbidden(NOT_YOUR_REQUEST.into())));
        }
        if !input.is_public {
            return Err(AppError::Core(CoreError::Forbidden(
                "רק צוות רשאי להוסיף הערות פנימיות".into(),
            )));
        }
    }

    let (_, update) = lifecycle
        .add_comment(id, &input.note, input.is_public, &Actor::user(&auth, ip))
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: update })))
}

// ---------------------------------------------------------------------------
// GET /requests/{id}/updates
// ---------------------------------------------------------------------------

pub async fn list_updates(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<RequestUpdate>>>> {
    load_visible(&state, &auth, id).await?;
    let public_only = !auth.role.can_view_dashboard();
    let updates = RequestUpdateRepo::list_for_request(&state.pool, id, public_only).await?;
    Ok(Json(DataResponse { data: updates }))
}

// ---------------------------------------------------------------------------
// DELETE /requests/{id}
// ---------------------------------------------------------------------------

pub async fn delete_request(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    RequestLifecycle::from_state(&state)
        .delete(id, &Actor::user(&admin, ip))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// GET /requests/stats/summary
// ---------------------------------------------------------------------------

pub async fn stats_summary(
    RequireViewer(_viewer): RequireViewer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<RequestStats>>> {
    let stats = RequestLifecycle::from_state(&state).stats().await?;
    Ok(Json(DataResponse { data: stats }))
}
