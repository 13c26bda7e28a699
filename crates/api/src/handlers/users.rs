//! Handlers for user management under `/admin/users`.
//!
//! All endpoints require [`RequireAdmin`]. Creating, editing or resetting the
//! password of an `admin` or `super_admin` account, and granting either role,
//! additionally requires `super_admin`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use validator::Validate;
use kehila_core::error::CoreError;
use kehila_core::roles::Role;
use kehila_core::types::DbId;
use kehila_db::models::user::{
    CreateUser, CreateUserRequest, ResetPassword, UpdateUser, User, UserResponse,
};
use kehila_db::repositories::{page, AuditLogRepo, UserRepo};

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::handlers::{audit_entry, PageParams};
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::middleware::rbac::RequireAdmin;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

const SUPER_ADMIN_ONLY: &str = "רק מנהל העל רשאי לנהל חשבונות מנהלים";

fn ensure_may_manage(actor: &AuthUser, role: Role) -> AppResult<()> {
    if role.is_admin() && actor.role != Role::SuperAdmin {
        return Err(AppError::Core(CoreError::Forbidden(SUPER_ADMIN_ONLY.into())));
    }
    Ok(())
}

async fn load_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}

// ---------------------------------------------------------------------------
// POST /admin/users
// ---------------------------------------------------------------------------

pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    validate_password_strength(&input.password).map_err(AppError::BadRequest)?;
    let role = Role::parse(&input.role)?;
    ensure_may_manage(&admin, role)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let mut tx = state.pool.begin().await?;
    let user = UserRepo::create(
        &mut *tx,
        &CreateUser {
            email: input.email.trim().to_string(),
            password_hash,
            display_name: input.display_name.trim().to_string(),
            role: role.as_str().to_string(),
        },
    )
    .await?;
    AuditLogRepo::create(
        &mut *tx,
        &audit_entry(
            &admin,
            &ip,
            "user.created",
            "user",
            Some(user.id),
            json!({ "email": user.email, "role": user.role }),
        ),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, role = %role, admin_id = admin.user_id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /admin/users
// ---------------------------------------------------------------------------

pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<PagedResponse<UserResponse>>> {
    let (limit, offset) = page(params.limit, params.offset);
    let users = UserRepo::list(&state.pool, limit, offset).await?;
    let total = UserRepo::count(&state.pool).await?;
    Ok(Json(PagedResponse {
        data: users.into_iter().map(UserResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

// ---------------------------------------------------------------------------
// GET /admin/users/{id}
// ---------------------------------------------------------------------------

pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = load_user(&state, id).await?;
    Ok(Json(DataResponse { data: user.into() }))
}

// ---------------------------------------------------------------------------
// PUT /admin/users/{id}
// ---------------------------------------------------------------------------

/// Change display name, role or active flag.
pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let existing = load_user(&state, id).await?;
    ensure_may_manage(&admin, Role::parse(&existing.role)?)?;

    if let Some(role) = input.role.as_deref() {
        let role = Role::parse(role)?;
        ensure_may_manage(&admin, role)?;
        input.role = Some(role.as_str().to_string());
    }
    if id == admin.user_id && input.is_active == Some(false) {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".into(),
        ));
    }
    if let Some(name) = input.display_name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::Core(CoreError::Validation(
                "Display name must not be empty".into(),
            )));
        }
    }

    let mut tx = state.pool.begin().await?;
    let user = UserRepo::update(&mut *tx, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    AuditLogRepo::create(
        &mut *tx,
        &audit_entry(
            &admin,
            &ip,
            "user.updated",
            "user",
            Some(id),
            json!({
                "display_name": input.display_name,
                "role": input.role,
                "is_active": input.is_active,
            }),
        ),
    )
    .await?;
    tx.commit().await?;

    // Live sockets were authorized under the old role or active flag.
    if !user.is_active || user.role != existing.role {
        state.ws_hub.disconnect_user(id).await;
    }

    Ok(Json(DataResponse { data: user.into() }))
}

// ---------------------------------------------------------------------------
// POST /admin/users/{id}/reset-password
// ---------------------------------------------------------------------------

pub async fn reset_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPassword>,
) -> AppResult<StatusCode> {
    input.validate()?;
    validate_password_strength(&input.password).map_err(AppError::BadRequest)?;

    let existing = load_user(&state, id).await?;
    ensure_may_manage(&admin, Role::parse(&existing.role)?)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let mut tx = state.pool.begin().await?;
    UserRepo::set_password_hash(&mut *tx, id, &password_hash).await?;
    AuditLogRepo::create(
        &mut *tx,
        &audit_entry(&admin, &ip, "user.password_reset", "user", Some(id), json!({})),
    )
    .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
