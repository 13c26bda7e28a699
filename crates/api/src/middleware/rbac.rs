//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects callers whose role does not
//! include the required one. Rejection messages are shown to end users and
//! are therefore in Hebrew.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use kehila_core::error::CoreError;
use kehila_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require(
    parts: &mut Parts,
    state: &AppState,
    allowed: fn(Role) -> bool,
    message: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !allowed(user.role) {
        tracing::debug!(user_id = user.user_id, role = %user.role, "Role check rejected");
        return Err(AppError::Core(CoreError::Forbidden(message.into())));
    }
    Ok(user)
}

/// Requires `super_admin`.
pub struct RequireSuperAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require(
            parts,
            state,
            |role| role == Role::SuperAdmin,
            "פעולה זו מותרת למנהל העל בלבד",
        )
        .await?;
        Ok(RequireSuperAdmin(user))
    }
}

/// Requires `admin` or `super_admin`.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(user): RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require(parts, state, Role::is_admin, "נדרשת הרשאת מנהל").await?;
        Ok(RequireAdmin(user))
    }
}

/// Requires a role that may mutate requests (staff, editor or above).
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require(
            parts,
            state,
            Role::can_manage_requests,
            "נדרשת הרשאת צוות לביצוע פעולה זו",
        )
        .await?;
        Ok(RequireStaff(user))
    }
}

/// Requires read access to the dashboard (viewer or above).
pub struct RequireViewer(pub AuthUser);

impl FromRequestParts<AppState> for RequireViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require(
            parts,
            state,
            Role::can_view_dashboard,
            "אין לך הרשאה לצפות במידע זה",
        )
        .await?;
        Ok(RequireViewer(user))
    }
}
