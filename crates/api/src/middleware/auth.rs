//! JWT-based authentication extractor for Axum handlers.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use kehila_core::error::CoreError;
use kehila_core::roles::Role;
use kehila_core::types::DbId;
use kehila_db::repositories::UserRepo;
use kehila_db::DbPool;

use crate::auth::jwt::{validate_token, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from the `Authorization: Bearer` header.
///
/// A missing header is rejected with 401. A token that fails validation, or
/// whose user no longer exists or has been deactivated, is rejected with
/// 403. The role always comes from the stored account, so a demotion takes
/// effect on the next request rather than when the token expires.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: Role,
}

impl AuthUser {
    /// Decode a raw token into a user.
    pub fn from_token(token: &str, config: &JwtConfig) -> Result<Self, CoreError> {
        let claims = validate_token(token, config)
            .map_err(|_| CoreError::Forbidden("Invalid or expired token".into()))?;
        let role = Role::parse(&claims.role)
            .map_err(|_| CoreError::Forbidden("Invalid or expired token".into()))?;
        Ok(AuthUser {
            user_id: claims.sub,
            role,
        })
    }

    /// Decode a raw token and check it against the stored account.
    pub async fn authenticate(
        token: &str,
        config: &JwtConfig,
        pool: &DbPool,
    ) -> Result<Self, AppError> {
        let claimed = Self::from_token(token, config)?;
        let user = UserRepo::find_by_id(pool, claimed.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| CoreError::Forbidden("Account is disabled or no longer exists".into()))?;
        let role = Role::parse(&user.role)?;
        if role != claimed.role {
            tracing::debug!(
                user_id = user.id,
                token_role = %claimed.role,
                role = %role,
                "Role changed since token was issued",
            );
        }
        Ok(AuthUser {
            user_id: user.id,
            role,
        })
    }
}

/// The raw token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        AuthUser::authenticate(token.trim(), &state.config.jwt, &state.pool).await
    }
}

/// Caller IP address: the first `X-Forwarded-For` hop when present,
/// otherwise the socket peer. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Ok(ClientIp(forwarded.or_else(peer)))
    }
}
