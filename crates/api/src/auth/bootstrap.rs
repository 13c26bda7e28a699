//! First-run seeding of a super-admin account.

use kehila_core::roles::Role;
use kehila_db::models::user::{CreateUser, User};
use kehila_db::repositories::UserRepo;
use kehila_db::DbPool;

use crate::auth::password::{hash_password, validate_password_strength};
use crate::config::BootstrapAdmin;
use crate::error::{AppError, AppResult};

/// Create the configured super-admin unless an account with that email
/// already exists. Returns the new user, or `None` when nothing was created.
pub async fn ensure_admin(pool: &DbPool, admin: &BootstrapAdmin) -> AppResult<Option<User>> {
    let email = admin.email.trim().to_string();
    if UserRepo::find_by_email(pool, &email).await?.is_some() {
        return Ok(None);
    }

    validate_password_strength(&admin.password).map_err(AppError::BadRequest)?;
    let password_hash = hash_password(&admin.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            email,
            password_hash,
            display_name: "מנהל מערכת".to_string(),
            role: Role::SuperAdmin.as_str().to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Bootstrap super-admin created");
    Ok(Some(user))
}
