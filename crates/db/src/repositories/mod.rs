//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods that
//! accept a pool (or, for operations that take part in a caller's
//! transaction, any [`sqlx::SqliteExecutor`]) as the first argument.

pub mod attendance_repo;
pub mod audit_repo;
pub mod category_repo;
pub mod employee_repo;
pub mod meeting_repo;
pub mod notification_repo;
pub mod project_repo;
pub mod request_repo;
pub mod request_update_repo;
pub mod settings_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use attendance_repo::AttendanceRepo;
pub use audit_repo::AuditLogRepo;
pub use category_repo::CategoryRepo;
pub use employee_repo::EmployeeRepo;
pub use meeting_repo::MeetingRepo;
pub use notification_repo::NotificationRepo;
pub use project_repo::ProjectRepo;
pub use request_repo::RequestRepo;
pub use request_update_repo::RequestUpdateRepo;
pub use settings_repo::SettingsRepo;
pub use transaction_repo::TransactionRepo;
pub use user_repo::UserRepo;

/// Default page size when the caller does not pass `limit`.
pub const DEFAULT_LIMIT: i64 = 50;

/// Upper bound on `limit` for list queries.
pub const MAX_LIMIT: i64 = 200;

/// Clamp optional pagination parameters to sane values.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        offset.unwrap_or(0).max(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_limits() {
        assert_eq!(page(None, None), (DEFAULT_LIMIT, 0));
        assert_eq!(page(Some(10_000), Some(-5)), (MAX_LIMIT, 0));
        assert_eq!(page(Some(0), Some(20)), (1, 20));
    }
}
