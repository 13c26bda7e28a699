//! Repository for the `requests` and `request_sequences` tables.

use chrono::Utc;
use sqlx::query::QueryAs;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{SqliteExecutor, SqlitePool};

use kehila_core::request::STATUS_RESOLVED;
use kehila_core::types::{DbId, Timestamp};

use crate::models::request::{CountBucket, CreateRequest, Request, RequestFilter, UpdateRequestDetails};

/// Column list for `requests` queries.
const COLUMNS: &str = "\
    id, reference_number, submitter_name, submitter_email, submitter_phone, \
    submitter_address, subject, description, category, priority, status, \
    assigned_to, created_by, created_at, updated_at, resolved_at";

/// Provides persistence for requests.
pub struct RequestRepo;

impl RequestRepo {
    // -----------------------------------------------------------------------
    // Reference numbers
    // -----------------------------------------------------------------------

    /// Atomically allocate the next sequence value for `scope` (e.g.
    /// `"REQ-2026"`). The first call for a scope returns 1.
    pub async fn next_sequence<'e, E: SqliteExecutor<'e>>(
        executor: E,
        scope: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO request_sequences (scope, last_value) VALUES (?1, 1) \
             ON CONFLICT (scope) DO UPDATE SET last_value = last_value + 1 \
             RETURNING last_value",
        )
        .bind(scope)
        .fetch_one(executor)
        .await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new request with status `new`.
    pub async fn create<'e, E: SqliteExecutor<'e>>(
        executor: E,
        reference_number: &str,
        input: &CreateRequest,
        created_by: Option<DbId>,
    ) -> Result<Request, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO requests \
                (reference_number, submitter_name, submitter_email, submitter_phone, \
                 submitter_address, subject, description, category, priority, \
                 created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Request>(&query)
            .bind(reference_number)
            .bind(input.submitter_name.trim())
            .bind(input.submitter_email.trim())
            .bind(&input.submitter_phone)
            .bind(&input.submitter_address)
            .bind(input.subject.trim())
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.priority.as_str())
            .bind(created_by)
            .bind(now)
            .fetch_one(executor)
            .await
    }

    /// Set `status` only if the row still holds `expected_status`.
    ///
    /// Entering `resolved` stamps `resolved_at` unless it is already set.
    /// Returns `None` when the row is gone or its status changed since it was
    /// read.
    pub async fn update_status_if<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: DbId,
        expected_status: &str,
        new_status: &str,
    ) -> Result<Option<Request>, sqlx::Error> {
        let query = format!(
            "UPDATE requests SET \
                status = ?1, \
                updated_at = ?2, \
                resolved_at = CASE WHEN ?1 = '{STATUS_RESOLVED}' \
                                   THEN COALESCE(resolved_at, ?2) \
                                   ELSE resolved_at END \
             WHERE id = ?3 AND status = ?4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Request>(&query)
            .bind(new_status)
            .bind(Utc::now())
            .bind(id)
            .bind(expected_status)
            .fetch_optional(executor)
            .await
    }

    /// Set or clear the assignee.
    pub async fn set_assignee<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: DbId,
        assignee: Option<DbId>,
    ) -> Result<Option<Request>, sqlx::Error> {
        let query = format!(
            "UPDATE requests SET assigned_to = ?1, updated_at = ?2 \
             WHERE id = ?3 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Request>(&query)
            .bind(assignee)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Bump `updated_at` without changing anything else.
    pub async fn touch<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Request>, sqlx::Error> {
        let query = format!("UPDATE requests SET updated_at = ?1 WHERE id = ?2 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Request>(&query)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Patch descriptive fields. Only non-`None` fields are applied.
    pub async fn update_details<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &UpdateRequestDetails,
    ) -> Result<Option<Request>, sqlx::Error> {
        let query = format!(
            "UPDATE requests SET \
                submitter_name = COALESCE(?2, submitter_name), \
                submitter_email = COALESCE(?3, submitter_email), \
                submitter_phone = COALESCE(?4, submitter_phone), \
                submitter_address = COALESCE(?5, submitter_address), \
                subject = COALESCE(?6, subject), \
                description = COALESCE(?7, description), \
                category = COALESCE(?8, category), \
                priority = COALESCE(?9, priority), \
                updated_at = ?10 \
             WHERE id = ?1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Request>(&query)
            .bind(id)
            .bind(&input.submitter_name)
            .bind(&input.submitter_email)
            .bind(&input.submitter_phone)
            .bind(&input.submitter_address)
            .bind(&input.subject)
            .bind(&input.description)
            .bind(&input.category)
            .bind(input.priority.map(|p| p.as_str()))
            .bind(Utc::now())
            .fetch_optional(executor)
            .await
    }

    /// Delete a request and (by cascade) its update records.
    pub async fn delete<'e, E: SqliteExecutor<'e>>(executor: E, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Request>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM requests WHERE id = ?1");
        sqlx::query_as::<_, Request>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_reference(
        pool: &SqlitePool,
        reference_number: &str,
    ) -> Result<Option<Request>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM requests WHERE reference_number = ?1");
        sqlx::query_as::<_, Request>(&query)
            .bind(reference_number)
            .fetch_optional(pool)
            .await
    }

    /// Whether `user_id` created request `id`.
    pub async fn is_owned_by(
        pool: &SqlitePool,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM requests WHERE id = ?1 AND created_by = ?2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(found.is_some())
    }

    /// List requests matching `filter`, newest first.
    pub async fn list(
        pool: &SqlitePool,
        filter: &RequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Request>, sqlx::Error> {
        let (where_clause, next_idx) = filter_clause(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM requests {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?{next_idx} OFFSET ?{}",
            next_idx + 1
        );
        bind_filter(sqlx::query_as::<_, Request>(&query), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count requests matching `filter`.
    pub async fn count(pool: &SqlitePool, filter: &RequestFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, _) = filter_clause(filter);
        let query = format!("SELECT COUNT(*) FROM requests {where_clause}");
        let (count,) = bind_filter(sqlx::query_as::<_, (i64,)>(&query), filter)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Statistics
    // -----------------------------------------------------------------------

    pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<CountBucket>, sqlx::Error> {
        sqlx::query_as::<_, CountBucket>(
            "SELECT status AS key, COUNT(*) AS count FROM requests \
             GROUP BY status ORDER BY count DESC, key",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn count_by_category(pool: &SqlitePool) -> Result<Vec<CountBucket>, sqlx::Error> {
        sqlx::query_as::<_, CountBucket>(
            "SELECT category AS key, COUNT(*) AS count FROM requests \
             GROUP BY category ORDER BY count DESC, key",
        )
        .fetch_all(pool)
        .await
    }

    /// `(created_at, resolved_at)` for every request that has been resolved.
    pub async fn resolution_intervals(
        pool: &SqlitePool,
    ) -> Result<Vec<(Timestamp, Timestamp)>, sqlx::Error> {
        sqlx::query_as::<_, (Timestamp, Timestamp)>(
            "SELECT created_at, resolved_at FROM requests WHERE resolved_at IS NOT NULL",
        )
        .fetch_all(pool)
        .await
    }
}

// ---------------------------------------------------------------------------
// Filter helpers
// ---------------------------------------------------------------------------

/// Build the `WHERE` clause for `filter`. Returns the clause and the next
/// free positional parameter index.
fn filter_clause(filter: &RequestFilter) -> (String, usize) {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_idx: usize = 1;

    if filter.status.is_some() {
        conditions.push(format!("status = ?{param_idx}"));
        param_idx += 1;
    }
    if filter.category.is_some() {
        conditions.push(format!("category = ?{param_idx}"));
        param_idx += 1;
    }
    if filter.priority.is_some() {
        conditions.push(format!("priority = ?{param_idx}"));
        param_idx += 1;
    }
    if filter.assigned_to.is_some() {
        conditions.push(format!("assigned_to = ?{param_idx}"));
        param_idx += 1;
    }
    if filter.created_by.is_some() {
        conditions.push(format!("created_by = ?{param_idx}"));
        param_idx += 1;
    }
    if filter.search.is_some() {
        conditions.push(format!(
            "(subject LIKE ?{param_idx} OR reference_number LIKE ?{param_idx} \
              OR submitter_name LIKE ?{param_idx})"
        ));
        param_idx += 1;
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, param_idx)
}

/// Bind `filter` values in the same order [`filter_clause`] numbered them.
fn bind_filter<'q, O>(
    mut q: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    filter: &RequestFilter,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    if let Some(status) = &filter.status {
        q = q.bind(status.clone());
    }
    if let Some(category) = &filter.category {
        q = q.bind(category.clone());
    }
    if let Some(priority) = &filter.priority {
        q = q.bind(priority.clone());
    }
    if let Some(assignee) = filter.assigned_to {
        q = q.bind(assignee);
    }
    if let Some(owner) = filter.created_by {
        q = q.bind(owner);
    }
    if let Some(search) = &filter.search {
        q = q.bind(format!("%{}%", search.trim()));
    }
    q
}
