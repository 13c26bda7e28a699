//! Repository for the append-only `audit_logs` table.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::models::audit::{AuditLog, AuditQuery, CreateAuditLog};
use crate::repositories::page;

const COLUMNS: &str =
    "id, user_id, action_type, entity_type, entity_id, details_json, ip_address, created_at";

/// Insert and query audit entries. There is no update or delete.
pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn create<'e, E: SqliteExecutor<'e>>(
        executor: E,
        input: &CreateAuditLog,
    ) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs \
                (user_id, action_type, entity_type, entity_id, details_json, ip_address, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(input.user_id)
            .bind(&input.action_type)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.details_json)
            .bind(&input.ip_address)
            .bind(Utc::now())
            .fetch_one(executor)
            .await
    }

    /// Query audit logs newest first with optional filters.
    pub async fn query(pool: &SqlitePool, params: &AuditQuery) -> Result<Vec<AuditLog>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if params.user_id.is_some() {
            conditions.push(format!("user_id = ?{param_idx}"));
            param_idx += 1;
        }
        if params.action_type.is_some() {
            conditions.push(format!("action_type = ?{param_idx}"));
            param_idx += 1;
        }
        if params.entity_type.is_some() {
            conditions.push(format!("entity_type = ?{param_idx}"));
            param_idx += 1;
        }
        if params.entity_id.is_some() {
            conditions.push(format!("entity_id = ?{param_idx}"));
            param_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs {where_clause} \
             ORDER BY id DESC LIMIT ?{param_idx} OFFSET ?{}",
            param_idx + 1
        );

        let mut q = sqlx::query_as::<_, AuditLog>(&query);
        if let Some(uid) = params.user_id {
            q = q.bind(uid);
        }
        if let Some(action) = &params.action_type {
            q = q.bind(action);
        }
        if let Some(entity) = &params.entity_type {
            q = q.bind(entity);
        }
        if let Some(eid) = params.entity_id {
            q = q.bind(eid);
        }
        let (limit, offset) = page(params.limit, params.offset);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }
}
