//! Repository for the `transactions` (budget) table.

use chrono::Utc;
use sqlx::SqlitePool;

use kehila_core::types::DbId;

use crate::models::transaction::{
    CreateTransaction, Transaction, TransactionListParams, TransactionSummary, UpdateTransaction,
    KIND_EXPENSE, KIND_INCOME,
};
use crate::repositories::page;

const COLUMNS: &str = "\
    id, kind, amount, category, description, transaction_date, project_id, \
    created_by, created_at, updated_at";

pub struct TransactionRepo;

impl TransactionRepo {
    pub async fn create(
        pool: &SqlitePool,
        input: &CreateTransaction,
        created_by: Option<DbId>,
    ) -> Result<Transaction, sqlx::Error> {
        let query = format!(
            "INSERT INTO transactions \
                (kind, amount, category, description, transaction_date, project_id, \
                 created_by, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Transaction>(&query)
            .bind(&input.kind)
            .bind(input.amount)
            .bind(&input.category)
            .bind(&input.description)
            .bind(input.transaction_date)
            .bind(input.project_id)
            .bind(created_by)
            .bind(Utc::now())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: DbId) -> Result<Option<Transaction>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1");
        sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List transactions, most recent date first.
    pub async fn list(
        pool: &SqlitePool,
        params: &TransactionListParams,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        let (where_clause, param_idx) = filter_clause(params);
        let query = format!(
            "SELECT {COLUMNS} FROM transactions {where_clause} \
             ORDER BY transaction_date DESC, id DESC \
             LIMIT ?{param_idx} OFFSET ?{}",
            param_idx + 1
        );
        let mut q = sqlx::query_as::<_, Transaction>(&query);
        if let Some(kind) = &params.kind {
            q = q.bind(kind);
        }
        if let Some(from) = params.from {
            q = q.bind(from);
        }
        if let Some(to) = params.to {
            q = q.bind(to);
        }
        if let Some(project_id) = params.project_id {
            q = q.bind(project_id);
        }
        let (limit, offset) = page(params.limit, params.offset);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Income, expense and balance over the same filters as [`Self::list`]
    /// (pagination ignored).
    pub async fn summary(
        pool: &SqlitePool,
        params: &TransactionListParams,
    ) -> Result<TransactionSummary, sqlx::Error> {
        let (where_clause, _) = filter_clause(params);
        let query = format!(
            "SELECT \
                COALESCE(SUM(CASE WHEN kind = '{KIND_INCOME}' THEN amount END), 0.0), \
                COALESCE(SUM(CASE WHEN kind = '{KIND_EXPENSE}' THEN amount END), 0.0), \
                COUNT(*) \
             FROM transactions {where_clause}"
        );
        let mut q = sqlx::query_as::<_, (f64, f64, i64)>(&query);
        if let Some(kind) = &params.kind {
            q = q.bind(kind);
        }
        if let Some(from) = params.from {
            q = q.bind(from);
        }
        if let Some(to) = params.to {
            q = q.bind(to);
        }
        if let Some(project_id) = params.project_id {
            q = q.bind(project_id);
        }
        let (income, expense, count) = q.fetch_one(pool).await?;
        Ok(TransactionSummary {
            income,
            expense,
            balance: income - expense,
            count,
        })
    }

    pub async fn update(
        pool: &SqlitePool,
        id: DbId,
        input: &UpdateTransaction,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let query = format!(
            "UPDATE transactions SET \
                kind = COALESCE(?2, kind), \
                amount = COALESCE(?3, amount), \
                category = COALESCE(?4, category), \
                description = COALESCE(?5, description), \
                transaction_date = COALESCE(?6, transaction_date), \
                project_id = COALESCE(?7, project_id), \
                updated_at = ?8 \
             WHERE id = ?1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .bind(&input.kind)
            .bind(input.amount)
            .bind(&input.category)
            .bind(&input.description)
            .bind(input.transaction_date)
            .bind(input.project_id)
            .bind(Utc::now())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn filter_clause(params: &TransactionListParams) -> (String, usize) {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_idx: usize = 1;

    if params.kind.is_some() {
        conditions.push(format!("kind = ?{param_idx}"));
        param_idx += 1;
    }
    if params.from.is_some() {
        conditions.push(format!("transaction_date >= ?{param_idx}"));
        param_idx += 1;
    }
    if params.to.is_some() {
        conditions.push(format!("transaction_date <= ?{param_idx}"));
        param_idx += 1;
    }
    if params.project_id.is_some() {
        conditions.push(format!("project_id = ?{param_idx}"));
        param_idx += 1;
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, param_idx)
}
