//! Budget transaction model and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use kehila_core::types::{DbId, Timestamp};

pub const KIND_INCOME: &str = "income";
pub const KIND_EXPENSE: &str = "expense";

/// A row from the `transactions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: DbId,
    pub kind: String,
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub project_id: Option<DbId>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransaction {
    pub kind: String,
    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub project_id: Option<DbId>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTransaction {
    pub kind: Option<String>,
    #[validate(range(min = 0.0, message = "Amount must not be negative"))]
    pub amount: Option<f64>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub project_id: Option<DbId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    pub kind: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub project_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Totals returned by `GET /transactions/summary`.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub count: i64,
}

/// Validate a transaction kind string.
pub fn is_valid_kind(kind: &str) -> bool {
    kind == KIND_INCOME || kind == KIND_EXPENSE
}
