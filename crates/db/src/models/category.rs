//! Request category lookup rows.

use serde::Serialize;
use sqlx::FromRow;

use kehila_core::types::DbId;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub sort_order: i64,
}
