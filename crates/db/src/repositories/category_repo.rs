//! Repository for the `categories` lookup table.

use sqlx::{SqliteExecutor, SqlitePool};

use crate::models::category::Category;

const COLUMNS: &str = "id, slug, name, is_active, sort_order";

pub struct CategoryRepo;

impl CategoryRepo {
    /// Active categories in display order.
    pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM categories WHERE is_active = 1 ORDER BY sort_order, slug"
        );
        sqlx::query_as::<_, Category>(&query).fetch_all(pool).await
    }

    pub async fn find_active_by_slug<'e, E: SqliteExecutor<'e>>(
        executor: E,
        slug: &str,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE slug = ?1 AND is_active = 1");
        sqlx::query_as::<_, Category>(&query)
            .bind(slug)
            .fetch_optional(executor)
            .await
    }
}
