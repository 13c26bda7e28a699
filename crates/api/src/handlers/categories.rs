//! Request categories. Read-only; the list is seeded by migration.

use axum::extract::State;
use axum::Json;
use kehila_db::models::category::Category;
use kehila_db::repositories::CategoryRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/categories -- active categories in display order. Public.
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Category>>>> {
    let categories = CategoryRepo::list_active(&state.pool).await?;
    Ok(Json(DataResponse { data: categories }))
}
