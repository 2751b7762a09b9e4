use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use bistro_services::dao::menu::CategorySummary;
use serde::Deserialize;

use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::StaffUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategorySummary>>, ApiError> {
    let categories = state.menu.list_categories(state.restaurant_id()?).await?;
    Ok(Json(categories))
}

pub async fn create(
    State(state): State<AppState>,
    staff: StaffUser,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategorySummary>), ApiError> {
    let category = state
        .menu
        .create_category(staff.restaurant_id, &body.name)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CategorySummary {
            item_count: category.item_ids.len(),
            name: category.name,
        }),
    ))
}

/// Renames the category and re-points its items.
pub async fn rename(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(name): Path<String>,
    Json(body): Json<CategoryRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .menu
        .rename_category(staff.restaurant_id, &name, &body.name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.menu.delete_category(staff.restaurant_id, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}
