use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use bistro_db::models::{MenuItem, OptionGroup};
use bistro_services::dao::menu::{MenuItemInput, MenuItemPatch, MenuSection};
use serde::{Deserialize, Serialize};

use super::parse_oid;
use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::StaffUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct MenuItemResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub option_groups: Vec<OptionGroup>,
    pub available: bool,
    pub category_id: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MenuSectionResponse {
    pub category: String,
    pub items: Vec<MenuItemResponse>,
}

/// Public menu: available items grouped by category.
pub async fn public_menu(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuSectionResponse>>, ApiError> {
    let sections = state.menu.menu(state.restaurant_id()?, false).await?;
    Ok(Json(sections.into_iter().map(section_response).collect()))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let item_id = parse_oid(&item_id, "item id")?;
    let item = state.menu.get_item(state.restaurant_id()?, item_id).await?;
    Ok(Json(to_response(item)))
}

/// Staff view: every item, unavailable ones included.
pub async fn list_items(
    State(state): State<AppState>,
    staff: StaffUser,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError> {
    let items = state
        .menu
        .list_items(staff.restaurant_id, query.category.as_deref())
        .await?;
    Ok(Json(items.into_iter().map(to_response).collect()))
}

pub async fn create_item(
    State(state): State<AppState>,
    staff: StaffUser,
    Json(body): Json<MenuItemInput>,
) -> Result<(StatusCode, Json<MenuItemResponse>), ApiError> {
    let item = state.menu.create_item(staff.restaurant_id, body).await?;
    Ok((StatusCode::CREATED, Json(to_response(item))))
}

pub async fn update_item(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(item_id): Path<String>,
    Json(body): Json<MenuItemPatch>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let item_id = parse_oid(&item_id, "item id")?;
    let item = state
        .menu
        .update_item(staff.restaurant_id, item_id, body)
        .await?;
    Ok(Json(to_response(item)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item_id = parse_oid(&item_id, "item id")?;
    state.menu.delete_item(staff.restaurant_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_availability(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(item_id): Path<String>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let item_id = parse_oid(&item_id, "item id")?;
    let item = state
        .menu
        .set_availability(staff.restaurant_id, item_id, body.available)
        .await?;
    Ok(Json(to_response(item)))
}

fn section_response(section: MenuSection) -> MenuSectionResponse {
    MenuSectionResponse {
        category: section.category,
        items: section.items.into_iter().map(to_response).collect(),
    }
}

pub(crate) fn to_response(item: MenuItem) -> MenuItemResponse {
    MenuItemResponse {
        id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: item.name,
        price_cents: item.price_cents,
        description: item.description,
        image: item.image,
        option_groups: item.option_groups,
        available: item.available,
        category_id: item.category_id,
        tags: item.tags,
    }
}
