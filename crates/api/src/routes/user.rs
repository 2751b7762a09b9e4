use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use bistro_db::models::{Address, SavedAddress};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extractors::Json;
use super::{menu::MenuItemResponse, parse_oid};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct AddAddressRequest {
    #[validate(length(max = 40))]
    pub label: Option<String>,
    pub address: Address,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: String,
    pub label: Option<String>,
    pub address: Address,
}

// ---- Likes ----------------------------------------------------------------

pub async fn list_likes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError> {
    let restaurant_id = state.restaurant_id()?;
    let ids = state
        .restaurant_users
        .liked_item_ids(restaurant_id, auth.user_id)
        .await?;
    let items = state.menu.find_items(restaurant_id, &ids).await?;
    Ok(Json(items.into_iter().map(super::menu::to_response).collect()))
}

pub async fn like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let restaurant_id = state.restaurant_id()?;
    let item_id = parse_oid(&item_id, "item id")?;
    state.menu.get_item(restaurant_id, item_id).await?;
    state
        .restaurant_users
        .like(restaurant_id, auth.user_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item_id = parse_oid(&item_id, "item id")?;
    state
        .restaurant_users
        .unlike(state.restaurant_id()?, auth.user_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Addresses --------------------------------------------------------------

pub async fn list_addresses(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<AddressResponse>>, ApiError> {
    let user = state.users.find_active(auth.user_id).await?;
    Ok(Json(user.addresses.into_iter().map(to_response).collect()))
}

pub async fn add_address(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AddAddressRequest>,
) -> Result<(StatusCode, Json<AddressResponse>), ApiError> {
    body.validate()?;
    if !body.address.is_complete() {
        return Err(ApiError::Validation(
            "Address needs a street, city and postal code".to_string(),
        ));
    }
    let saved = state
        .users
        .add_address(auth.user_id, body.label, body.address)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(saved))))
}

pub async fn delete_address(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(address_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let address_id = parse_oid(&address_id, "address id")?;
    state.users.remove_address(auth.user_id, address_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn to_response(saved: SavedAddress) -> AddressResponse {
    AddressResponse {
        id: saved.id.to_hex(),
        label: saved.label,
        address: saved.address,
    }
}
