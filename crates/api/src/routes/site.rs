use axum::extract::State;
use bistro_db::models::{Address, ContactInfo, OpeningHours, Restaurant, SiteContent};
use bistro_services::dao::restaurant::RestaurantPatch;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::AdminUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub site: Option<SiteContent>,
    pub contact: Option<ContactInfo>,
    pub opening_hours: Option<Vec<OpeningHours>>,
}

#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub name: String,
    pub address: Address,
    pub site: SiteContent,
    pub contact: ContactInfo,
    pub opening_hours: Vec<OpeningHours>,
}

pub async fn get(State(state): State<AppState>) -> Result<Json<SiteResponse>, ApiError> {
    let restaurant = state.restaurants.get(state.restaurant_id()?).await?;
    Ok(Json(to_response(restaurant)))
}

pub async fn update(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<UpdateSiteRequest>,
) -> Result<Json<SiteResponse>, ApiError> {
    if let Some(name) = &body.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("Name must not be blank".to_string()));
        }
    }
    if let Some(hours) = &body.opening_hours {
        validate_hours(hours)?;
    }

    let restaurant = state
        .restaurants
        .update(
            admin.restaurant_id,
            RestaurantPatch {
                name: body.name.map(|n| n.trim().to_string()),
                address: body.address,
                site: body.site,
                contact: body.contact,
                opening_hours: body.opening_hours,
            },
        )
        .await?;
    Ok(Json(to_response(restaurant)))
}

fn validate_hours(hours: &[OpeningHours]) -> Result<(), ApiError> {
    for entry in hours.iter().filter(|h| !h.closed) {
        for value in [&entry.open, &entry.close] {
            NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
                ApiError::Validation(format!("Invalid time {value:?} for {:?}, expected HH:MM", entry.day))
            })?;
        }
    }
    Ok(())
}

fn to_response(restaurant: Restaurant) -> SiteResponse {
    SiteResponse {
        name: restaurant.name,
        address: restaurant.address,
        site: restaurant.site,
        contact: restaurant.contact,
        opening_hours: restaurant.opening_hours,
    }
}
