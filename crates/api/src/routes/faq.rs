use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use bistro_db::models::Faq;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_oid;
use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::StaffUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFaqRequest {
    #[validate(length(min = 1, max = 300))]
    pub question: String,
    #[validate(length(min = 1, max = 4000))]
    pub answer: String,
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFaqRequest {
    #[validate(length(min = 1, max = 300))]
    pub question: Option<String>,
    #[validate(length(min = 1, max = 4000))]
    pub answer: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct FaqResponse {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub position: i32,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<FaqResponse>>, ApiError> {
    let faqs = state.restaurants.list_faqs(state.restaurant_id()?).await?;
    Ok(Json(faqs.into_iter().map(to_response).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    staff: StaffUser,
    Json(body): Json<CreateFaqRequest>,
) -> Result<(StatusCode, Json<FaqResponse>), ApiError> {
    body.validate()?;
    let faq = state
        .restaurants
        .add_faq(staff.restaurant_id, body.question, body.answer, body.position)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(faq))))
}

pub async fn update(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(faq_id): Path<String>,
    Json(body): Json<UpdateFaqRequest>,
) -> Result<Json<FaqResponse>, ApiError> {
    body.validate()?;
    let faq_id = parse_oid(&faq_id, "faq id")?;
    let faq = state
        .restaurants
        .update_faq(
            staff.restaurant_id,
            faq_id,
            body.question,
            body.answer,
            body.position,
        )
        .await?;
    Ok(Json(to_response(faq)))
}

pub async fn delete(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(faq_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let faq_id = parse_oid(&faq_id, "faq id")?;
    state.restaurants.delete_faq(staff.restaurant_id, faq_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn to_response(faq: Faq) -> FaqResponse {
    FaqResponse {
        id: faq.id.to_hex(),
        question: faq.question,
        answer: faq.answer,
        position: faq.position,
    }
}
