use axum::extract::{Query, State};
use bistro_services::reviews::PlaceDetails;
use serde::Deserialize;

use crate::extractors::Json;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub language: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ReviewsQuery>,
) -> Result<Json<PlaceDetails>, ApiError> {
    let reviews = state
        .reviews
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("Reviews not configured".to_string()))?;

    let details = reviews
        .fetch(params.language.as_deref())
        .await
        .map_err(|e| ApiError::Internal(format!("Places API error: {e}")))?;

    Ok(Json(details))
}
