use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use bistro_services::stripe::{StripeEvent, StripeService, WebhookOutcome};
use tracing::{info, warn};

use crate::{error::ApiError, state::AppState};

// ---- POST /api/stripe/webhook (no auth, raw body) ------------------------

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let sig_header = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    // Verify signature
    if let Err(e) = StripeService::verify_signature(
        state.stripe.webhook_secret(),
        &body,
        sig_header,
        state.stripe.webhook_tolerance_secs(),
        chrono::Utc::now().timestamp(),
    ) {
        warn!("Rejected Stripe webhook with an invalid signature");
        return Err(e.into());
    }

    // Parse event
    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event payload: {e}")))?;

    // Process event
    let outcome = state
        .stripe
        .handle_webhook_event(
            state.restaurant_id()?,
            &state.orders,
            &state.users,
            &event,
        )
        .await?;

    if let WebhookOutcome::OrderCreated(order) = &outcome {
        info!(
            event_id = %event.id,
            code = %order.code,
            total_cents = order.total_cents,
            "Order created from checkout"
        );
    }
    Ok(StatusCode::OK)
}
