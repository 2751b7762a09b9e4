use std::collections::HashMap;

use axum::extract::State;
use bistro_db::models::{Address, OrderType};
use bistro_services::checkout::{self, CartError, CartLine, CheckoutMetadata, METADATA_VALUE_CHARS};
use bistro_services::stripe::{CheckoutConfig, CheckoutResponse};
use bson::oid::ObjectId;
use serde::Deserialize;
use tracing::info;

use super::parse_oid;
use crate::extractors::Json;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

const MAX_CART_LINES: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub order_type: OrderType,
    pub notes: Option<String>,
    pub delivery_address: Option<Address>,
    /// A saved address of the user, used when `delivery_address` is absent.
    pub address_id: Option<String>,
}

pub async fn config(State(state): State<AppState>) -> Json<CheckoutConfig> {
    Json(state.stripe.config())
}

/// Prices the cart against the live menu and opens a Stripe Checkout
/// Session. The order itself is written by the payment webhook.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let restaurant_id = state.restaurant_id()?;

    if body.items.is_empty() {
        return Err(CartError::Empty.into());
    }
    if body.items.len() > MAX_CART_LINES {
        return Err(CartError::TooLarge.into());
    }

    let ids = body
        .items
        .iter()
        .map(|line| {
            ObjectId::parse_str(&line.menu_item_id)
                .map_err(|_| CartError::InvalidItemId(line.menu_item_id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let menu: HashMap<ObjectId, _> = state
        .menu
        .find_items(restaurant_id, &ids)
        .await?
        .into_iter()
        .filter_map(|item| item.id.map(|id| (id, item)))
        .collect();

    let lines = body
        .items
        .iter()
        .zip(&ids)
        .map(|(line, id)| {
            let item = menu
                .get(id)
                .ok_or_else(|| CartError::UnknownItem(line.menu_item_id.clone()))?;
            checkout::price_line(item, line)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let delivery_address = match body.order_type {
        OrderType::Pickup => None,
        OrderType::Delivery => {
            let address = match (body.delivery_address, body.address_id) {
                (Some(address), _) => Some(address),
                (None, Some(address_id)) => {
                    let address_id = parse_oid(&address_id, "address id")?;
                    state
                        .users
                        .find_active(auth.user_id)
                        .await?
                        .addresses
                        .into_iter()
                        .find(|a| a.id == address_id)
                        .map(|a| a.address)
                }
                (None, None) => None,
            };
            Some(
                address
                    .filter(Address::is_complete)
                    .ok_or(CartError::MissingAddress)?,
            )
        }
    };

    let notes = body
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > METADATA_VALUE_CHARS)
    {
        return Err(ApiError::Validation(format!(
            "Notes are limited to {METADATA_VALUE_CHARS} characters"
        )));
    }

    let cart = CheckoutMetadata {
        restaurant_id,
        user_id: Some(auth.user_id),
        order_type: body.order_type,
        notes,
        delivery_address,
        lines,
    };

    let base = state.settings.app.public_url.trim_end_matches('/');
    let success_url = format!("{base}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}");
    let cancel_url = format!("{base}/checkout/cancel");

    let session = state
        .stripe
        .create_checkout_session(&cart, &auth.email, &success_url, &cancel_url)
        .await?;

    info!(
        user_id = %auth.user_id,
        session_id = %session.id,
        subtotal_cents = checkout::subtotal(&cart.lines),
        "Checkout started"
    );
    Ok(Json(session))
}
