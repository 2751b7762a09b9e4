use axum::extract::{Path, Query, State};
use bistro_db::models::{
    Address, CustomerInfo, Order, OrderLine, OrderStatus, OrderType, PaymentStatus, SelectedOption,
};
use bistro_services::dao::base::{PaginatedResult, PaginationParams};
use serde::{Deserialize, Serialize};

use super::parse_oid;
use crate::extractors::Json;
use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, StaffUser},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl OrderListQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// `status` stays a string so an unknown value is a 400, not a body
/// rejection.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub code: String,
    pub user_id: Option<String>,
    pub customer: CustomerInfo,
    pub items: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub delivery_address: Option<Address>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub handled_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub options: Vec<SelectedOption>,
    pub line_total_cents: i64,
}

/// Staff order queue, newest first.
pub async fn list(
    State(state): State<AppState>,
    staff: StaffUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<PaginatedResult<OrderResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;
    let orders = state
        .orders
        .list(staff.restaurant_id, status, &query.pagination())
        .await?;
    Ok(Json(orders.map(to_response)))
}

pub async fn mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<PaginatedResult<OrderResponse>>, ApiError> {
    let orders = state
        .orders
        .list_for_user(state.restaurant_id()?, auth.user_id, &query.pagination())
        .await?;
    Ok(Json(orders.map(to_response)))
}

/// Visible to the customer who placed it and to staff.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let restaurant_id = state.restaurant_id()?;
    let order_id = parse_oid(&order_id, "order id")?;
    let order = state.orders.get(restaurant_id, order_id).await?;

    if order.user_id != Some(auth.user_id) {
        let role = state
            .restaurant_users
            .role_of(restaurant_id, auth.user_id)
            .await?;
        if !role.is_staff() {
            return Err(ApiError::Forbidden("Not your order".to_string()));
        }
    }
    Ok(Json(to_response(order)))
}

pub async fn update_status(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(order_id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_oid(&order_id, "order id")?;
    let status = parse_status(&body.status)?;
    let order = state
        .orders
        .set_status(staff.restaurant_id, order_id, status, staff.user.user_id)
        .await?;
    Ok(Json(to_response(order)))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_oid(&order_id, "order id")?;
    let order = state
        .orders
        .cancel_pending(state.restaurant_id()?, order_id, auth.user_id)
        .await?;
    Ok(Json(to_response(order)))
}

fn parse_status(value: &str) -> Result<OrderStatus, ApiError> {
    value
        .parse()
        .map_err(|e: bistro_db::models::UnknownStatus| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn to_response(order: Order) -> OrderResponse {
    OrderResponse {
        id: order.id.map(|id| id.to_hex()).unwrap_or_default(),
        code: order.code,
        user_id: order.user_id.map(|id| id.to_hex()),
        customer: order.customer,
        items: order.items.into_iter().map(line_response).collect(),
        subtotal_cents: order.subtotal_cents,
        discount_cents: order.discount_cents,
        total_cents: order.total_cents,
        status: order.status,
        order_type: order.order_type,
        delivery_address: order.delivery_address,
        payment_status: order.payment.status,
        notes: order.notes,
        handled_by: order.handled_by.map(|id| id.to_hex()),
        created_at: order.created_at.to_chrono().to_rfc3339(),
        updated_at: order.updated_at.to_chrono().to_rfc3339(),
    }
}

fn line_response(line: OrderLine) -> OrderLineResponse {
    OrderLineResponse {
        menu_item_id: line.menu_item_id.to_hex(),
        name: line.name,
        quantity: line.quantity,
        unit_price_cents: line.unit_price_cents,
        options: line.options,
        line_total_cents: line.line_total_cents,
    }
}
