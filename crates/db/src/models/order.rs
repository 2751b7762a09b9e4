use std::fmt;
use std::str::FromStr;

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::address::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub restaurant_id: ObjectId,
    pub user_id: Option<ObjectId>,
    /// Short code read out at the counter.
    pub code: String,
    pub customer: CustomerInfo,
    pub items: Vec<OrderLine>,
    pub subtotal_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub delivery_address: Option<Address>,
    pub payment: PaymentInfo,
    pub notes: Option<String>,
    pub handled_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Frozen copy of a cart line at checkout time. Later menu edits do not
/// touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub menu_item_id: ObjectId,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub options: Vec<SelectedOption>,
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectedOption {
    pub question: String,
    pub choice: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    OutForDelivery,
    Delivered,
    CompletedPickup,
    CancelledByUser,
    RejectedByRestaurant,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::ReadyForPickup,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::CompletedPickup,
        OrderStatus::CancelledByUser,
        OrderStatus::RejectedByRestaurant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::CompletedPickup => "completed_pickup",
            OrderStatus::CancelledByUser => "cancelled_by_user",
            OrderStatus::RejectedByRestaurant => "rejected_by_restaurant",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Pickup,
    Delivery,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Pickup => "pickup",
            OrderType::Delivery => "delivery",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    pub status: PaymentStatus,
    /// Gateway-side id (Stripe checkout session id). Unique per order.
    pub transaction_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Order {
    pub const COLLECTION: &'static str = "orders";
}
