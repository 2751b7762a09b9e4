use std::collections::HashMap;

use bistro_config::StripeSettings;
use bistro_db::models::{CustomerInfo, Order, OrderStatus, PaymentInfo, PaymentStatus};
use bson::{oid::ObjectId, DateTime};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use crate::checkout::{self, CartError, CheckoutMetadata, META_RESTAURANT_ID};
use crate::dao::base::DaoError;
use crate::dao::order::{OrderDao, Recorded, order_code};
use crate::dao::user::UserDao;

pub const EVENT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const EVENT_ASYNC_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const EVENT_ASYNC_FAILED: &str = "checkout.session.async_payment_failed";

// ---- Response / DTO types ------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutConfig {
    pub publishable_key: String,
    pub currency: String,
}

// ---- Stripe webhook event (minimal deserialization) ----------------------

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// The subset of a Checkout Session object the webhook needs.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub payment_status: Option<String>,
    pub amount_subtotal: Option<i64>,
    pub amount_total: Option<i64>,
    pub total_details: Option<TotalDetails>,
    pub customer_details: Option<CustomerDetails>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TotalDetails {
    pub amount_discount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug)]
pub enum WebhookOutcome {
    OrderCreated(Order),
    AlreadyRecorded,
    PaymentUpdated,
    Ignored,
}

// ---- Error type ----------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Stripe API error: {0}")]
    ApiError(String),
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Dao(#[from] DaoError),
}

// ---- Service -------------------------------------------------------------

pub struct StripeService {
    settings: StripeSettings,
    client: reqwest::Client,
}

impl StripeService {
    pub fn new(settings: &StripeSettings) -> Self {
        Self {
            settings: settings.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> CheckoutConfig {
        CheckoutConfig {
            publishable_key: self.settings.publishable_key.clone(),
            currency: self.settings.currency.clone(),
        }
    }

    pub fn webhook_secret(&self) -> &str {
        &self.settings.webhook_secret
    }

    pub fn webhook_tolerance_secs(&self) -> i64 {
        self.settings.webhook_tolerance_secs
    }

    // ---- Checkout --------------------------------------------------------

    /// Creates a hosted Checkout Session. Nothing is stored locally; the
    /// order is written when the payment webhook arrives.
    pub async fn create_checkout_session(
        &self,
        cart: &CheckoutMetadata,
        email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutResponse, StripeError> {
        let mut params = self.checkout_params(cart, email)?;
        params.push(("success_url".into(), success_url.to_string()));
        params.push(("cancel_url".into(), cancel_url.to_string()));

        let resp: serde_json::Value = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.settings.api_base))
            .basic_auth(&self.settings.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| StripeError::ApiError(e.to_string()))?
            .json()
            .await
            .map_err(|e| StripeError::ApiError(e.to_string()))?;

        if let Some(err) = resp.get("error") {
            return Err(StripeError::ApiError(
                err["message"]
                    .as_str()
                    .unwrap_or("Unknown Stripe error")
                    .to_string(),
            ));
        }

        let id = resp["id"]
            .as_str()
            .ok_or_else(|| StripeError::ApiError("No session id in response".to_string()))?
            .to_string();
        let url = resp["url"]
            .as_str()
            .ok_or_else(|| StripeError::ApiError("No checkout URL in response".to_string()))?
            .to_string();

        info!(session_id = %id, lines = cart.lines.len(), "Created Stripe checkout session");
        Ok(CheckoutResponse { id, url })
    }

    fn checkout_params(
        &self,
        cart: &CheckoutMetadata,
        email: &str,
    ) -> Result<Vec<(String, String)>, StripeError> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("allow_promotion_codes".into(), "true".into()),
            ("customer_email".into(), email.to_string()),
        ];
        if let Some(user_id) = cart.user_id {
            params.push(("client_reference_id".into(), user_id.to_hex()));
        }

        for (i, line) in cart.lines.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            let mut name = line.name.clone();
            if !line.options.is_empty() {
                let chosen: Vec<&str> = line.options.iter().map(|o| o.choice.as_str()).collect();
                name = format!("{name} ({})", chosen.join(", "));
            }
            params.push((
                format!("{prefix}[price_data][currency]"),
                self.settings.currency.clone(),
            ));
            params.push((format!("{prefix}[price_data][product_data][name]"), name));
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                line.unit_price_cents.to_string(),
            ));
            params.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
        }

        for (key, value) in cart.encode()? {
            params.push((format!("metadata[{key}]"), value));
        }
        Ok(params)
    }

    // ---- Webhook processing ----------------------------------------------

    /// Verify the Stripe webhook signature using HMAC-SHA256.
    ///
    /// The header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`. The signed
    /// payload is `"{t}.{body}"`, and `t` must be within `tolerance_secs` of
    /// `now`.
    pub fn verify_signature(
        webhook_secret: &str,
        payload: &[u8],
        sig_header: &str,
        tolerance_secs: i64,
        now: i64,
    ) -> Result<(), StripeError> {
        let mut timestamp = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in sig_header.split(',') {
            let part = part.trim();
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(v1) = part.strip_prefix("v1=") {
                signatures.push(v1);
            }
        }

        let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
        let issued_at: i64 = timestamp.parse().map_err(|_| StripeError::InvalidSignature)?;
        if signatures.is_empty() || now.abs_diff(issued_at) > tolerance_secs.unsigned_abs() {
            return Err(StripeError::InvalidSignature);
        }

        let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
            .map_err(|_| StripeError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let valid = signatures.iter().any(|sig| {
            hex::decode(sig)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if valid {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle a verified webhook event. Safe to call repeatedly with the
    /// same event.
    pub async fn handle_webhook_event(
        &self,
        restaurant_id: ObjectId,
        orders: &OrderDao,
        users: &UserDao,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, StripeError> {
        match event.event_type.as_str() {
            EVENT_SESSION_COMPLETED | EVENT_ASYNC_SUCCEEDED => {
                let session = parse_session(event)?;
                let async_success = event.event_type == EVENT_ASYNC_SUCCEEDED;

                if let Some(existing) = orders.find_by_transaction_id(&session.id).await? {
                    if async_success && existing.payment.status != PaymentStatus::Paid {
                        orders
                            .set_payment_status(&session.id, PaymentStatus::Paid)
                            .await?;
                        info!(session_id = %session.id, "Delayed payment succeeded");
                        return Ok(WebhookOutcome::PaymentUpdated);
                    }
                    info!(event_id = %event.id, session_id = %session.id, "Order already recorded");
                    return Ok(WebhookOutcome::AlreadyRecorded);
                }

                if !session.metadata.contains_key(META_RESTAURANT_ID) {
                    info!(session_id = %session.id, "Checkout session without restaurant metadata");
                    return Ok(WebhookOutcome::Ignored);
                }
                let cart = CheckoutMetadata::decode(&session.metadata)?;
                if cart.restaurant_id != restaurant_id {
                    warn!(
                        session_id = %session.id,
                        restaurant_id = %cart.restaurant_id,
                        "Checkout session belongs to another restaurant"
                    );
                    return Ok(WebhookOutcome::Ignored);
                }

                let payment_status = if async_success {
                    PaymentStatus::Paid
                } else {
                    payment_status_of(&session)
                };
                let customer = customer_info(users, cart.user_id, &session).await?;
                let order = build_order(&session, cart, customer, payment_status);

                match orders.record(order).await? {
                    Recorded::Created(order) => Ok(WebhookOutcome::OrderCreated(order)),
                    Recorded::Existing(_) => {
                        info!(session_id = %session.id, "Concurrent delivery already recorded the order");
                        Ok(WebhookOutcome::AlreadyRecorded)
                    }
                }
            }

            EVENT_ASYNC_FAILED => {
                let session = parse_session(event)?;
                if orders
                    .set_payment_status(&session.id, PaymentStatus::Failed)
                    .await?
                {
                    warn!(session_id = %session.id, "Delayed payment failed");
                    Ok(WebhookOutcome::PaymentUpdated)
                } else {
                    warn!(session_id = %session.id, "Payment failure for unknown checkout session");
                    Ok(WebhookOutcome::Ignored)
                }
            }

            other => {
                info!(event_type = %other, event_id = %event.id, "Unhandled Stripe webhook event");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }
}

fn parse_session(event: &StripeEvent) -> Result<CheckoutSession, StripeError> {
    serde_json::from_value(event.data.object.clone())
        .map_err(|e| StripeError::InvalidPayload(e.to_string()))
}

/// `unpaid` means a delayed method (bank debit) is still settling.
fn payment_status_of(session: &CheckoutSession) -> PaymentStatus {
    match session.payment_status.as_deref() {
        Some("unpaid") => PaymentStatus::Pending,
        _ => PaymentStatus::Paid,
    }
}

async fn customer_info(
    users: &UserDao,
    user_id: Option<ObjectId>,
    session: &CheckoutSession,
) -> Result<CustomerInfo, StripeError> {
    if let Some(user_id) = user_id {
        match users.find_active(user_id).await {
            Ok(user) => {
                return Ok(CustomerInfo {
                    name: user.display_name,
                    email: user.email,
                    phone: user.phone,
                });
            }
            Err(DaoError::NotFound) => {
                warn!(%user_id, "Checkout user no longer exists, using gateway details");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let details = session.customer_details.as_ref();
    Ok(CustomerInfo {
        name: details.and_then(|d| d.name.clone()).unwrap_or_default(),
        email: details
            .and_then(|d| d.email.clone())
            .or_else(|| session.customer_email.clone())
            .unwrap_or_default(),
        phone: details.and_then(|d| d.phone.clone()),
    })
}

fn build_order(
    session: &CheckoutSession,
    cart: CheckoutMetadata,
    customer: CustomerInfo,
    payment_status: PaymentStatus,
) -> Order {
    let cart_subtotal = checkout::subtotal(&cart.lines);
    let subtotal_cents = session.amount_subtotal.unwrap_or(cart_subtotal);
    let discount_cents = session
        .total_details
        .as_ref()
        .and_then(|t| t.amount_discount)
        .unwrap_or(0);
    let total_cents = session
        .amount_total
        .unwrap_or(subtotal_cents - discount_cents);

    let now = DateTime::now();
    Order {
        id: None,
        restaurant_id: cart.restaurant_id,
        user_id: cart.user_id,
        code: order_code(),
        customer,
        items: cart.lines,
        subtotal_cents,
        discount_cents,
        total_cents,
        status: OrderStatus::Pending,
        order_type: cart.order_type,
        delivery_address: cart.delivery_address,
        payment: PaymentInfo {
            method: "stripe".to_string(),
            status: payment_status,
            transaction_id: session.id.clone(),
        },
        notes: cart.notes,
        handled_by: None,
        created_at: now,
        updated_at: now,
    }
}
