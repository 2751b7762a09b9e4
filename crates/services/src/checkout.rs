//! Cart pricing and the checkout metadata carried through the payment
//! gateway.
//!
//! The order is not written when the customer starts checkout. Instead the
//! priced cart is frozen into the checkout session's metadata and turned
//! into an order when the gateway reports the payment. Stripe caps metadata
//! values at 500 characters and 50 keys, so the cart is split into
//! `cart_0..cart_{n-1}` chunks.

use std::collections::HashMap;

use bistro_db::models::{Address, MenuItem, OrderLine, OrderType, SelectedOption};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const MAX_QUANTITY: u32 = 50;
pub const METADATA_VALUE_CHARS: usize = 500;
/// Leaves room under Stripe's 50-key limit for the scalar keys below.
pub const MAX_CART_CHUNKS: usize = 40;

pub const META_RESTAURANT_ID: &str = "restaurant_id";
pub const META_USER_ID: &str = "user_id";
pub const META_ORDER_TYPE: &str = "order_type";
pub const META_NOTES: &str = "notes";
pub const META_DELIVERY_ADDRESS: &str = "delivery_address";
pub const META_CART_CHUNKS: &str = "cart_chunks";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub options: Vec<OptionSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSelection {
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Cart is empty")]
    Empty,
    #[error("Invalid menu item id: {0}")]
    InvalidItemId(String),
    #[error("Menu item {0} not found")]
    UnknownItem(String),
    #[error("{0} is currently unavailable")]
    Unavailable(String),
    #[error("Quantity for {0} must be between 1 and {MAX_QUANTITY}")]
    Quantity(String),
    #[error("{item}: unknown option \"{question}\"")]
    UnknownOption { item: String, question: String },
    #[error("{item}: \"{choice}\" is not a choice for \"{question}\"")]
    UnknownChoice {
        item: String,
        question: String,
        choice: String,
    },
    #[error("{item}: \"{question}\" requires a choice")]
    MissingChoice { item: String, question: String },
    #[error("{item}: \"{question}\" allows a single choice")]
    TooManyChoices { item: String, question: String },
    #[error("A delivery address is required for delivery orders")]
    MissingAddress,
    #[error("Cart is too large to check out")]
    TooLarge,
    #[error("Malformed checkout metadata: {0}")]
    Metadata(String),
}

/// Validates one cart line against its menu item and freezes the price.
pub fn price_line(item: &MenuItem, line: &CartLine) -> Result<OrderLine, CartError> {
    let item_id = item
        .id
        .ok_or_else(|| CartError::UnknownItem(line.menu_item_id.clone()))?;

    if !item.available {
        return Err(CartError::Unavailable(item.name.clone()));
    }
    if line.quantity == 0 || line.quantity > MAX_QUANTITY {
        return Err(CartError::Quantity(item.name.clone()));
    }

    for selection in &line.options {
        if !item.option_groups.iter().any(|g| g.question == selection.question) {
            return Err(CartError::UnknownOption {
                item: item.name.clone(),
                question: selection.question.clone(),
            });
        }
    }

    let mut options = Vec::new();
    for group in &item.option_groups {
        let mut picked: Vec<&str> = line
            .options
            .iter()
            .filter(|s| s.question == group.question)
            .flat_map(|s| s.choices.iter().map(String::as_str))
            .collect();
        picked.sort_unstable();
        picked.dedup();

        if group.required && picked.is_empty() {
            return Err(CartError::MissingChoice {
                item: item.name.clone(),
                question: group.question.clone(),
            });
        }
        if !group.extra && picked.len() > 1 {
            return Err(CartError::TooManyChoices {
                item: item.name.clone(),
                question: group.question.clone(),
            });
        }

        // Keep the menu's own choice order in the snapshot.
        for choice in &group.choices {
            if picked.contains(&choice.name.as_str()) {
                options.push(SelectedOption {
                    question: group.question.clone(),
                    choice: choice.name.clone(),
                    price_cents: choice.price_cents,
                });
            }
        }
        if let Some(unknown) = picked
            .iter()
            .find(|name| !group.choices.iter().any(|c| c.name == **name))
        {
            return Err(CartError::UnknownChoice {
                item: item.name.clone(),
                question: group.question.clone(),
                choice: unknown.to_string(),
            });
        }
    }

    let unit_price_cents = options
        .iter()
        .try_fold(item.price_cents, |acc, o| acc.checked_add(o.price_cents))
        .ok_or(CartError::TooLarge)?;
    let line_total_cents = unit_price_cents
        .checked_mul(i64::from(line.quantity))
        .ok_or(CartError::TooLarge)?;

    Ok(OrderLine {
        menu_item_id: item_id,
        name: item.name.clone(),
        quantity: line.quantity,
        unit_price_cents,
        options,
        line_total_cents,
    })
}

pub fn subtotal(lines: &[OrderLine]) -> i64 {
    lines.iter().map(|l| l.line_total_cents).sum()
}

/// Everything needed to rebuild the order once the payment lands.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutMetadata {
    pub restaurant_id: ObjectId,
    pub user_id: Option<ObjectId>,
    pub order_type: OrderType,
    pub notes: Option<String>,
    pub delivery_address: Option<Address>,
    pub lines: Vec<OrderLine>,
}

#[derive(Serialize, Deserialize)]
struct CompactLine {
    #[serde(rename = "i")]
    id: String,
    #[serde(rename = "n")]
    name: String,
    #[serde(rename = "q")]
    quantity: u32,
    #[serde(rename = "p")]
    unit_price_cents: i64,
    #[serde(rename = "o", default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<(String, String, i64)>,
}

impl CheckoutMetadata {
    pub fn encode(&self) -> Result<Vec<(String, String)>, CartError> {
        if self.lines.is_empty() {
            return Err(CartError::Empty);
        }

        let mut pairs = vec![
            (META_RESTAURANT_ID.to_string(), self.restaurant_id.to_hex()),
            (META_ORDER_TYPE.to_string(), self.order_type.as_str().to_string()),
        ];
        if let Some(user_id) = self.user_id {
            pairs.push((META_USER_ID.to_string(), user_id.to_hex()));
        }
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.is_empty()) {
            pairs.push((META_NOTES.to_string(), notes.to_string()));
        }
        if let Some(address) = &self.delivery_address {
            let json = serde_json::to_string(address)
                .map_err(|e| CartError::Metadata(e.to_string()))?;
            pairs.push((META_DELIVERY_ADDRESS.to_string(), json));
        }
        if pairs.iter().any(|(_, v)| v.chars().count() > METADATA_VALUE_CHARS) {
            return Err(CartError::TooLarge);
        }

        let compact: Vec<CompactLine> = self
            .lines
            .iter()
            .map(|l| CompactLine {
                id: l.menu_item_id.to_hex(),
                name: l.name.clone(),
                quantity: l.quantity,
                unit_price_cents: l.unit_price_cents,
                options: l
                    .options
                    .iter()
                    .map(|o| (o.question.clone(), o.choice.clone(), o.price_cents))
                    .collect(),
            })
            .collect();
        let json = serde_json::to_string(&compact).map_err(|e| CartError::Metadata(e.to_string()))?;

        let chars: Vec<char> = json.chars().collect();
        let chunks: Vec<String> = chars
            .chunks(METADATA_VALUE_CHARS)
            .map(|c| c.iter().collect())
            .collect();
        if chunks.len() > MAX_CART_CHUNKS {
            return Err(CartError::TooLarge);
        }

        pairs.push((META_CART_CHUNKS.to_string(), chunks.len().to_string()));
        pairs.extend(
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| (format!("cart_{i}"), chunk)),
        );
        Ok(pairs)
    }

    pub fn decode(metadata: &HashMap<String, String>) -> Result<Self, CartError> {
        let get = |key: &str| {
            metadata
                .get(key)
                .ok_or_else(|| CartError::Metadata(format!("missing {key}")))
        };

        let restaurant_id = ObjectId::parse_str(get(META_RESTAURANT_ID)?)
            .map_err(|_| CartError::Metadata("invalid restaurant_id".to_string()))?;
        let user_id = metadata
            .get(META_USER_ID)
            .map(|id| ObjectId::parse_str(id))
            .transpose()
            .map_err(|_| CartError::Metadata("invalid user_id".to_string()))?;
        let order_type = match get(META_ORDER_TYPE)?.as_str() {
            "pickup" => OrderType::Pickup,
            "delivery" => OrderType::Delivery,
            other => return Err(CartError::Metadata(format!("unknown order_type {other}"))),
        };
        let delivery_address = metadata
            .get(META_DELIVERY_ADDRESS)
            .map(|json| serde_json::from_str::<Address>(json))
            .transpose()
            .map_err(|e| CartError::Metadata(format!("delivery_address: {e}")))?;

        let chunk_count: usize = get(META_CART_CHUNKS)?
            .parse()
            .map_err(|_| CartError::Metadata("invalid cart_chunks".to_string()))?;
        if chunk_count == 0 || chunk_count > MAX_CART_CHUNKS {
            return Err(CartError::Metadata(format!("cart_chunks out of range: {chunk_count}")));
        }
        let mut json = String::new();
        for i in 0..chunk_count {
            json.push_str(get(&format!("cart_{i}"))?);
        }

        let compact: Vec<CompactLine> =
            serde_json::from_str(&json).map_err(|e| CartError::Metadata(format!("cart: {e}")))?;
        if compact.is_empty() {
            return Err(CartError::Empty);
        }

        let lines = compact
            .into_iter()
            .map(|c| {
                let menu_item_id = ObjectId::parse_str(&c.id)
                    .map_err(|_| CartError::Metadata(format!("invalid item id {}", c.id)))?;
                if c.quantity == 0 {
                    return Err(CartError::Metadata(format!("zero quantity for {}", c.name)));
                }
                Ok(OrderLine {
                    menu_item_id,
                    line_total_cents: c.unit_price_cents * i64::from(c.quantity),
                    name: c.name,
                    quantity: c.quantity,
                    unit_price_cents: c.unit_price_cents,
                    options: c
                        .options
                        .into_iter()
                        .map(|(question, choice, price_cents)| SelectedOption {
                            question,
                            choice,
                            price_cents,
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            restaurant_id,
            user_id,
            order_type,
            notes: metadata.get(META_NOTES).cloned(),
            delivery_address,
            lines,
        })
    }
}
