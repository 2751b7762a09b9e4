use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub restaurant_id: ObjectId,
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub option_groups: Vec<OptionGroup>,
    #[serde(default = "bool_true")]
    pub available: bool,
    /// Name of the owning category on the restaurant document.
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// A question asked when the item is added to the cart, e.g. "Choose a side".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionGroup {
    pub question: String,
    /// At least one choice has to be picked.
    #[serde(default)]
    pub required: bool,
    /// More than one choice may be picked.
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub choices: Vec<OptionChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionChoice {
    pub name: String,
    #[serde(default)]
    pub price_cents: i64,
}

fn bool_true() -> bool {
    true
}

impl MenuItem {
    pub const COLLECTION: &'static str = "menu_items";
}
