use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::address::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub address: Address,
    /// Ordered category list. Each entry indexes the menu items that point
    /// at it through `MenuItem::category_id`.
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub site: SiteContent,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub item_ids: Vec<ObjectId>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            item_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    pub id: ObjectId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteContent {
    pub tagline: Option<String>,
    pub about: Option<String>,
    pub hero_image: Option<String>,
    #[serde(default)]
    pub gallery: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningHours {
    pub day: Weekday,
    /// "HH:MM", local time.
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Restaurant {
    pub const COLLECTION: &'static str = "restaurants";

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }
}
