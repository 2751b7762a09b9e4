use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::address::Address;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub addresses: Vec<SavedAddress>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: ObjectId,
    pub label: Option<String>,
    pub address: Address,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}
