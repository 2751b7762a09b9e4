use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A user's standing within one restaurant: role plus per-restaurant
/// preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantUser {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub restaurant_id: ObjectId,
    pub user_id: ObjectId,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub liked_item_ids: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl RestaurantUser {
    pub const COLLECTION: &'static str = "restaurant_users";
}
