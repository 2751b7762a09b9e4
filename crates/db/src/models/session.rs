use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Server-side record of an issued session cookie. Deleting it revokes the
/// cookie even before its `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub jti: String,
    pub user_id: ObjectId,
    pub user_agent: Option<String>,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}

impl Session {
    pub const COLLECTION: &'static str = "sessions";
}
