use bistro_db::models::Session;
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use tracing::debug;

use super::base::{BaseDao, DaoResult};

pub struct SessionDao {
    pub base: BaseDao<Session>,
}

impl SessionDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Session::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        jti: String,
        user_id: ObjectId,
        expires_at: chrono::DateTime<chrono::Utc>,
        user_agent: Option<String>,
    ) -> DaoResult<()> {
        let session = Session {
            id: None,
            jti,
            user_id,
            user_agent,
            expires_at: DateTime::from_chrono(expires_at),
            created_at: DateTime::now(),
        };
        self.base.insert_one(&session).await?;
        Ok(())
    }

    /// The TTL reaper runs about once a minute, so expiry is also checked
    /// here.
    pub async fn is_active(&self, jti: &str, user_id: ObjectId) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! {
                "jti": jti,
                "user_id": user_id,
                "expires_at": { "$gt": DateTime::now() },
            })
            .await?;
        Ok(count > 0)
    }

    pub async fn revoke(&self, jti: &str) -> DaoResult<bool> {
        let revoked = self.base.delete_one(doc! { "jti": jti }).await?;
        debug!(jti, revoked, "Session revoked");
        Ok(revoked)
    }
}
