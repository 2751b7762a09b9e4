use bistro_db::models::{Address, SavedAddress, User};
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        display_name: String,
        phone: Option<String>,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email: email.trim().to_lowercase(),
            display_name,
            phone,
            password_hash: Some(password_hash),
            addresses: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.trim().to_lowercase(), "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_active(&self, user_id: ObjectId) -> DaoResult<User> {
        self.base
            .find_one(doc! { "_id": user_id, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_many_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base
            .find_many(doc! { "_id": { "$in": ids } }, None)
            .await
    }

    pub async fn update_profile(
        &self,
        user_id: ObjectId,
        display_name: Option<String>,
        phone: Option<String>,
    ) -> DaoResult<User> {
        let mut update = bson::Document::new();
        if let Some(name) = display_name {
            update.insert("display_name", name);
        }
        if let Some(phone) = phone {
            update.insert("phone", phone);
        }

        if !update.is_empty() {
            self.base
                .update_by_id(user_id, doc! { "$set": update })
                .await?;
        }
        self.find_active(user_id).await
    }

    pub async fn add_address(
        &self,
        user_id: ObjectId,
        label: Option<String>,
        address: Address,
    ) -> DaoResult<SavedAddress> {
        let saved = SavedAddress {
            id: ObjectId::new(),
            label,
            address,
        };
        let matched = self
            .base
            .update_by_id(
                user_id,
                doc! { "$push": { "addresses": bson::to_bson(&saved)? } },
            )
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        Ok(saved)
    }

    pub async fn remove_address(&self, user_id: ObjectId, address_id: ObjectId) -> DaoResult<()> {
        let matched = self
            .base
            .update_one(
                doc! { "_id": user_id, "addresses.id": address_id },
                doc! { "$pull": { "addresses": { "id": address_id } } },
            )
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }
}
