use bistro_db::models::{RestaurantUser, Role};
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams, map_write_error};

pub struct RestaurantUserDao {
    pub base: BaseDao<RestaurantUser>,
}

impl RestaurantUserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, RestaurantUser::COLLECTION),
        }
    }

    /// Creates the record if missing. An existing role is left alone.
    pub async fn ensure(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
        role: Role,
    ) -> DaoResult<RestaurantUser> {
        // Equality fields of the filter are copied into an upserted document.
        let now = DateTime::now();
        let upserted = self
            .base
            .collection()
            .update_one(
                doc! { "restaurant_id": restaurant_id, "user_id": user_id },
                doc! {
                    "$setOnInsert": {
                        "role": bson::to_bson(&role)?,
                        "liked_item_ids": [],
                        "created_at": now,
                        "updated_at": now,
                    }
                },
            )
            .upsert(true)
            .await
            .map_err(map_write_error);
        match upserted {
            // A concurrent upsert won the unique index race
            Ok(_) | Err(DaoError::DuplicateKey(_)) => {}
            Err(e) => return Err(e),
        }

        self.find(restaurant_id, user_id)
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Option<RestaurantUser>> {
        self.base
            .find_one(doc! { "restaurant_id": restaurant_id, "user_id": user_id })
            .await
    }

    /// Users without a record are plain customers.
    pub async fn role_of(&self, restaurant_id: ObjectId, user_id: ObjectId) -> DaoResult<Role> {
        Ok(self
            .find(restaurant_id, user_id)
            .await?
            .map(|ru| ru.role)
            .unwrap_or_default())
    }

    pub async fn set_role(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
        role: Role,
    ) -> DaoResult<RestaurantUser> {
        self.ensure(restaurant_id, user_id, role).await?;
        self.base
            .update_one(
                doc! { "restaurant_id": restaurant_id, "user_id": user_id },
                doc! { "$set": { "role": bson::to_bson(&role)? } },
            )
            .await?;
        self.find(restaurant_id, user_id)
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn list(
        &self,
        restaurant_id: ObjectId,
        role: Option<Role>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<RestaurantUser>> {
        let mut filter = doc! { "restaurant_id": restaurant_id };
        if let Some(role) = role {
            filter.insert("role", bson::to_bson(&role)?);
        }
        self.base
            .find_paginated(filter, Some(doc! { "created_at": 1 }), params)
            .await
    }

    pub async fn liked_item_ids(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Vec<ObjectId>> {
        Ok(self
            .find(restaurant_id, user_id)
            .await?
            .map(|ru| ru.liked_item_ids)
            .unwrap_or_default())
    }

    pub async fn like(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
        item_id: ObjectId,
    ) -> DaoResult<()> {
        self.ensure(restaurant_id, user_id, Role::Customer).await?;
        self.base
            .update_one(
                doc! { "restaurant_id": restaurant_id, "user_id": user_id },
                doc! { "$addToSet": { "liked_item_ids": item_id } },
            )
            .await?;
        Ok(())
    }

    pub async fn unlike(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
        item_id: ObjectId,
    ) -> DaoResult<()> {
        self.base
            .update_one(
                doc! { "restaurant_id": restaurant_id, "user_id": user_id },
                doc! { "$pull": { "liked_item_ids": item_id } },
            )
            .await?;
        Ok(())
    }
}
