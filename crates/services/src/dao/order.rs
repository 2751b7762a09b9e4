use bistro_db::models::{Order, OrderStatus, PaymentStatus};
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use mongodb::options::ReturnDocument;
use tracing::info;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};

/// Unambiguous alphabet for counter codes (no 0/O, 1/I).
const CODE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

pub fn order_code() -> String {
    nanoid::nanoid!(6, &CODE_ALPHABET)
}

#[derive(Debug)]
pub enum Recorded {
    Created(Order),
    Existing(Order),
}

pub struct OrderDao {
    pub base: BaseDao<Order>,
}

impl OrderDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Order::COLLECTION),
        }
    }

    pub async fn get(&self, restaurant_id: ObjectId, id: ObjectId) -> DaoResult<Order> {
        self.base.find_by_id_in_restaurant(restaurant_id, id).await
    }

    pub async fn find_by_transaction_id(&self, transaction_id: &str) -> DaoResult<Option<Order>> {
        self.base
            .find_one(doc! { "payment.transaction_id": transaction_id })
            .await
    }

    /// Inserts the order unless one already exists for the same payment.
    /// The unique index on `payment.transaction_id` settles races between
    /// concurrent deliveries of the same gateway event.
    pub async fn record(&self, mut order: Order) -> DaoResult<Recorded> {
        match self.base.insert_one(&order).await {
            Ok(id) => {
                order.id = Some(id);
                info!(
                    order_id = %id,
                    code = %order.code,
                    transaction_id = %order.payment.transaction_id,
                    total_cents = order.total_cents,
                    "Order recorded"
                );
                Ok(Recorded::Created(order))
            }
            Err(DaoError::DuplicateKey(_)) => {
                let existing = self
                    .find_by_transaction_id(&order.payment.transaction_id)
                    .await?
                    .ok_or(DaoError::NotFound)?;
                Ok(Recorded::Existing(existing))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list(
        &self,
        restaurant_id: ObjectId,
        status: Option<OrderStatus>,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Order>> {
        let mut filter = doc! { "restaurant_id": restaurant_id };
        if let Some(status) = status {
            filter.insert("status", status.as_str());
        }
        self.base
            .find_paginated(filter, Some(doc! { "created_at": -1 }), params)
            .await
    }

    pub async fn list_for_user(
        &self,
        restaurant_id: ObjectId,
        user_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Order>> {
        self.base
            .find_paginated(
                doc! { "restaurant_id": restaurant_id, "user_id": user_id },
                Some(doc! { "created_at": -1 }),
                params,
            )
            .await
    }

    pub async fn set_status(
        &self,
        restaurant_id: ObjectId,
        id: ObjectId,
        status: OrderStatus,
        handled_by: ObjectId,
    ) -> DaoResult<Order> {
        let order = self
            .base
            .collection()
            .find_one_and_update(
                doc! { "_id": id, "restaurant_id": restaurant_id },
                doc! {
                    "$set": {
                        "status": status.as_str(),
                        "handled_by": handled_by,
                        "updated_at": DateTime::now(),
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(DaoError::NotFound)?;

        info!(order_id = %id, %status, %handled_by, "Order status updated");
        Ok(order)
    }

    /// Customer-side cancellation. Only a pending order of the caller can be
    /// cancelled.
    pub async fn cancel_pending(
        &self,
        restaurant_id: ObjectId,
        id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Order> {
        let owned = doc! { "_id": id, "restaurant_id": restaurant_id, "user_id": user_id };

        let mut filter = owned.clone();
        filter.insert("status", OrderStatus::Pending.as_str());
        let cancelled = self
            .base
            .collection()
            .find_one_and_update(
                filter,
                doc! {
                    "$set": {
                        "status": OrderStatus::CancelledByUser.as_str(),
                        "updated_at": DateTime::now(),
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await?;

        match cancelled {
            Some(order) => {
                info!(order_id = %id, %user_id, "Order cancelled by customer");
                Ok(order)
            }
            None => match self.base.find_one(owned).await? {
                Some(order) => Err(DaoError::Conflict(format!(
                    "Order is {} and can no longer be cancelled",
                    order.status
                ))),
                None => Err(DaoError::NotFound),
            },
        }
    }

    /// Returns whether an order with this payment exists.
    pub async fn set_payment_status(
        &self,
        transaction_id: &str,
        status: PaymentStatus,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "payment.transaction_id": transaction_id },
                doc! { "$set": { "payment.status": bson::to_bson(&status)? } },
            )
            .await
    }
}
