use std::time::Duration;

use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{MenuItem, Order, RestaurantUser, Session, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Per-restaurant roles
    create_indexes(
        db,
        RestaurantUser::COLLECTION,
        vec![
            index_unique(bson::doc! { "restaurant_id": 1, "user_id": 1 }),
            index(bson::doc! { "restaurant_id": 1, "role": 1 }),
        ],
    )
    .await?;

    // Sessions: the TTL index reaps expired cookies
    create_indexes(
        db,
        Session::COLLECTION,
        vec![
            index_unique(bson::doc! { "jti": 1 }),
            index(bson::doc! { "user_id": 1 }),
            IndexModel::builder()
                .keys(bson::doc! { "expires_at": 1 })
                .options(
                    IndexOptions::builder()
                        .expire_after(Duration::from_secs(0))
                        .build(),
                )
                .build(),
        ],
    )
    .await?;

    // Menu items
    create_indexes(
        db,
        MenuItem::COLLECTION,
        vec![
            index(bson::doc! { "restaurant_id": 1, "category_id": 1 }),
            index(bson::doc! { "restaurant_id": 1, "available": 1 }),
        ],
    )
    .await?;

    // Orders: one order per checkout session
    create_indexes(
        db,
        Order::COLLECTION,
        vec![
            index_unique(bson::doc! { "payment.transaction_id": 1 }),
            index(bson::doc! { "restaurant_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "restaurant_id": 1, "user_id": 1, "created_at": -1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
