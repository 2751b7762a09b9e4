use std::collections::HashMap;

use bistro_db::models::{Category, MenuItem, OptionGroup, Restaurant, RestaurantUser};
use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use super::base::{BaseDao, DaoError, DaoResult, map_write_error};
use crate::catalog::{self, RenameError};
use crate::txn::{Txn, TxnRunner, in_transaction};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MenuItemInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(range(min = 0, max = 10_000_000))]
    pub price_cents: i64,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_option_groups"))]
    pub option_groups: Vec<OptionGroup>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[validate(length(min = 1, max = 80))]
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MenuItemPatch {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 10_000_000))]
    pub price_cents: Option<i64>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub image: Option<String>,
    pub option_groups: Option<Vec<OptionGroup>>,
    pub available: Option<bool>,
    #[validate(length(min = 1, max = 80))]
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

fn default_available() -> bool {
    true
}

fn validate_option_groups(groups: &[OptionGroup]) -> Result<(), ValidationError> {
    for group in groups {
        if group.question.trim().is_empty() {
            return Err(ValidationError::new("option_question_blank"));
        }
        if group.choices.is_empty() {
            return Err(ValidationError::new("option_group_without_choices"));
        }
        for (i, choice) in group.choices.iter().enumerate() {
            if choice.name.trim().is_empty() || !(0..=10_000_000).contains(&choice.price_cents) {
                return Err(ValidationError::new("option_choice_invalid"));
            }
            if group.choices[..i].iter().any(|c| c.name == choice.name) {
                return Err(ValidationError::new("option_choice_duplicate"));
            }
        }
    }
    let mut questions: Vec<&str> = groups.iter().map(|g| g.question.as_str()).collect();
    questions.sort_unstable();
    if questions.windows(2).any(|w| w[0] == w[1]) {
        return Err(ValidationError::new("option_question_duplicate"));
    }
    Ok(())
}

fn invalid(e: impl std::fmt::Display) -> DaoError {
    DaoError::Validation(e.to_string())
}

fn category_name(raw: &str) -> DaoResult<String> {
    catalog::normalize_name(raw)
        .ok_or_else(|| DaoError::Validation("Category name must not be blank".to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub item_count: usize,
}

#[derive(Debug, Clone)]
pub struct MenuSection {
    pub category: String,
    pub items: Vec<MenuItem>,
}

/// Menu items plus the per-restaurant category index that points at them.
pub struct MenuDao {
    pub items: BaseDao<MenuItem>,
    pub restaurants: BaseDao<Restaurant>,
    restaurant_users: Collection<RestaurantUser>,
    txn: TxnRunner,
}

impl MenuDao {
    pub fn new(db: &Database, transactions: bool) -> Self {
        Self {
            items: BaseDao::new(db, MenuItem::COLLECTION),
            restaurants: BaseDao::new(db, Restaurant::COLLECTION),
            restaurant_users: db.collection(RestaurantUser::COLLECTION),
            txn: TxnRunner::new(db, transactions),
        }
    }

    // ---- Reads -------------------------------------------------------------

    pub async fn get_item(&self, restaurant_id: ObjectId, item_id: ObjectId) -> DaoResult<MenuItem> {
        self.items
            .find_by_id_in_restaurant(restaurant_id, item_id)
            .await
    }

    pub async fn list_items(
        &self,
        restaurant_id: ObjectId,
        category: Option<&str>,
    ) -> DaoResult<Vec<MenuItem>> {
        let mut filter = doc! { "restaurant_id": restaurant_id };
        if let Some(category) = category {
            filter.insert("category_id", category);
        }
        self.items
            .find_many(filter, Some(doc! { "name": 1 }))
            .await
    }

    pub async fn find_items(
        &self,
        restaurant_id: ObjectId,
        ids: &[ObjectId],
    ) -> DaoResult<Vec<MenuItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.items
            .find_many(
                doc! { "restaurant_id": restaurant_id, "_id": { "$in": ids } },
                None,
            )
            .await
    }

    pub async fn list_categories(&self, restaurant_id: ObjectId) -> DaoResult<Vec<CategorySummary>> {
        let restaurant = self.restaurants.find_by_id(restaurant_id).await?;
        Ok(restaurant
            .categories
            .into_iter()
            .map(|c| CategorySummary {
                item_count: c.item_ids.len(),
                name: c.name,
            })
            .collect())
    }

    /// Items grouped by category, in category order and, within a category,
    /// in index order.
    pub async fn menu(
        &self,
        restaurant_id: ObjectId,
        include_unavailable: bool,
    ) -> DaoResult<Vec<MenuSection>> {
        let restaurant = self.restaurants.find_by_id(restaurant_id).await?;

        let mut filter = doc! { "restaurant_id": restaurant_id };
        if !include_unavailable {
            filter.insert("available", true);
        }
        let mut by_id: HashMap<ObjectId, MenuItem> = self
            .items
            .find_many(filter, None)
            .await?
            .into_iter()
            .filter_map(|item| item.id.map(|id| (id, item)))
            .collect();

        let sections = restaurant
            .categories
            .into_iter()
            .map(|category| MenuSection {
                items: category
                    .item_ids
                    .iter()
                    .filter_map(|id| by_id.remove(id))
                    .collect(),
                category: category.name,
            })
            .collect();

        if !by_id.is_empty() {
            warn!(
                %restaurant_id,
                orphans = by_id.len(),
                "Menu items missing from the category index"
            );
        }
        Ok(sections)
    }

    // ---- Categories ----------------------------------------------------------

    pub async fn create_category(&self, restaurant_id: ObjectId, name: &str) -> DaoResult<Category> {
        let name = category_name(name)?;
        let category = Category::new(name.clone());

        // Single-document conditional push: atomic without a transaction.
        let result = self
            .restaurants
            .collection()
            .update_one(
                doc! { "_id": restaurant_id, "categories.name": { "$ne": name.as_str() } },
                doc! {
                    "$push": { "categories": bson::to_bson(&category)? },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .await?;

        if result.matched_count == 0 {
            self.restaurants.find_by_id(restaurant_id).await?;
            return Err(DaoError::Conflict(format!("Category {name} already exists")));
        }
        info!(%restaurant_id, category = %name, "Category created");
        Ok(category)
    }

    pub async fn rename_category(
        &self,
        restaurant_id: ObjectId,
        from: &str,
        to: &str,
    ) -> DaoResult<()> {
        let to = category_name(to)?;
        in_transaction!(self.txn, |txn| self.rename_category_in(txn, restaurant_id, from, &to))
    }

    async fn rename_category_in(
        &self,
        txn: &mut Txn,
        restaurant_id: ObjectId,
        from: &str,
        to: &str,
    ) -> DaoResult<()> {
        let mut categories = self.load_categories(txn, restaurant_id).await?;
        catalog::rename(&mut categories, from, to).map_err(|e| match e {
            RenameError::NotFound => DaoError::NotFound,
            RenameError::Exists(name) => DaoError::Conflict(format!("Category {name} already exists")),
        })?;
        self.save_categories(txn, restaurant_id, &categories).await?;

        let moved = self
            .items
            .collection()
            .update_many(
                doc! { "restaurant_id": restaurant_id, "category_id": from },
                doc! { "$set": { "category_id": to, "updated_at": DateTime::now() } },
            )
            .session(txn.session())
            .await?;
        info!(%restaurant_id, from, to, items = moved.modified_count, "Category renamed");
        Ok(())
    }

    pub async fn delete_category(&self, restaurant_id: ObjectId, name: &str) -> DaoResult<()> {
        in_transaction!(self.txn, |txn| self.delete_category_in(txn, restaurant_id, name))
    }

    async fn delete_category_in(
        &self,
        txn: &mut Txn,
        restaurant_id: ObjectId,
        name: &str,
    ) -> DaoResult<()> {
        let mut categories = self.load_categories(txn, restaurant_id).await?;
        let index = categories
            .iter()
            .position(|c| c.name == name)
            .ok_or(DaoError::NotFound)?;

        let remaining = categories[index].item_ids.len();
        if remaining > 0 {
            return Err(DaoError::Conflict(format!(
                "Category {name} still holds {remaining} menu items"
            )));
        }
        categories.remove(index);
        self.save_categories(txn, restaurant_id, &categories).await?;
        info!(%restaurant_id, category = name, "Category deleted");
        Ok(())
    }

    // ---- Items ---------------------------------------------------------------

    pub async fn create_item(
        &self,
        restaurant_id: ObjectId,
        input: MenuItemInput,
    ) -> DaoResult<MenuItem> {
        input.validate().map_err(invalid)?;
        let category = category_name(&input.category_id)?;

        let now = DateTime::now();
        let item = MenuItem {
            id: Some(ObjectId::new()),
            restaurant_id,
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            description: input.description,
            image: input.image,
            option_groups: input.option_groups,
            available: input.available,
            category_id: category,
            tags: input.tags,
            created_at: now,
            updated_at: now,
        };

        in_transaction!(self.txn, |txn| self.create_item_in(txn, &item))?;
        Ok(item)
    }

    async fn create_item_in(&self, txn: &mut Txn, item: &MenuItem) -> DaoResult<()> {
        let item_id = item.id.ok_or(DaoError::NotFound)?;
        let mut categories = self.load_categories(txn, item.restaurant_id).await?;

        self.items
            .collection()
            .insert_one(item)
            .session(txn.session())
            .await
            .map_err(map_write_error)?;

        if catalog::link_item(&mut categories, &item.category_id, item_id) {
            info!(category = %item.category_id, "Category created for new menu item");
        }
        self.save_categories(txn, item.restaurant_id, &categories).await?;

        info!(restaurant_id = %item.restaurant_id, %item_id, name = %item.name, "Menu item created");
        Ok(())
    }

    pub async fn update_item(
        &self,
        restaurant_id: ObjectId,
        item_id: ObjectId,
        patch: MenuItemPatch,
    ) -> DaoResult<MenuItem> {
        patch.validate().map_err(invalid)?;
        if let Some(groups) = &patch.option_groups {
            validate_option_groups(groups).map_err(invalid)?;
        }
        let category = patch.category_id.as_deref().map(category_name).transpose()?;

        in_transaction!(self.txn, |txn| self.update_item_in(
            txn,
            restaurant_id,
            item_id,
            &patch,
            category.as_deref()
        ))
    }

    async fn update_item_in(
        &self,
        txn: &mut Txn,
        restaurant_id: ObjectId,
        item_id: ObjectId,
        patch: &MenuItemPatch,
        category: Option<&str>,
    ) -> DaoResult<MenuItem> {
        let mut item = self
            .items
            .collection()
            .find_one(doc! { "_id": item_id, "restaurant_id": restaurant_id })
            .session(txn.session())
            .await?
            .ok_or(DaoError::NotFound)?;

        if let Some(name) = &patch.name {
            item.name = name.trim().to_string();
        }
        if let Some(price) = patch.price_cents {
            item.price_cents = price;
        }
        if let Some(description) = &patch.description {
            item.description = Some(description.clone());
        }
        if let Some(image) = &patch.image {
            item.image = Some(image.clone());
        }
        if let Some(groups) = &patch.option_groups {
            item.option_groups = groups.clone();
        }
        if let Some(available) = patch.available {
            item.available = available;
        }
        if let Some(tags) = &patch.tags {
            item.tags = tags.clone();
        }

        if let Some(category) = category.filter(|c| *c != item.category_id) {
            let mut categories = self.load_categories(txn, restaurant_id).await?;
            catalog::move_item(&mut categories, item_id, category);
            self.save_categories(txn, restaurant_id, &categories).await?;
            info!(%item_id, from = %item.category_id, to = category, "Menu item moved");
            item.category_id = category.to_string();
        }

        item.updated_at = DateTime::now();
        self.items
            .collection()
            .replace_one(doc! { "_id": item_id }, &item)
            .session(txn.session())
            .await?;
        Ok(item)
    }

    pub async fn delete_item(&self, restaurant_id: ObjectId, item_id: ObjectId) -> DaoResult<()> {
        in_transaction!(self.txn, |txn| self.delete_item_in(txn, restaurant_id, item_id))
    }

    async fn delete_item_in(
        &self,
        txn: &mut Txn,
        restaurant_id: ObjectId,
        item_id: ObjectId,
    ) -> DaoResult<()> {
        let deleted = self
            .items
            .collection()
            .delete_one(doc! { "_id": item_id, "restaurant_id": restaurant_id })
            .session(txn.session())
            .await?;
        if deleted.deleted_count == 0 {
            return Err(DaoError::NotFound);
        }

        let mut categories = self.load_categories(txn, restaurant_id).await?;
        if catalog::unlink_item(&mut categories, item_id).is_none() {
            warn!(%item_id, "Deleted menu item was not in any category");
        }
        self.save_categories(txn, restaurant_id, &categories).await?;

        self.restaurant_users
            .update_many(
                doc! { "restaurant_id": restaurant_id, "liked_item_ids": item_id },
                doc! { "$pull": { "liked_item_ids": item_id } },
            )
            .session(txn.session())
            .await?;

        info!(%restaurant_id, %item_id, "Menu item deleted");
        Ok(())
    }

    pub async fn set_availability(
        &self,
        restaurant_id: ObjectId,
        item_id: ObjectId,
        available: bool,
    ) -> DaoResult<MenuItem> {
        let matched = self
            .items
            .update_one(
                doc! { "_id": item_id, "restaurant_id": restaurant_id },
                doc! { "$set": { "available": available } },
            )
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        self.get_item(restaurant_id, item_id).await
    }

    // ---- Category index I/O ----------------------------------------------

    async fn load_categories(&self, txn: &mut Txn, restaurant_id: ObjectId) -> DaoResult<Vec<Category>> {
        let restaurant = self
            .restaurants
            .collection()
            .find_one(doc! { "_id": restaurant_id })
            .session(txn.session())
            .await?
            .ok_or(DaoError::NotFound)?;
        Ok(restaurant.categories)
    }

    async fn save_categories(
        &self,
        txn: &mut Txn,
        restaurant_id: ObjectId,
        categories: &[Category],
    ) -> DaoResult<()> {
        self.restaurants
            .collection()
            .update_one(
                doc! { "_id": restaurant_id },
                doc! {
                    "$set": {
                        "categories": bson::to_bson(categories)?,
                        "updated_at": DateTime::now(),
                    }
                },
            )
            .session(txn.session())
            .await?;
        Ok(())
    }
}
