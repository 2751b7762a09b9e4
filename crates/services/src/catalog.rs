//! Category index maintenance.
//!
//! The restaurant document keeps, per category, the ids of the menu items
//! whose `category_id` names it. These helpers splice that list in memory;
//! the DAO persists the result in the same transaction as the item write.

use bistro_db::models::Category;
use bson::oid::ObjectId;

/// Trimmed category name, or `None` when blank.
pub fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Adds `item_id` to the category called `name`, appending the category
/// when it does not exist yet. Returns `true` if a category was created.
pub fn link_item(categories: &mut Vec<Category>, name: &str, item_id: ObjectId) -> bool {
    match categories.iter_mut().find(|c| c.name == name) {
        Some(category) => {
            if !category.item_ids.contains(&item_id) {
                category.item_ids.push(item_id);
            }
            false
        }
        None => {
            let mut category = Category::new(name);
            category.item_ids.push(item_id);
            categories.push(category);
            true
        }
    }
}

/// Removes every occurrence of `item_id`. Returns the name of the first
/// category that held it.
pub fn unlink_item(categories: &mut [Category], item_id: ObjectId) -> Option<String> {
    let mut found = None;
    for category in categories.iter_mut() {
        let before = category.item_ids.len();
        category.item_ids.retain(|id| *id != item_id);
        if category.item_ids.len() != before && found.is_none() {
            found = Some(category.name.clone());
        }
    }
    found
}

/// Moves `item_id` so that exactly `to` holds it.
pub fn move_item(categories: &mut Vec<Category>, item_id: ObjectId, to: &str) -> bool {
    unlink_item(categories, item_id);
    link_item(categories, to, item_id)
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("category not found")]
    NotFound,
    #[error("category {0} already exists")]
    Exists(String),
}

pub fn rename(categories: &mut [Category], from: &str, to: &str) -> Result<(), RenameError> {
    if from != to && categories.iter().any(|c| c.name == to) {
        return Err(RenameError::Exists(to.to_string()));
    }
    let category = categories
        .iter_mut()
        .find(|c| c.name == from)
        .ok_or(RenameError::NotFound)?;
    category.name = to.to_string();
    Ok(())
}
