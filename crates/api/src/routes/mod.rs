pub mod admin;
pub mod auth;
pub mod category;
pub mod checkout;
pub mod faq;
pub mod menu;
pub mod order;
pub mod reviews;
pub mod site;
pub mod stripe;
pub mod user;

use bson::oid::ObjectId;

use crate::error::ApiError;

pub(crate) fn parse_oid(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}
