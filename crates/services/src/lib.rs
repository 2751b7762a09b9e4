pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod dao;
pub mod reviews;
pub mod stripe;
pub mod txn;

pub use auth::AuthService;
pub use dao::*;
pub use reviews::ReviewsService;
pub use stripe::StripeService;
