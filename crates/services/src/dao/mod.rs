pub mod base;
pub mod menu;
pub mod order;
pub mod restaurant;
pub mod restaurant_user;
pub mod session;
pub mod user;

pub use base::BaseDao;
