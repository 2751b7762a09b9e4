pub mod address;
pub mod menu_item;
pub mod order;
pub mod restaurant;
pub mod restaurant_user;
pub mod session;
pub mod user;

pub use address::*;
pub use menu_item::*;
pub use order::*;
pub use restaurant::*;
pub use restaurant_user::*;
pub use session::*;
pub use user::*;
