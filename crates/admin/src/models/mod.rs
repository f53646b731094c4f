//! Document models for the admin API.
//!
//! Each model is the JSON document stored in its collection table. Field
//! names on the wire and in storage are camelCase.

pub mod category;
pub mod product;
pub mod promotion;
pub mod session;
pub mod user;

pub use category::Category;
pub use product::Product;
pub use promotion::Promotion;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
