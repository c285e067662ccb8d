//! Database models split into domain-specific modules.

pub mod cart;
pub mod homepage;
pub mod jersey;
pub mod order;
pub mod seller_request;
pub mod user;

pub use cart::*;
pub use homepage::*;
pub use jersey::*;
pub use order::*;
pub use seller_request::*;
pub use user::*;
