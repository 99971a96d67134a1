//! Shared identifiers and value types used across the storefront crates.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, UnknownOrderStatus};
pub use types::{OrderId, ProductId, UserId};
