//! Persistence boundary for the storefront order service.
//!
//! Exposes the catalog lookups, order storage and the transaction boundary
//! the ordering core runs inside. Two implementations are provided: an
//! in-memory store for tests and development, and a PostgreSQL store.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{Money, OrderId, OrderStatus, ProductId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use record::{NewOrder, NewProduct, Order, OrderLine, Product};
pub use store::{Store, StoreTransaction};
