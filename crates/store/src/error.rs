use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A product referenced by a write does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// An order referenced by a write does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stock decrement would have made the available quantity negative.
    #[error(
        "Stock conflict for product {product_id}: requested {requested}, available {available}"
    )]
    StockConflict {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A stored row could not be mapped back to a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
