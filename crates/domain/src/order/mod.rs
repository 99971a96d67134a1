//! Order placement: request validation, pricing, stock and assembly.

mod assembler;
mod number;
mod pricing;
mod request;
mod service;
mod stock;

pub use assembler::OrderAssembler;
pub use number::{format_order_number, generate_order_number};
pub use pricing::PricingCalculator;
pub use request::{OrderLineRequest, OrderRequest};
pub use service::OrderService;
pub use stock::{StockLedger, StockReservation};

use common::{OrderId, ProductId};
use thiserror::Error;

/// Errors that can occur while placing or resolving an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The request names no products.
    #[error("Order has no items")]
    NoItems,

    /// A requested quantity is zero.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A requested product does not exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order total does not fit in minor units.
    #[error("Order total is too large at product {0}")]
    TotalOverflow(ProductId),

    /// A fetched product has no matching entry in the request.
    #[error("Product ID: {0} not found in request data")]
    ProductNotInRequest(ProductId),

    /// Not enough stock to satisfy a line.
    #[error("Insufficient stock available for product: {product_name}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: u32,
        available: u32,
    },

    /// The order does not exist (anymore).
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not an unpaid online-payment order.
    #[error("Order {0} is not awaiting payment")]
    NotProvisional(OrderId),
}
