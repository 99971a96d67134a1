//! Domain layer for the storefront order service.
//!
//! This crate provides the ordering core:
//! - Stock ledger validating and applying stock decrements
//! - Pricing calculator over the current catalog prices
//! - Order assembler persisting an order and its lines in one transaction
//! - Order number generation and the read-side order service

pub mod error;
pub mod order;

pub use common::{Money, OrderId, OrderStatus, ProductId, UserId};
pub use error::DomainError;
pub use order::{
    OrderAssembler, OrderError, OrderLineRequest, OrderRequest, OrderService, PricingCalculator,
    StockLedger, StockReservation, format_order_number, generate_order_number,
};
pub use store::{Order, OrderLine, Product};
