//! Records persisted by the store.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, OrderStatus, ProductId, UserId};

/// A catalog product with its available stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Current unit price.
    pub price: Money,
    /// Available quantity; never negative.
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a catalog product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub quantity: u32,
}

impl NewProduct {
    /// Creates a product without a description.
    pub fn new(name: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            quantity,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One ordered product, joined with its catalog row for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    /// Current catalog price of the product.
    pub unit_price: Money,
    /// Quantity ordered.
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

/// A persisted order with its lines materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    /// Sum of line totals at creation time.
    pub total_price: Money,
    /// Gateway order id recorded after the payment hand-off.
    pub payment_reference: Option<String>,
    /// Set once a verified callback confirms payment.
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Returns true if this is an online-payment order still awaiting its
    /// payment callback.
    pub fn is_provisional(&self) -> bool {
        self.status == OrderStatus::OnlinePayment && self.paid_at.is_none()
    }

    /// Returns true if a verified callback confirmed payment.
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Returns the ordered quantity for a product, if present.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }
}

/// Fields for inserting an order header.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_price: Money,
}
