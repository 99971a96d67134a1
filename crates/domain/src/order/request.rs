//! Validated order request.

use std::collections::HashMap;

use common::{ProductId, UserId};

use super::OrderError;

/// One requested product and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderLineRequest {
    /// Creates a request line.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A request to place an order, validated at construction.
///
/// Lines naming the same product are merged into one line with the summed
/// quantity, keeping the position of the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    user_id: UserId,
    lines: Vec<OrderLineRequest>,
}

impl OrderRequest {
    /// Validates and normalizes a request.
    pub fn new(
        user_id: impl Into<UserId>,
        lines: impl IntoIterator<Item = OrderLineRequest>,
    ) -> Result<Self, OrderError> {
        let mut merged: Vec<OrderLineRequest> = Vec::new();
        for line in lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            match merged.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
                None => merged.push(line),
            }
        }

        if merged.is_empty() {
            return Err(OrderError::NoItems);
        }

        Ok(Self {
            user_id: user_id.into(),
            lines: merged,
        })
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the requested lines.
    pub fn lines(&self) -> &[OrderLineRequest] {
        &self.lines
    }

    /// Returns the requested product ids in request order.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    /// Returns the requested quantity keyed by product id.
    pub fn quantities(&self) -> HashMap<ProductId, u32> {
        self.lines
            .iter()
            .map(|l| (l.product_id, l.quantity))
            .collect()
    }
}
