//! Stock ledger: validates and applies stock movements.

use std::collections::HashMap;

use common::ProductId;
use store::{OrderLine, Product, StoreError, StoreTransaction};

use super::OrderError;
use crate::error::DomainError;

/// A validated stock decrement for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReservation {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Quantity left once the reservation is applied.
    pub remaining: u32,
}

/// Validates and applies stock decrements for a batch of products.
///
/// The whole batch is validated before any write, so a failing line never
/// leaves earlier lines decremented.
pub struct StockLedger;

impl StockLedger {
    /// Validates a batch of decrements without writing anything.
    ///
    /// Every product must appear in `requested` and have enough stock.
    pub fn plan(
        products: &[Product],
        requested: &HashMap<ProductId, u32>,
    ) -> Result<Vec<StockReservation>, OrderError> {
        products
            .iter()
            .map(|product| {
                let quantity = *requested
                    .get(&product.id)
                    .ok_or(OrderError::ProductNotInRequest(product.id))?;

                if product.quantity < quantity {
                    return Err(OrderError::InsufficientStock {
                        product_id: product.id,
                        product_name: product.name.clone(),
                        requested: quantity,
                        available: product.quantity,
                    });
                }

                Ok(StockReservation {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    quantity,
                    remaining: product.quantity - quantity,
                })
            })
            .collect()
    }

    /// Plans and applies the decrements inside `tx`.
    ///
    /// `products` must be the rows locked by `tx`.
    #[tracing::instrument(skip(tx, products), fields(product_count = products.len()))]
    pub async fn reserve(
        tx: &mut dyn StoreTransaction,
        products: &[Product],
        requested: &HashMap<ProductId, u32>,
    ) -> Result<Vec<StockReservation>, DomainError> {
        let reservations = Self::plan(products, requested)?;

        for reservation in &reservations {
            tx.decrement_product_quantity(reservation.product_id, reservation.quantity)
                .await
                .map_err(|e| match e {
                    StoreError::StockConflict {
                        product_id,
                        requested,
                        available,
                    } => DomainError::Order(OrderError::InsufficientStock {
                        product_id,
                        product_name: reservation.product_name.clone(),
                        requested,
                        available,
                    }),
                    other => DomainError::Store(other),
                })?;
        }

        tracing::debug!(reserved = reservations.len(), "stock reserved");
        Ok(reservations)
    }

    /// Restores the stock held by `lines` inside `tx`.
    ///
    /// The product rows are locked up front and updated in ascending id
    /// order, the same order assembly locks them in.
    #[tracing::instrument(skip(tx, lines), fields(line_count = lines.len()))]
    pub async fn release(tx: &mut dyn StoreTransaction, lines: &[OrderLine]) -> Result<(), DomainError> {
        let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        tx.lock_products(&ids).await?;

        let mut ordered: Vec<&OrderLine> = lines.iter().collect();
        ordered.sort_by_key(|line| line.product_id);
        for line in ordered {
            tx.increment_product_quantity(line.product_id, line.quantity)
                .await?;
        }
        Ok(())
    }
}
