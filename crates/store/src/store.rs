use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{NewOrder, NewProduct, Order, OrderId, Product, ProductId, Result, UserId};

/// Core trait for store implementations.
///
/// Reads outside a transaction see only committed state. Every write the
/// ordering core performs goes through a [`StoreTransaction`] obtained from
/// [`Store::begin`], except recording the gateway payment reference, which
/// happens after the order has been committed.
#[async_trait]
pub trait Store: Send + Sync {
    /// Starts a transaction.
    ///
    /// Writes made through the transaction become visible atomically on
    /// [`StoreTransaction::commit`]. Dropping the transaction without
    /// committing discards all of them.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Inserts a catalog product.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Retrieves a single product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Retrieves the products with the given ids, ordered by id.
    ///
    /// Ids with no matching product are omitted.
    async fn get_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Retrieves an order with its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves the most recently created order.
    async fn find_latest_order(&self) -> Result<Option<Order>>;

    /// Retrieves the order whose gateway payment reference matches.
    async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>>;

    /// Lists all orders, oldest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    /// Lists the orders owned by a user, oldest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Records the gateway order id for an order.
    async fn set_payment_reference(&self, id: OrderId, reference: &str) -> Result<()>;
}

/// A unit of work against the store.
///
/// Implementations hold whatever lock or database transaction is needed so
/// that rows returned by the `lock_*` methods cannot be changed by a
/// concurrent transaction until this one commits or is dropped.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Locks and returns the products with the given ids, ordered by id.
    ///
    /// Ids with no matching product are omitted.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Decrements available stock and returns the remaining quantity.
    ///
    /// Fails with `StockConflict` instead of going below zero.
    async fn decrement_product_quantity(&mut self, id: ProductId, by: u32) -> Result<u32>;

    /// Increments available stock and returns the new quantity.
    async fn increment_product_quantity(&mut self, id: ProductId, by: u32) -> Result<u32>;

    /// Inserts an order header. The returned order has no lines yet.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    /// Inserts one order line.
    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()>;

    /// Locks and returns an order with its lines.
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Marks an order as paid.
    async fn mark_order_paid(&mut self, id: OrderId, paid_at: DateTime<Utc>) -> Result<()>;

    /// Deletes an order and its lines.
    async fn delete_order(&mut self, id: OrderId) -> Result<()>;

    /// Commits every write made through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Returns the ids sorted and deduplicated, the order rows are locked in.
///
/// Locking in a single global order keeps concurrent transactions over
/// overlapping product sets from deadlocking.
pub fn lock_order(ids: &[ProductId]) -> Vec<ProductId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_sorts_and_dedups() {
        let ids = [ProductId::new(3), ProductId::new(1), ProductId::new(3)];
        assert_eq!(lock_order(&ids), vec![ProductId::new(1), ProductId::new(3)]);
    }
}
