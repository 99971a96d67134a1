use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::{Store, StoreTransaction, lock_order};
use crate::{
    NewOrder, NewProduct, Order, OrderId, OrderLine, Product, ProductId, Result, StoreError,
    UserId,
};

#[derive(Debug, Clone)]
struct LineRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    /// Order headers; `lines` is always empty here and filled on read.
    orders: BTreeMap<OrderId, Order>,
    lines: Vec<LineRow>,
    next_product_id: i64,
    next_order_id: i64,
}

impl MemoryState {
    fn materialize(&self, header: &Order) -> Order {
        let lines = self
            .lines
            .iter()
            .filter(|line| line.order_id == header.id)
            .map(|line| {
                let product = self.products.get(&line.product_id);
                OrderLine {
                    order_id: line.order_id,
                    product_id: line.product_id,
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    unit_price: product.map(|p| p.price).unwrap_or_default(),
                    quantity: line.quantity,
                    created_at: line.created_at,
                }
            })
            .collect();

        Order {
            lines,
            ..header.clone()
        }
    }

    fn order(&self, id: OrderId) -> Option<Order> {
        self.orders.get(&id).map(|header| self.materialize(header))
    }

    fn products_by_ids(&self, ids: &[ProductId]) -> Vec<Product> {
        lock_order(ids)
            .into_iter()
            .filter_map(|id| self.products.get(&id).cloned())
            .collect()
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))
    }
}

/// In-memory store implementation for testing and development.
///
/// A transaction holds the store-wide lock for its whole lifetime and works on
/// a staged copy of the state, which replaces the shared state on commit.
/// Transactions are therefore fully serialized, and a dropped transaction
/// leaves no trace.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of order lines stored.
    pub async fn order_line_count(&self) -> usize {
        self.state.lock().await.lines.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut state = self.state.lock().await;
        state.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(state.next_product_id),
            name: product.name,
            description: product.description,
            price: product.price,
            quantity: product.quantity,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn get_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(self.state.lock().await.products_by_ids(ids))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.lock().await.order(id))
    }

    async fn find_latest_order(&self) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .next_back()
            .map(|header| state.materialize(header)))
    }

    async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .find(|o| o.payment_reference.as_deref() == Some(reference))
            .map(|header| state.materialize(header)))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .map(|header| state.materialize(header))
            .collect())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|header| state.materialize(header))
            .collect())
    }

    async fn set_payment_reference(&self, id: OrderId, reference: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.payment_reference = Some(reference.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        Ok(self.staged.products_by_ids(ids))
    }

    async fn decrement_product_quantity(&mut self, id: ProductId, by: u32) -> Result<u32> {
        let product = self.staged.product_mut(id)?;
        if product.quantity < by {
            return Err(StoreError::StockConflict {
                product_id: id,
                requested: by,
                available: product.quantity,
            });
        }
        product.quantity -= by;
        product.updated_at = Utc::now();
        Ok(product.quantity)
    }

    async fn increment_product_quantity(&mut self, id: ProductId, by: u32) -> Result<u32> {
        let product = self.staged.product_mut(id)?;
        product.quantity = product.quantity.saturating_add(by);
        product.updated_at = Utc::now();
        Ok(product.quantity)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        self.staged.next_order_id += 1;
        let now = Utc::now();
        let order = Order {
            id: OrderId::new(self.staged.next_order_id),
            user_id: order.user_id,
            order_number: order.order_number,
            status: order.status,
            total_price: order.total_price,
            payment_reference: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            lines: Vec::new(),
        };
        self.staged.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        if !self.staged.orders.contains_key(&order_id) {
            return Err(StoreError::OrderNotFound(order_id));
        }
        if !self.staged.products.contains_key(&product_id) {
            return Err(StoreError::ProductNotFound(product_id));
        }
        self.staged.lines.push(LineRow {
            order_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.staged.order(id))
    }

    async fn mark_order_paid(&mut self, id: OrderId, paid_at: DateTime<Utc>) -> Result<()> {
        let order = self
            .staged
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.paid_at = Some(paid_at);
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<()> {
        if self.staged.orders.remove(&id).is_none() {
            return Err(StoreError::OrderNotFound(id));
        }
        self.staged.lines.retain(|line| line.order_id != id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
