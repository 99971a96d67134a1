//! Order service providing the read side and catalog lookups.

use common::{OrderId, ProductId, UserId};
use store::{Order, Product, Store};

use crate::error::DomainError;

/// Service for looking up orders and catalog snapshots.
///
/// Reads see committed state only; writes go through
/// [`OrderAssembler`](super::OrderAssembler).
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an order with its lines.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.store.get_order(order_id).await?)
    }

    /// Lists every order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders().await?)
    }

    /// Lists the orders owned by a user, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, DomainError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// Loads the order the gateway knows under `reference`.
    #[tracing::instrument(skip(self))]
    pub async fn find_by_payment_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self.store.find_order_by_payment_reference(reference).await?)
    }

    /// Loads the most recently created order.
    pub async fn latest_order(&self) -> Result<Option<Order>, DomainError> {
        Ok(self.store.find_latest_order().await?)
    }

    /// Records the gateway order id for an order.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment_reference(
        &self,
        order_id: OrderId,
        reference: &str,
    ) -> Result<(), DomainError> {
        Ok(self.store.set_payment_reference(order_id, reference).await?)
    }

    /// Returns the current catalog rows for `ids`, without locking them.
    pub async fn catalog_snapshot(&self, ids: &[ProductId]) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.get_products_by_ids(ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, OrderStatus};
    use store::{InMemoryStore, NewProduct};

    use super::*;
    use crate::order::{OrderAssembler, OrderLineRequest, OrderRequest};

    #[tokio::test]
    async fn test_lookups_follow_committed_orders() {
        let store = InMemoryStore::new();
        let widget = store
            .insert_product(NewProduct::new("Widget", Money::from_cents(100), 10))
            .await
            .unwrap();
        let assembler = OrderAssembler::new(store.clone());
        let service = OrderService::new(store);

        let request = OrderRequest::new(3, [OrderLineRequest::new(widget.id, 1)]).unwrap();
        let order = assembler
            .create_order(OrderStatus::OnlinePayment, &request, "ORD-00100001".to_string())
            .await
            .unwrap();
        service
            .record_payment_reference(order.id, "991")
            .await
            .unwrap();

        let found = service.find_by_payment_reference("991").await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
        assert_eq!(service.latest_order().await.unwrap().unwrap().id, order.id);
        assert_eq!(service.list_orders_for_user(UserId::new(3)).await.unwrap().len(), 1);
        assert!(service.list_orders_for_user(UserId::new(4)).await.unwrap().is_empty());
        assert!(service.get_order(OrderId::new(999)).await.unwrap().is_none());

        let snapshot = service.catalog_snapshot(&[widget.id]).await.unwrap();
        assert_eq!(snapshot[0].quantity, 9);
    }
}
