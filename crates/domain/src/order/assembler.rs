//! Transactional order assembly.

use std::time::Instant;

use chrono::Utc;
use common::{OrderId, OrderStatus};
use store::{NewOrder, Order, Store};

use super::{OrderError, OrderRequest, PricingCalculator, StockLedger};
use crate::error::DomainError;

/// Persists orders and moves stock, one store transaction per operation.
///
/// Any error drops the transaction uncommitted, so a failed call leaves no
/// order, no line and no stock change behind.
pub struct OrderAssembler<S: Store> {
    store: S,
}

impl<S: Store> OrderAssembler<S> {
    /// Creates a new assembler over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an order and its lines, reserving stock for every line.
    ///
    /// Prices come from the locked product rows, so the stored total always
    /// matches the catalog at the moment the stock was taken.
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id(), status = %method))]
    pub async fn create_order(
        &self,
        method: OrderStatus,
        request: &OrderRequest,
        order_number: String,
    ) -> Result<Order, DomainError> {
        let start = Instant::now();
        let mut tx = self.store.begin().await?;

        let products = tx.lock_products(&request.product_ids()).await?;
        if let Some(missing) = request
            .lines()
            .iter()
            .find(|line| !products.iter().any(|p| p.id == line.product_id))
        {
            return Err(OrderError::ProductNotFound(missing.product_id).into());
        }

        let total_price = PricingCalculator::total_price(request.lines(), &products)?;
        StockLedger::reserve(tx.as_mut(), &products, &request.quantities()).await?;

        let header = tx
            .insert_order(NewOrder {
                user_id: request.user_id(),
                order_number,
                status: method,
                total_price,
            })
            .await?;

        for line in request.lines() {
            tx.insert_order_line(header.id, line.product_id, line.quantity)
                .await?;
        }

        let order = tx
            .lock_order(header.id)
            .await?
            .ok_or(OrderError::OrderNotFound(header.id))?;
        tx.commit().await?;

        metrics::counter!("orders_placed_total", "status" => method.as_str()).increment(1);
        metrics::histogram!("order_assembly_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_price,
            "order assembled"
        );

        Ok(order)
    }

    /// Deletes a provisional order and restores the stock it held.
    ///
    /// Fails with `NotProvisional` for orders that are cash on delivery or
    /// already paid; those are never removed.
    #[tracing::instrument(skip(self))]
    pub async fn discard_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if !order.is_provisional() {
            return Err(OrderError::NotProvisional(order_id).into());
        }

        StockLedger::release(tx.as_mut(), &order.lines).await?;
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        metrics::counter!("orders_discarded_total").increment(1);
        tracing::info!(order_number = %order.order_number, "provisional order discarded");

        Ok(order)
    }

    /// Marks an online-payment order as paid. Repeated calls keep the first
    /// payment time.
    ///
    /// Cash-on-delivery orders are refused with `NotProvisional`.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::OnlinePayment {
            return Err(OrderError::NotProvisional(order_id).into());
        }
        if order.is_paid() {
            return Ok(order);
        }

        tx.mark_order_paid(order_id, Utc::now()).await?;
        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        tx.commit().await?;

        tracing::info!(order_number = %order.order_number, "order payment confirmed");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, ProductId};
    use store::{InMemoryStore, NewProduct};

    use super::*;
    use crate::order::OrderLineRequest;

    async fn setup() -> (InMemoryStore, OrderAssembler<InMemoryStore>) {
        let store = InMemoryStore::new();
        store
            .insert_product(NewProduct::new("Widget", Money::from_cents(5025), 10))
            .await
            .unwrap();
        store
            .insert_product(NewProduct::new("Gadget", Money::from_cents(1000), 5))
            .await
            .unwrap();
        (store.clone(), OrderAssembler::new(store))
    }

    fn request(lines: &[(i64, u32)]) -> OrderRequest {
        OrderRequest::new(
            1,
            lines
                .iter()
                .map(|&(id, qty)| OrderLineRequest::new(id, qty)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_order_persists_lines_and_total() {
        let (store, assembler) = setup().await;

        let order = assembler
            .create_order(
                OrderStatus::CashOnDelivery,
                &request(&[(1, 2), (2, 1)]),
                "ORD-12300001".to_string(),
            )
            .await
            .unwrap();

        assert_eq!(order.total_price, Money::from_cents(11050));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.quantity_of(ProductId::new(1)), Some(2));
        assert_eq!(store.get_product(ProductId::new(1)).await.unwrap().unwrap().quantity, 8);
        assert_eq!(store.get_product(ProductId::new(2)).await.unwrap().unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn test_unknown_product_leaves_nothing_behind() {
        let (store, assembler) = setup().await;

        let err = assembler
            .create_order(
                OrderStatus::CashOnDelivery,
                &request(&[(1, 1), (42, 1)]),
                "ORD-12300001".to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::ProductNotFound(id)) if id == ProductId::new(42)
        ));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.get_product(ProductId::new(1)).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_discard_restores_stock() {
        let (store, assembler) = setup().await;
        let order = assembler
            .create_order(
                OrderStatus::OnlinePayment,
                &request(&[(1, 3)]),
                "ORD-12300001".to_string(),
            )
            .await
            .unwrap();

        assembler.discard_order(order.id).await.unwrap();

        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.order_line_count().await, 0);
        assert_eq!(store.get_product(ProductId::new(1)).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_discard_refuses_cash_on_delivery_and_paid_orders() {
        let (store, assembler) = setup().await;
        let cod = assembler
            .create_order(
                OrderStatus::CashOnDelivery,
                &request(&[(1, 1)]),
                "ORD-12300001".to_string(),
            )
            .await
            .unwrap();
        let online = assembler
            .create_order(
                OrderStatus::OnlinePayment,
                &request(&[(1, 1)]),
                "ORD-12300002".to_string(),
            )
            .await
            .unwrap();
        assembler.confirm_payment(online.id).await.unwrap();

        for id in [cod.id, online.id] {
            let err = assembler.discard_order(id).await.unwrap_err();
            assert!(matches!(err, DomainError::Order(OrderError::NotProvisional(_))));
        }
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_confirm_payment_is_idempotent() {
        let (_, assembler) = setup().await;
        let order = assembler
            .create_order(
                OrderStatus::OnlinePayment,
                &request(&[(2, 1)]),
                "ORD-12300001".to_string(),
            )
            .await
            .unwrap();

        let first = assembler.confirm_payment(order.id).await.unwrap();
        let second = assembler.confirm_payment(order.id).await.unwrap();

        assert!(first.is_paid());
        assert_eq!(first.paid_at, second.paid_at);
    }

    #[tokio::test]
    async fn test_confirm_payment_refuses_cash_on_delivery() {
        let (store, assembler) = setup().await;
        let order = assembler
            .create_order(
                OrderStatus::CashOnDelivery,
                &request(&[(1, 1)]),
                "ORD-12300001".to_string(),
            )
            .await
            .unwrap();

        let err = assembler.confirm_payment(order.id).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::NotProvisional(id)) if id == order.id
        ));
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert!(!stored.is_paid());
    }
}
