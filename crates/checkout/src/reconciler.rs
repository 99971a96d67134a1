//! Payment callback reconciliation.

use common::OrderStatus;
use domain::{DomainError, OrderAssembler, OrderError, OrderService};
use payment::{CallbackPayload, verify_signature};
use store::{Order, Store};

use crate::error::CheckoutError;
use crate::state::CheckoutState;

/// Resolves provisional orders from the gateway's signed callback.
pub struct CallbackReconciler<S: Store> {
    assembler: OrderAssembler<S>,
    orders: OrderService<S>,
    hmac_secret: String,
}

impl<S: Store + Clone> CallbackReconciler<S> {
    /// Creates a reconciler verifying callbacks with `hmac_secret`.
    pub fn new(store: S, hmac_secret: impl Into<String>) -> Self {
        Self {
            assembler: OrderAssembler::new(store.clone()),
            orders: OrderService::new(store),
            hmac_secret: hmac_secret.into(),
        }
    }

    /// Confirms or rejects the order a callback refers to.
    ///
    /// The order is found by the signed `order` field (the gateway order id
    /// recorded at placement), or by recency when the callback has none.
    /// A verified successful callback marks an online-payment order paid and
    /// returns it.
    /// Anything else deletes the order if it is still provisional and fails
    /// with `CallbackVerificationFailed`; confirmed orders are never deleted.
    #[tracing::instrument(skip(self, payload), fields(order_reference = payload.order_reference()))]
    pub async fn callback(&self, payload: &CallbackPayload) -> Result<Order, CheckoutError> {
        let order = match payload.order_reference() {
            Some(reference) => self.orders.find_by_payment_reference(reference).await?,
            None => self.orders.latest_order().await?,
        };

        let rejection = match verify_signature(payload, &self.hmac_secret) {
            Err(e) => e.to_string(),
            Ok(()) if !payload.is_success() => "payment was not successful".to_string(),
            Ok(()) => match &order {
                Some(found) if found.status == OrderStatus::OnlinePayment => {
                    let order = self.assembler.confirm_payment(found.id).await?;
                    record(CheckoutState::Confirmed);
                    tracing::info!(order_number = %order.order_number, "payment confirmed");
                    return Ok(order);
                }
                _ => "no matching order".to_string(),
            },
        };

        if let Some(order) = order.filter(Order::is_provisional) {
            match self.assembler.discard_order(order.id).await {
                Ok(_) => {
                    tracing::info!(order_number = %order.order_number, "provisional order rejected");
                }
                Err(DomainError::Order(
                    OrderError::NotProvisional(_) | OrderError::OrderNotFound(_),
                )) => {}
                Err(e) => return Err(e.into()),
            }
        }

        record(CheckoutState::Rejected);
        tracing::warn!(reason = %rejection, "payment callback rejected");
        Err(CheckoutError::CallbackVerificationFailed { reason: rejection })
    }
}

fn record(outcome: CheckoutState) {
    metrics::counter!("payment_callbacks_total", "outcome" => outcome.as_str()).increment(1);
}
