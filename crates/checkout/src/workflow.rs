//! Order placement workflow.

use common::OrderStatus;
use domain::{
    OrderAssembler, OrderRequest, OrderService, PricingCalculator, generate_order_number,
};
use payment::{BillingData, PaymentGateway, PaymentRequest};
use store::{Order, Store};

use crate::error::CheckoutError;
use crate::state::CheckoutState;

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderOutcome {
    /// A cash-on-delivery order was committed.
    Assembled(Order),

    /// A provisional order awaits payment at `payment_url`.
    PendingPayment { order: Order, payment_url: String },
}

impl PlaceOrderOutcome {
    /// Returns the placed order.
    pub fn order(&self) -> &Order {
        match self {
            PlaceOrderOutcome::Assembled(order) => order,
            PlaceOrderOutcome::PendingPayment { order, .. } => order,
        }
    }

    /// Returns the checkout state the order was left in.
    pub fn state(&self) -> CheckoutState {
        match self {
            PlaceOrderOutcome::Assembled(_) => CheckoutState::Assembled,
            PlaceOrderOutcome::PendingPayment { .. } => CheckoutState::PendingPayment,
        }
    }
}

/// Drives an order request through assembly and, for online payment, the
/// gateway hand-off.
///
/// The gateway is only called after the assembly transaction committed; no
/// store lock is held across the outbound call.
pub struct OrderWorkflow<S: Store, G: PaymentGateway> {
    assembler: OrderAssembler<S>,
    orders: OrderService<S>,
    gateway: G,
}

impl<S, G> OrderWorkflow<S, G>
where
    S: Store + Clone,
    G: PaymentGateway,
{
    /// Creates a new workflow.
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            assembler: OrderAssembler::new(store.clone()),
            orders: OrderService::new(store),
            gateway,
        }
    }

    /// Returns the read-side order service.
    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }

    /// Places an order with the chosen payment method.
    #[tracing::instrument(skip(self, request, billing), fields(user_id = %request.user_id(), method = %method))]
    pub async fn place_order(
        &self,
        method: OrderStatus,
        request: OrderRequest,
        billing: BillingData,
    ) -> Result<PlaceOrderOutcome, CheckoutError> {
        let result = match method {
            OrderStatus::CashOnDelivery => self.cash_on_delivery(&request).await,
            OrderStatus::OnlinePayment => self.online_payment(&request, billing).await,
        };

        if let Err(e) = &result {
            metrics::counter!(
                "order_placement_failures_total",
                "method" => method.as_str(),
                "reason" => failure_reason(e)
            )
            .increment(1);
            tracing::warn!(error = %e, "order placement failed");
        }

        result
    }

    /// Assembles a cash-on-delivery order.
    pub async fn cash_on_delivery(
        &self,
        request: &OrderRequest,
    ) -> Result<PlaceOrderOutcome, CheckoutError> {
        let order = self
            .assembler
            .create_order(OrderStatus::CashOnDelivery, request, generate_order_number())
            .await?;
        Ok(PlaceOrderOutcome::Assembled(order))
    }

    /// Assembles a provisional order and opens a payment session for it.
    ///
    /// If the gateway fails, the provisional order is discarded and its stock
    /// restored before `PaymentUnavailable` is returned.
    pub async fn online_payment(
        &self,
        request: &OrderRequest,
        billing: BillingData,
    ) -> Result<PlaceOrderOutcome, CheckoutError> {
        let catalog = self
            .orders
            .catalog_snapshot(&request.product_ids())
            .await?;
        let quoted = PricingCalculator::total_price(request.lines(), &catalog)?;
        tracing::debug!(quoted = %quoted, "online payment quote");

        let mut order = self
            .assembler
            .create_order(OrderStatus::OnlinePayment, request, generate_order_number())
            .await?;

        let session = match self
            .gateway
            .pay(PaymentRequest::for_order(&order, billing))
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, order_number = %order.order_number, "payment gateway failed");
                self.discard_quietly(&order).await;
                return Err(CheckoutError::PaymentUnavailable(e));
            }
        };

        if let Err(e) = self
            .orders
            .record_payment_reference(order.id, &session.gateway_order_id)
            .await
        {
            self.discard_quietly(&order).await;
            return Err(e.into());
        }
        order.payment_reference = Some(session.gateway_order_id);

        Ok(PlaceOrderOutcome::PendingPayment {
            order,
            payment_url: session.url,
        })
    }

    async fn discard_quietly(&self, order: &Order) {
        if let Err(e) = self.assembler.discard_order(order.id).await {
            tracing::error!(error = %e, order_number = %order.order_number, "failed to discard provisional order");
        }
    }
}

fn failure_reason(e: &CheckoutError) -> &'static str {
    use domain::OrderError;

    match e {
        CheckoutError::Order(OrderError::InsufficientStock { .. }) => "insufficient_stock",
        CheckoutError::Order(OrderError::ProductNotFound(_))
        | CheckoutError::Order(OrderError::ProductNotInRequest(_)) => "product_not_found",
        CheckoutError::Order(_) => "invalid_order",
        CheckoutError::PaymentUnavailable(_) => "payment_unavailable",
        CheckoutError::Store(_) => "store",
        CheckoutError::CallbackVerificationFailed { .. } | CheckoutError::OrderNotFound(_) => {
            "other"
        }
    }
}
