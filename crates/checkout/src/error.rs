//! Checkout error types.

use common::OrderId;
use domain::{DomainError, OrderError};
use payment::PaymentError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while placing an order or reconciling a payment.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// An order rule was violated (unknown product, insufficient stock, ...).
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The gateway could not open a payment session.
    #[error("Payment unavailable: {0}")]
    PaymentUnavailable(#[source] PaymentError),

    /// A payment callback was forged, failed or matched no order.
    #[error("Payment callback rejected: {reason}")]
    CallbackVerificationFailed { reason: String },

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

impl From<DomainError> for CheckoutError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Order(OrderError::OrderNotFound(id)) => CheckoutError::OrderNotFound(id),
            DomainError::Order(e) => CheckoutError::Order(e),
            DomainError::Store(e) => CheckoutError::Store(e),
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use common::ProductId;

    use super::*;

    #[test]
    fn test_domain_errors_keep_their_kind() {
        let err: CheckoutError = DomainError::Order(OrderError::ProductNotFound(ProductId::new(3))).into();
        assert!(matches!(err, CheckoutError::Order(OrderError::ProductNotFound(_))));

        let err: CheckoutError = DomainError::Order(OrderError::OrderNotFound(OrderId::new(9))).into();
        assert!(matches!(err, CheckoutError::OrderNotFound(id) if id == OrderId::new(9)));
    }

    #[test]
    fn test_order_errors_display_transparently() {
        let err = CheckoutError::Order(OrderError::InsufficientStock {
            product_id: ProductId::new(1),
            product_name: "Widget".to_string(),
            requested: 3,
            available: 1,
        });
        assert_eq!(err.to_string(), "Insufficient stock available for product: Widget");
    }
}
