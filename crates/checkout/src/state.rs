//! Checkout state machine.

use serde::{Deserialize, Serialize};
use store::Order;

/// Where an order stands in checkout.
///
/// State transitions:
/// ```text
/// Requested ──┬──► Assembled                      (cash on delivery)
///             └──► PendingPayment ──┬──► Confirmed
///                                   └──► Rejected (order deleted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// The request has not been assembled yet.
    #[default]
    Requested,

    /// A cash-on-delivery order was committed (terminal state).
    Assembled,

    /// An online-payment order awaits its gateway callback.
    PendingPayment,

    /// A verified callback confirmed payment (terminal state).
    Confirmed,

    /// Payment failed and the order was discarded (terminal state).
    Rejected,
}

impl CheckoutState {
    /// Returns the state of a persisted order.
    pub fn of(order: &Order) -> Self {
        if order.is_paid() {
            CheckoutState::Confirmed
        } else if order.is_provisional() {
            CheckoutState::PendingPayment
        } else {
            CheckoutState::Assembled
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Requested => "requested",
            CheckoutState::Assembled => "assembled",
            CheckoutState::PendingPayment => "pending_payment",
            CheckoutState::Confirmed => "confirmed",
            CheckoutState::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
