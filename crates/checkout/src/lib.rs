//! Checkout orchestration for the storefront order service.
//!
//! Ties the ordering core to the payment gateway:
//! 1. Cash on delivery: assemble the order, done
//! 2. Online payment: assemble a provisional order, open a gateway session,
//!    then confirm or reject the order when the signed callback arrives
//!
//! A provisional order whose payment fails is deleted and its stock restored.

pub mod error;
pub mod reconciler;
pub mod state;
pub mod workflow;

pub use error::{CheckoutError, Result};
pub use reconciler::CallbackReconciler;
pub use state::CheckoutState;
pub use workflow::{OrderWorkflow, PlaceOrderOutcome};
