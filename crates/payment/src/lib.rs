//! Payment gateway integration for the storefront order service.
//!
//! Provides the [`PaymentGateway`] seam the checkout workflow pays through,
//! the Paymob implementation of it, an in-memory gateway for tests, and
//! verification of the signed transaction callback Paymob sends back.

pub mod callback;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod paymob;

pub use callback::{CallbackPayload, HMAC_FIELDS, compute_hmac, verify_signature};
pub use error::{PaymentError, Result};
pub use gateway::{BillingData, GatewayItem, PaymentGateway, PaymentRequest, PaymentSession};
pub use memory::InMemoryPaymentGateway;
pub use paymob::{PaymobConfig, PaymobGateway};
