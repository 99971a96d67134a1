//! Payment error types.

use thiserror::Error;

/// Errors raised by payment gateways and callback verification.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("Payment gateway request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The gateway answered with a non-success status.
    #[error("Payment gateway returned {status} for {endpoint}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The gateway answered with a body we could not decode.
    #[error("Payment gateway response from {endpoint} could not be decoded: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The gateway declined to open a payment session.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The HTTP client could not be built.
    #[error("Payment client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    /// The callback carries no `hmac` field.
    #[error("Callback signature is missing")]
    MissingSignature,

    /// The shared secret cannot key an HMAC.
    #[error("Invalid HMAC key")]
    InvalidKey,

    /// The callback signature does not match its fields.
    #[error("Callback signature mismatch")]
    SignatureMismatch,
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
