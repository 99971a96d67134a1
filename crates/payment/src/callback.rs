//! Paymob transaction callback parsing and HMAC verification.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::{PaymentError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Fields covered by the callback signature, in signing order.
pub const HMAC_FIELDS: [&str; 20] = [
    "amount_cents",
    "created_at",
    "currency",
    "error_occured",
    "has_parent_transaction",
    "id",
    "integration_id",
    "is_3d_secure",
    "is_auth",
    "is_capture",
    "is_refunded",
    "is_standalone_payment",
    "is_voided",
    "order",
    "owner",
    "pending",
    "source_data_pan",
    "source_data_sub_type",
    "source_data_type",
    "success",
];

/// Callback fields keyed by normalized name, in lexicographic key order.
///
/// Nested names arrive dotted (`source_data.pan`) in query strings; they are
/// stored with underscores (`source_data_pan`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackPayload {
    fields: BTreeMap<String, String>,
}

impl CallbackPayload {
    /// Builds a payload from raw key/value pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().replace('.', "_"), v.into()))
            .collect();
        Self { fields }
    }

    /// Returns a field by normalized name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Returns the signature the gateway sent.
    pub fn signature(&self) -> Option<&str> {
        self.get("hmac")
    }

    /// Returns the gateway order id this transaction belongs to.
    pub fn order_reference(&self) -> Option<&str> {
        self.get("order").filter(|v| !v.is_empty())
    }

    /// Returns true if the gateway reports the transaction as successful.
    pub fn is_success(&self) -> bool {
        self.get("success") == Some("true")
    }

    /// Concatenates the signed field values in key order.
    ///
    /// Signed fields absent from the payload contribute nothing.
    pub fn signed_string(&self) -> String {
        self.fields
            .iter()
            .filter(|(key, _)| HMAC_FIELDS.contains(&key.as_str()))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

fn mac_for(payload: &CallbackPayload, secret: &str) -> Result<HmacSha512> {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidKey)?;
    mac.update(payload.signed_string().as_bytes());
    Ok(mac)
}

/// Computes the hex-encoded HMAC-SHA512 of the signed fields.
pub fn compute_hmac(payload: &CallbackPayload, secret: &str) -> Result<String> {
    Ok(hex::encode(mac_for(payload, secret)?.finalize().into_bytes()))
}

/// Verifies the payload's `hmac` field in constant time.
pub fn verify_signature(payload: &CallbackPayload, secret: &str) -> Result<()> {
    let signature = payload.signature().ok_or(PaymentError::MissingSignature)?;
    let expected =
        hex::decode(signature.trim().to_ascii_lowercase()).map_err(|_| PaymentError::SignatureMismatch)?;

    mac_for(payload, secret)?
        .verify_slice(&expected)
        .map_err(|_| PaymentError::SignatureMismatch)
}
