//! Order status (payment method) with its stored code and wire name.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Payment method chosen for an order.
///
/// Stored as a small integer code and rendered to clients by name. The field
/// records the payment method only; provisional online orders are tracked by
/// the absence of a confirmed payment, not by a status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    CashOnDelivery,
    OnlinePayment,
}

/// Bidirectional lookup table: wire name ↔ stored code.
const STATUS_TABLE: [(OrderStatus, &str, i16); 2] = [
    (OrderStatus::CashOnDelivery, "cash_on_delivery", 0),
    (OrderStatus::OnlinePayment, "online_payment", 1),
];

/// Raised when a name or code does not map to an [`OrderStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownOrderStatus {
    #[error("unknown order status name: {0}")]
    Name(String),

    #[error("unknown order status code: {0}")]
    Code(i16),
}

impl OrderStatus {
    /// All statuses in code order.
    pub const ALL: [OrderStatus; 2] = [OrderStatus::CashOnDelivery, OrderStatus::OnlinePayment];

    /// Returns the wire name (`"cash_on_delivery"` / `"online_payment"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::CashOnDelivery => "cash_on_delivery",
            OrderStatus::OnlinePayment => "online_payment",
        }
    }

    /// Returns the stored integer code.
    pub fn code(&self) -> i16 {
        match self {
            OrderStatus::CashOnDelivery => 0,
            OrderStatus::OnlinePayment => 1,
        }
    }

    /// Looks up a status by its stored code.
    pub fn from_code(code: i16) -> Result<Self, UnknownOrderStatus> {
        STATUS_TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|(status, _, _)| *status)
            .ok_or(UnknownOrderStatus::Code(code))
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STATUS_TABLE
            .iter()
            .find(|(_, name, _)| *name == s)
            .map(|(status, _, _)| *status)
            .ok_or_else(|| UnknownOrderStatus::Name(s.to_string()))
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = UnknownOrderStatus;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_table() {
        assert_eq!(OrderStatus::CashOnDelivery.code(), 0);
        assert_eq!(OrderStatus::OnlinePayment.code(), 1);
    }

    #[test]
    fn test_table_agrees_with_accessors() {
        for (status, name, code) in STATUS_TABLE {
            assert_eq!(status.as_str(), name);
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_lookup_is_bidirectional() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(status.code()), Ok(status));
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_values_are_rejected() {
        assert_eq!(
            "pending".parse::<OrderStatus>(),
            Err(UnknownOrderStatus::Name("pending".to_string()))
        );
        assert_eq!(OrderStatus::try_from(7), Err(UnknownOrderStatus::Code(7)));
    }

    #[test]
    fn test_serializes_by_name() {
        let json = serde_json::to_string(&OrderStatus::OnlinePayment).unwrap();
        assert_eq!(json, "\"online_payment\"");

        let status: OrderStatus = serde_json::from_str("\"cash_on_delivery\"").unwrap();
        assert_eq!(status, OrderStatus::CashOnDelivery);
        assert!(serde_json::from_str::<OrderStatus>("\"card\"").is_err());
    }
}
