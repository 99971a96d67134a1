//! Payment gateway trait and request types.

use async_trait::async_trait;
use common::Money;
use serde::{Deserialize, Serialize};
use store::Order;

use crate::Result;

/// One line item as reported to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayItem {
    pub name: String,
    /// Unit price in minor units.
    pub amount_cents: i64,
    pub description: String,
    pub quantity: u32,
}

/// Customer billing details required by the gateway.
///
/// Fields the storefront does not collect are sent as `"NA"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub apartment: String,
    pub floor: String,
    pub street: String,
    pub building: String,
    pub shipping_method: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub state: String,
}

impl Default for BillingData {
    fn default() -> Self {
        let na = || "NA".to_string();
        Self {
            first_name: na(),
            last_name: na(),
            email: na(),
            phone_number: na(),
            apartment: na(),
            floor: na(),
            street: na(),
            building: na(),
            shipping_method: na(),
            postal_code: na(),
            city: na(),
            country: na(),
            state: na(),
        }
    }
}

/// Everything a gateway needs to open a payment session for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    /// Our order number, echoed back by the gateway.
    pub merchant_order_id: String,
    pub amount: Money,
    pub items: Vec<GatewayItem>,
    pub billing: BillingData,
}

impl PaymentRequest {
    /// Builds a request whose items mirror the order's lines.
    pub fn for_order(order: &Order, billing: BillingData) -> Self {
        let items = order
            .lines
            .iter()
            .map(|line| GatewayItem {
                name: line.product_name.clone(),
                amount_cents: line.unit_price.cents(),
                description: line.product_name.clone(),
                quantity: line.quantity,
            })
            .collect();

        Self {
            merchant_order_id: order.order_number.clone(),
            amount: order.total_price,
            items,
            billing,
        }
    }
}

/// An opened payment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// The gateway's id for the order; the callback refers to it.
    pub gateway_order_id: String,
    pub payment_token: String,
    /// Hosted payment page the customer is sent to.
    pub url: String,
}

/// Trait for payment gateways.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers the order with the gateway and opens a payment session.
    async fn pay(&self, request: PaymentRequest) -> Result<PaymentSession>;

    /// Returns the shared secret callbacks are signed with.
    fn hmac_secret(&self) -> &str;
}
