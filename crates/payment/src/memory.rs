//! In-memory payment gateway for tests and local development.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::gateway::{PaymentGateway, PaymentRequest, PaymentSession};
use crate::{PaymentError, Result};

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    requests: Vec<PaymentRequest>,
    next_id: u32,
    fail_on_pay: bool,
}

/// Gateway that opens sessions locally and records every request.
///
/// Gateway order ids are sequential (`"1"`, `"2"`, ...) and payment URLs
/// point at `https://payments.invalid`.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<InMemoryGatewayState>>,
    hmac_secret: String,
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self::new("in-memory-hmac-secret")
    }
}

impl InMemoryPaymentGateway {
    /// Creates a gateway whose callbacks are signed with `hmac_secret`.
    pub fn new(hmac_secret: impl Into<String>) -> Self {
        Self {
            state: Arc::default(),
            hmac_secret: hmac_secret.into(),
        }
    }

    fn state(&self) -> MutexGuard<'_, InMemoryGatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures the gateway to fail every `pay` call.
    pub fn set_fail_on_pay(&self, fail: bool) {
        self.state().fail_on_pay = fail;
    }

    /// Returns the number of sessions opened.
    pub fn session_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Returns the requests of every opened session, oldest first.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.state().requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn pay(&self, request: PaymentRequest) -> Result<PaymentSession> {
        let mut state = self.state();

        if state.fail_on_pay {
            return Err(PaymentError::Declined("gateway unavailable".to_string()));
        }

        state.next_id += 1;
        let gateway_order_id = state.next_id.to_string();
        let payment_token = format!("TOKEN-{:04}", state.next_id);
        let url = format!("https://payments.invalid/iframes/1?payment_token={payment_token}");
        state.requests.push(request);

        Ok(PaymentSession {
            gateway_order_id,
            payment_token,
            url,
        })
    }

    fn hmac_secret(&self) -> &str {
        &self.hmac_secret
    }
}
