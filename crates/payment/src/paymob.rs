//! Paymob Accept integration over its REST API.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::gateway::{BillingData, GatewayItem, PaymentGateway, PaymentRequest, PaymentSession};
use crate::{PaymentError, Result};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://accept.paymob.com/api";

/// Default hosted payment page root.
pub const DEFAULT_IFRAME_URL: &str = "https://accept.paymob.com/api/acceptance/iframes";

/// Payment keys stay valid for one hour.
const PAYMENT_KEY_EXPIRATION_SECS: u64 = 3600;

/// Paymob account settings.
#[derive(Clone)]
pub struct PaymobConfig {
    pub api_key: String,
    pub integration_id: i64,
    pub iframe_id: String,
    /// Shared secret the transaction callback is signed with.
    pub hmac_secret: String,
    pub base_url: String,
    pub iframe_url: String,
    pub currency: String,
}

impl PaymobConfig {
    /// Creates a config pointing at the public Paymob endpoints, in EGP.
    pub fn new(
        api_key: impl Into<String>,
        integration_id: i64,
        iframe_id: impl Into<String>,
        hmac_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            integration_id,
            iframe_id: iframe_id.into(),
            hmac_secret: hmac_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            iframe_url: DEFAULT_IFRAME_URL.to_string(),
            currency: "EGP".to_string(),
        }
    }
}

impl fmt::Debug for PaymobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymobConfig")
            .field("api_key", &"<redacted>")
            .field("integration_id", &self.integration_id)
            .field("iframe_id", &self.iframe_id)
            .field("hmac_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("iframe_url", &self.iframe_url)
            .field("currency", &self.currency)
            .finish()
    }
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
struct OrderRegistration<'a> {
    auth_token: &'a str,
    delivery_needed: &'static str,
    amount_cents: i64,
    currency: &'a str,
    merchant_order_id: &'a str,
    items: &'a [GatewayItem],
}

#[derive(Deserialize)]
struct OrderRegistrationResponse {
    id: i64,
}

#[derive(Serialize)]
struct PaymentKeyRequest<'a> {
    auth_token: &'a str,
    amount_cents: i64,
    expiration: u64,
    order_id: &'a str,
    billing_data: &'a BillingData,
    currency: &'a str,
    integration_id: i64,
}

/// Gateway talking to Paymob Accept.
///
/// Each call is bounded by the client timeout and never retried.
#[derive(Debug, Clone)]
pub struct PaymobGateway {
    client: reqwest::Client,
    config: PaymobConfig,
}

impl PaymobGateway {
    /// Creates a gateway whose requests time out after `timeout`.
    pub fn new(config: PaymobConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    /// Exchanges the API key for an auth token.
    pub async fn get_token(&self) -> Result<String> {
        let response: TokenResponse = self
            .post_json(
                "auth/tokens",
                &AuthRequest {
                    api_key: &self.config.api_key,
                },
            )
            .await?;
        Ok(response.token)
    }

    /// Registers the order and returns the gateway's order id.
    pub async fn create_order(&self, token: &str, request: &PaymentRequest) -> Result<String> {
        let response: OrderRegistrationResponse = self
            .post_json(
                "ecommerce/orders",
                &OrderRegistration {
                    auth_token: token,
                    delivery_needed: "false",
                    amount_cents: request.amount.cents(),
                    currency: &self.config.currency,
                    merchant_order_id: &request.merchant_order_id,
                    items: &request.items,
                },
            )
            .await?;
        Ok(response.id.to_string())
    }

    /// Requests a payment key for a registered order.
    pub async fn get_payment_token(
        &self,
        gateway_order_id: &str,
        token: &str,
        request: &PaymentRequest,
    ) -> Result<String> {
        let response: TokenResponse = self
            .post_json(
                "acceptance/payment_keys",
                &PaymentKeyRequest {
                    auth_token: token,
                    amount_cents: request.amount.cents(),
                    expiration: PAYMENT_KEY_EXPIRATION_SECS,
                    order_id: gateway_order_id,
                    billing_data: &request.billing,
                    currency: &self.config.currency,
                    integration_id: self.config.integration_id,
                },
            )
            .await?;
        Ok(response.token)
    }

    /// Returns the hosted payment page for a payment key.
    pub fn iframe_url(&self, payment_token: &str) -> String {
        format!(
            "{}/{}?payment_token={}",
            self.config.iframe_url.trim_end_matches('/'),
            self.config.iframe_id,
            payment_token
        )
    }

    async fn post_json<B, T>(&self, endpoint: &'static str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| PaymentError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, status = status.as_u16(), "payment gateway rejected request");
            return Err(PaymentError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|source| PaymentError::Decode { endpoint, source })
    }
}

#[async_trait]
impl PaymentGateway for PaymobGateway {
    #[tracing::instrument(skip(self, request), fields(merchant_order_id = %request.merchant_order_id, amount = %request.amount))]
    async fn pay(&self, request: PaymentRequest) -> Result<PaymentSession> {
        let start = Instant::now();

        let result: Result<PaymentSession> = async {
            let token = self.get_token().await?;
            let gateway_order_id = self.create_order(&token, &request).await?;
            let payment_token = self
                .get_payment_token(&gateway_order_id, &token, &request)
                .await?;
            let url = self.iframe_url(&payment_token);
            Ok(PaymentSession {
                gateway_order_id,
                payment_token,
                url,
            })
        }
        .await;

        metrics::histogram!("payment_gateway_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        let outcome = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!("payment_gateway_requests_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(session) => {
                tracing::info!(gateway_order_id = %session.gateway_order_id, "payment session opened")
            }
            Err(e) => tracing::error!(error = %e, "payment session failed"),
        }

        result
    }

    fn hmac_secret(&self) -> &str {
        &self.config.hmac_secret
    }
}
