//! Order placement and order lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use checkout::{CallbackReconciler, OrderWorkflow, PlaceOrderOutcome};
use common::{OrderId, OrderStatus, ProductId, UserId};
use domain::{OrderLineRequest, OrderRequest, OrderService};
use payment::{BillingData, PaymentGateway};
use serde::{Deserialize, Serialize};
use store::{Order, Store};
use validator::Validate;

use super::{ApiResponse, success};
use crate::error::{ApiError, FieldErrors, field_errors};

const STATUS_MESSAGE: &str = "Status must be either cash on delivery or online payment.";
const QUANTITY_TOO_LARGE: &str = "Each product quantity is too large.";

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store, G: PaymentGateway> {
    pub workflow: OrderWorkflow<S, G>,
    pub reconciler: CallbackReconciler<S>,
}

impl<S: Store + Clone, G: PaymentGateway> AppState<S, G> {
    /// Wires the workflow and the callback reconciler over one store.
    pub fn new(store: S, gateway: G) -> Self {
        let reconciler = CallbackReconciler::new(store.clone(), gateway.hmac_secret());
        Self {
            workflow: OrderWorkflow::new(store, gateway),
            reconciler,
        }
    }

    /// Returns the read-side order service.
    pub fn orders(&self) -> &OrderService<S> {
        self.workflow.orders()
    }
}

// -- Request types --

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderBody {
    #[validate(required(message = "User ID is required."))]
    pub user_id: Option<i64>,

    #[validate(
        required(message = "At least one product is required."),
        length(min = 1, message = "At least one product is required."),
        nested
    )]
    pub products: Option<Vec<ProductLineBody>>,

    #[validate(required(message = "Status is required."))]
    pub status: Option<String>,

    /// Billing details forwarded to the gateway; omitted fields are sent as `"NA"`.
    #[serde(default)]
    pub billing: Option<BillingData>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProductLineBody {
    #[validate(required(message = "Each product must be specified."))]
    pub id: Option<i64>,

    #[validate(
        required(message = "Each product quantity is required."),
        range(min = 1, message = "Each product quantity must be at least 1.")
    )]
    pub quantity: Option<i64>,
}

impl PlaceOrderBody {
    /// Validates the body and converts it into a placement request.
    ///
    /// All field failures are reported together.
    pub fn into_request(self) -> Result<(OrderStatus, OrderRequest, BillingData), ApiError> {
        let mut fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => field_errors(&errors),
        };

        let method = match self.status.as_deref().map(str::parse::<OrderStatus>) {
            Some(Ok(method)) => Some(method),
            Some(Err(_)) => {
                fields
                    .entry("status".to_string())
                    .or_default()
                    .push(STATUS_MESSAGE.to_string());
                None
            }
            None => None,
        };

        for (index, line) in self.products.iter().flatten().enumerate() {
            if line.quantity.is_some_and(|q| q > i64::from(u32::MAX)) {
                fields
                    .entry(format!("products.{index}.quantity"))
                    .or_default()
                    .push(QUANTITY_TOO_LARGE.to_string());
            }
        }

        if !fields.is_empty() {
            return Err(ApiError::Validation(fields));
        }
        let (Some(user_id), Some(products), Some(method)) = (self.user_id, self.products, method)
        else {
            return Err(ApiError::Validation(fields));
        };

        let lines = products.iter().filter_map(|line| {
            let quantity = u32::try_from(line.quantity?).ok()?;
            Some(OrderLineRequest::new(line.id?, quantity))
        });
        let request = OrderRequest::new(user_id, lines)?;

        Ok((method, request, self.billing.unwrap_or_default()))
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub total_price: f64,
    pub status: OrderStatus,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub products: Vec<OrderProductResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderProductResponse {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct PaymentUrlResponse {
    pub url: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            user_id: order.user_id,
            total_price: order.total_price.as_major(),
            status: order.status,
            paid: order.is_paid(),
            paid_at: order.paid_at,
            created_at: order.created_at,
            products: order
                .lines
                .iter()
                .map(|line| OrderProductResponse {
                    id: line.product_id,
                    name: line.product_name.clone(),
                    price: line.unit_price.as_major(),
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders: places a cash-on-delivery or online-payment order.
#[tracing::instrument(skip(state, payload))]
pub async fn create<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    payload: Result<Json<PlaceOrderBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let Json(body) = payload?;
    let (method, request, billing) = body.into_request()?;

    let outcome = state.workflow.place_order(method, request, billing).await?;

    let response = match outcome {
        PlaceOrderOutcome::Assembled(order) => success(
            "Order has been created successfully",
            OrderResponse::from(&order),
        )
        .into_response(),
        PlaceOrderOutcome::PendingPayment { payment_url, .. } => success(
            "Order is ready to be paid",
            PaymentUrlResponse { url: payment_url },
        )
        .into_response(),
    };
    Ok(response)
}

/// GET /orders: lists every order, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError>
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let orders = state.orders().list_orders().await?;
    Ok(success(
        "Orders have been retrieved successfully",
        orders.iter().map(OrderResponse::from).collect(),
    ))
}

/// GET /orders/{id}: loads one order with its products.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError>
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let order = state
        .orders()
        .get_order(OrderId::new(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(success(
        "Order has been retrieved successfully",
        OrderResponse::from(&order),
    ))
}

/// GET /users/{user_id}/orders: lists one customer's orders.
#[tracing::instrument(skip(state))]
pub async fn list_for_user<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ApiError>
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let orders = state
        .orders()
        .list_orders_for_user(UserId::new(user_id))
        .await?;
    Ok(success(
        "Orders have been retrieved successfully",
        orders.iter().map(OrderResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: serde_json::Value) -> PlaceOrderBody {
        serde_json::from_value(value).unwrap()
    }

    fn validation_fields(err: ApiError) -> FieldErrors {
        match err {
            ApiError::Validation(fields) => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_body_converts() {
        let (method, request, billing) = body(json!({
            "user_id": 7,
            "products": [{ "id": 1, "quantity": 2 }, { "id": 1, "quantity": 1 }],
            "status": "online_payment",
            "billing": { "email": "buyer@example.com" }
        }))
        .into_request()
        .unwrap();

        assert_eq!(method, OrderStatus::OnlinePayment);
        assert_eq!(request.user_id(), UserId::new(7));
        assert_eq!(request.lines().len(), 1);
        assert_eq!(request.lines()[0].quantity, 3);
        assert_eq!(billing.email, "buyer@example.com");
        assert_eq!(billing.first_name, "NA");
    }

    #[test]
    fn test_missing_fields_are_reported_together() {
        let fields = validation_fields(body(json!({})).into_request().unwrap_err());

        assert_eq!(fields["user_id"], vec!["User ID is required."]);
        assert_eq!(fields["products"], vec!["At least one product is required."]);
        assert_eq!(fields["status"], vec!["Status is required."]);
    }

    #[test]
    fn test_quantity_beyond_u32_is_rejected() {
        let fields = validation_fields(
            body(json!({
                "user_id": 1,
                "products": [{ "id": 1, "quantity": 4_294_967_296i64 }],
                "status": "cash_on_delivery"
            }))
            .into_request()
            .unwrap_err(),
        );

        assert_eq!(fields["products.0.quantity"], vec![QUANTITY_TOO_LARGE]);
    }

    #[test]
    fn test_unknown_status_and_zero_quantity() {
        let fields = validation_fields(
            body(json!({
                "user_id": 1,
                "products": [{ "id": 1, "quantity": 0 }],
                "status": "barter"
            }))
            .into_request()
            .unwrap_err(),
        );

        assert_eq!(fields["status"], vec![STATUS_MESSAGE]);
        assert_eq!(
            fields["products.0.quantity"],
            vec!["Each product quantity must be at least 1."]
        );
    }
}
