//! Payment gateway callback endpoints.
//!
//! Paymob redirects the customer with the transaction fields in the query
//! string and may also post them as a form; both carry the `hmac` signature.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, Query, State};
use payment::{CallbackPayload, PaymentGateway};
use store::Store;

use super::orders::{AppState, OrderResponse};
use super::{ApiResponse, success};
use crate::error::ApiError;

type CallbackResult = Result<Json<ApiResponse<OrderResponse>>, ApiError>;

/// GET /callback: transaction fields as query parameters.
#[tracing::instrument(skip(state, pairs))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> CallbackResult
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    reconcile(&state, pairs).await
}

/// POST /callback: transaction fields as a urlencoded form.
#[tracing::instrument(skip(state, pairs))]
pub async fn post<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> CallbackResult
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    reconcile(&state, pairs).await
}

async fn reconcile<S, G>(state: &AppState<S, G>, pairs: Vec<(String, String)>) -> CallbackResult
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let payload = CallbackPayload::from_pairs(pairs);
    let order = state.reconciler.callback(&payload).await?;

    Ok(success(
        "Order has been created successfully",
        OrderResponse::from(&order),
    ))
}
