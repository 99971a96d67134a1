//! HTTP API server with observability for the storefront order service.
//!
//! Provides REST endpoints for order placement, payment callbacks and order
//! lookup, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use payment::PaymentGateway;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            get(routes::orders::list::<S, G>).post(routes::orders::create::<S, G>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route(
            "/users/{user_id}/orders",
            get(routes::orders::list_for_user::<S, G>),
        )
        .route(
            "/callback",
            get(routes::callback::get::<S, G>).post(routes::callback::post::<S, G>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a store and a payment gateway.
pub fn create_state<S, G>(store: S, gateway: G) -> Arc<AppState<S, G>>
where
    S: Store + Clone + 'static,
    G: PaymentGateway + 'static,
{
    Arc::new(AppState::new(store, gateway))
}
