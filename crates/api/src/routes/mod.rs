//! HTTP route handlers and the success envelope they respond with.

pub mod callback;
pub mod health;
pub mod metrics;
pub mod orders;

use axum::Json;
use serde::Serialize;

/// Success envelope: `{status: true, message, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    pub message: &'static str,
    pub data: T,
}

/// Wraps `data` in a success envelope.
pub fn success<T: Serialize>(message: &'static str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status: true,
        message,
        data,
    })
}
