//! API error types with HTTP response mapping.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, OrderError};
use serde::Serialize;
use serde_json::{Value, json};
use validator::{ValidationErrors, ValidationErrorsKind};

/// Field name to messages, as rendered in a 422 body.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request body failed validation.
    Validation(FieldErrors),
    /// Resource not found.
    NotFound,
    /// Checkout, ordering or store failure.
    Checkout(CheckoutError),
}

/// Failure envelope: `{status: false, message, errors}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: bool,
    pub message: String,
    pub errors: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.".to_string(),
                json!(fields),
            ),
            ApiError::NotFound => not_found(),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        let body = ErrorBody {
            status: false,
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

fn not_found() -> (StatusCode, String, Value) {
    (
        StatusCode::NOT_FOUND,
        "No resource was found".to_string(),
        json!(["not found"]),
    )
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String, Value) {
    match &err {
        CheckoutError::Order(order_err) => match order_err {
            OrderError::InsufficientStock { .. } => (
                StatusCode::BAD_REQUEST,
                err.to_string(),
                json!(["insufficient stock"]),
            ),
            OrderError::ProductNotFound(_) | OrderError::ProductNotInRequest(_) => (
                StatusCode::NOT_FOUND,
                err.to_string(),
                json!(["product not found"]),
            ),
            OrderError::NoItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::TotalOverflow(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.".to_string(),
                json!({ "products": [err.to_string()] }),
            ),
            OrderError::NotProvisional(_) => {
                (StatusCode::CONFLICT, err.to_string(), json!(["conflict"]))
            }
            OrderError::OrderNotFound(_) => not_found(),
        },
        CheckoutError::OrderNotFound(_) => not_found(),
        CheckoutError::PaymentUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Payment service is unavailable".to_string(),
            json!(["payment unavailable"]),
        ),
        CheckoutError::CallbackVerificationFailed { .. } => (
            StatusCode::BAD_REQUEST,
            "Something wrong with payment".to_string(),
            json!(["something wrong"]),
        ),
        CheckoutError::Store(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                json!(["internal error"]),
            )
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Checkout(err.into())
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Checkout(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert("body".to_string(), vec![rejection.body_text()]);
        ApiError::Validation(fields)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(field_errors(&errors))
    }
}

/// Collects validation failures into the 422 field map.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    flatten(errors, "", &mut fields);
    fields
}

/// Flattens nested validation errors into `products.0.quantity` style keys.
fn flatten(errors: &ValidationErrors, prefix: &str, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.entry(key).or_default().extend(list.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                }));
            }
            ValidationErrorsKind::Struct(nested) => flatten(nested, &key, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(nested, &format!("{key}.{index}"), out);
                }
            }
        }
    }
}
