//! Central API error type.
//!
//! Every failure class gets a variant and a status code; handlers bubble
//! them up with `?` instead of formatting ad hoc responses.

use crate::domain::aggregates::{CartError, ConsultationError, OrderError, ProductError};
use crate::domain::value_objects::ReferenceError;
use crate::payments::PaymentError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Consultation(#[from] ConsultationError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("payment verification failed: {0}")]
    Payment(#[from] PaymentError),

    #[error("payment amount mismatch: expected {expected} {currency}, provider reports {actual}")]
    PaymentMismatch {
        expected: i64,
        actual: i64,
        currency: String,
    },

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::Reference(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Product(ProductError::InsufficientStock) => StatusCode::CONFLICT,
            ApiError::Product(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
            ApiError::Order(OrderError::InvalidTransition { .. })
            | ApiError::Consultation(ConsultationError::InvalidTransition { .. }) => {
                StatusCode::CONFLICT
            }
            ApiError::Order(OrderError::NoItems) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Payment(PaymentError::Declined { .. }) | ApiError::PaymentMismatch { .. } => {
                StatusCode::PAYMENT_REQUIRED
            }
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        // Internal details stay in the log, not the wire.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn validation_errors(errors: validator::ValidationErrors) -> ApiError {
    ApiError::Validation(errors.to_string().replace('\n', "; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::NotFound("order").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Product(ProductError::InsufficientStock).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::PaymentMismatch {
                expected: 100,
                actual: 50,
                currency: "NGN".into()
            }
            .status(),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn database_detail_is_not_leaked() {
        let err = ApiError::Database(sqlx::Error::PoolClosed);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
