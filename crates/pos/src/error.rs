//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::cart::CartError;
use crate::shop_api::ShopApiError;

/// Application-level error type for the POS.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shop backend API operation failed.
    #[error("Shop API error: {0}")]
    ShopApi(#[from] ShopApiError),

    /// Cart operation was refused.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures to Sentry; cart refusals are expected
        // register-level outcomes and stay local.
        if matches!(self, Self::ShopApi(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::ShopApi(_) => StatusCode::BAD_GATEWAY,
            Self::Cart(err) => match err {
                CartError::IncompleteSelection { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CartError::OutOfStock { .. } => StatusCode::CONFLICT,
                CartError::UnknownItem(_) => StatusCode::NOT_FOUND,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose backend error details to clients
        let message = match &self {
            Self::ShopApi(_) => "Shop backend error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tindahan_core::ProductId;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("item 123".to_string());
        assert_eq!(err.to_string(), "Not found: item 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_cart_error_status_codes() {
        assert_eq!(
            status_of(AppError::Cart(CartError::IncompleteSelection {
                item: "T-Shirt".to_string(),
                axis: "size".to_string(),
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Cart(CartError::OutOfStock {
                item: "Candle".to_string(),
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Cart(CartError::UnknownItem(ProductId::new(9)))),
            StatusCode::NOT_FOUND
        );
    }
}
