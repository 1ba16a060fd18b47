//! Unified error handling for the HTTP surface.
//!
//! Route handlers return `Result<T, AppError>`; the `IntoResponse` impl maps
//! each typed failure onto an HTTP status and a JSON `{"message": ...}` body
//! without exposing internals.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use tourline_core::EmailError;

use crate::services::{CartError, OrderError, OtpError};
use crate::store::RepositoryError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Verification code operation failed.
    #[error("otp error: {0}")]
    Otp(#[from] OtpError),

    /// Cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Order operation failed.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Malformed email address in the request.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Bad request from the client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or malformed principal.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

fn repo_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::Conflict(_) | RepositoryError::ReferentialConflict(_) => {
            StatusCode::CONFLICT
        }
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Otp(err) => match err {
                OtpError::NotFound => StatusCode::NOT_FOUND,
                OtpError::Expired => StatusCode::BAD_REQUEST,
                OtpError::DeliveryFailed => StatusCode::BAD_GATEWAY,
                OtpError::Repository(inner) => repo_status(inner),
            },
            Self::Cart(err) => match err {
                CartError::TourNotFound | CartError::NotFound | CartError::UserNotFound => {
                    StatusCode::NOT_FOUND
                }
                CartError::InvalidQuantity | CartError::EmptyCart => StatusCode::BAD_REQUEST,
                CartError::Repository(inner) => repo_status(inner),
            },
            Self::Order(err) => match err {
                OrderError::OrderNotFound => StatusCode::NOT_FOUND,
                OrderError::IllegalTransition { .. }
                | OrderError::TerminalState(_)
                | OrderError::ReferentialConflict => StatusCode::CONFLICT,
                OrderError::Repository(inner) => repo_status(inner),
            },
            Self::Repository(inner) => repo_status(inner),
            Self::InvalidEmail(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return "internal server error".to_owned();
        }
        match self {
            Self::Otp(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Repository(err) => err.to_string(),
            Self::InvalidEmail(err) => err.to_string(),
            Self::BadRequest(msg) | Self::Unauthorized(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request error");
        }
        let message = self.public_message(status);
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Otp(OtpError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Otp(OtpError::Expired)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Otp(OtpError::DeliveryFailed)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(AppError::Cart(CartError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Order(OrderError::TerminalState(
                tourline_core::OrderStatus::Delivered
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Repository(RepositoryError::Conflict(
                "duplicate".to_owned()
            ))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Unauthorized("no principal".to_owned())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Repository(RepositoryError::DataCorruption("bad row".to_owned()));
        let status = err.status_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(status), "internal server error");
    }
}
