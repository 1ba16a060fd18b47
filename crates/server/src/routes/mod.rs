//! HTTP route handlers for the fulfillment API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//! GET    /health/ready              - Readiness check (storage ping)
//!
//! # Auth
//! POST   /api/auth/register         - Register an account + issue OTP
//! POST   /api/auth/otp              - Re-issue an OTP
//! POST   /api/auth/verify           - Redeem an OTP, mark account verified
//!
//! # Cart (principal from x-user-id)
//! GET    /api/cart                  - Cart content
//! POST   /api/cart/items            - Add a tour to the cart
//! PUT    /api/cart/items/{id}       - Update a line's quantity
//! DELETE /api/cart/items/{id}       - Remove a line
//! POST   /api/cart/checkout         - Convert the cart into an order
//!
//! # Orders
//! GET    /api/orders/{id}           - Order with its lines
//! POST   /api/orders/{id}/status    - Transition the order status
//! DELETE /api/orders/{id}           - Delete the order and its lines
//! ```
//!
//! The caller's identity arrives as an `x-user-id` header set by the
//! fronting auth proxy; session issuance is not this service's concern.

pub mod auth;
pub mod cart;
pub mod orders;

use axum::{
    Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    routing::{get, post, put},
};

use tourline_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, extracted from the `x-user-id` header.
#[derive(Debug, Clone, Copy)]
pub struct Principal(pub UserId);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing x-user-id header".to_owned()))?;
        let id: i32 = raw
            .parse()
            .map_err(|_| AppError::Unauthorized("malformed x-user-id header".to_owned()))?;
        Ok(Self(UserId::new(id)))
    }
}

/// API routes, to be merged into the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/otp", post(auth::resend_otp))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/api/cart/checkout", post(cart::checkout))
        .route(
            "/api/orders/{id}",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/api/orders/{id}/status", post(orders::update_status))
}

/// Liveness health check endpoint.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies storage connectivity before returning OK.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
