//! Tourline server - order fulfillment and account verification.
//!
//! # Architecture
//!
//! - Axum JSON API over the three workflow services
//!   ([`services::OtpLedger`], [`services::CartAggregator`],
//!   [`services::OrderStateMachine`])
//! - `PostgreSQL` persistence behind the [`store::Store`] trait, with an
//!   in-memory backend for tests and local development
//! - SMTP notifications via lettre, rendered from askama templates; delivery
//!   is best-effort and never rolls back committed state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router over the given state.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/health/ready", get(routes::readiness))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
