//! Order route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use tourline_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::models::{Order, OrderLine};
use crate::routes::Principal;
use crate::services::{OrderError, OrderStateMachine};
use crate::state::AppState;

/// Request body for a status transition.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target lifecycle status.
    pub status: OrderStatus,
}

/// Response body for order reads: the order and its lines.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// The order.
    pub order: Order,
    /// Its immutable line snapshot.
    pub lines: Vec<OrderLine>,
}

/// Fetch an order with its lines.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderResponse>> {
    let order_id = OrderId::new(order_id);
    let order = state
        .store()
        .order_by_id(order_id)
        .await
        .map_err(AppError::Repository)?
        .ok_or(AppError::Order(OrderError::OrderNotFound))?;
    let lines = state
        .store()
        .order_lines(order_id)
        .await
        .map_err(AppError::Repository)?;
    Ok(Json(OrderResponse { order, lines }))
}

/// Transition an order to a new lifecycle status.
pub async fn update_status(
    State(state): State<AppState>,
    Principal(actor): Principal,
    Path(order_id): Path<i32>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    let machine = OrderStateMachine::new(state.store(), state.notifier());
    let order = machine
        .transition(OrderId::new(order_id), req.status, actor)
        .await?;
    Ok(Json(order))
}

/// Delete an order and its lines.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<StatusCode> {
    let machine = OrderStateMachine::new(state.store(), state.notifier());
    machine.delete(OrderId::new(order_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
