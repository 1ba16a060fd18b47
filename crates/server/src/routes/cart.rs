//! Cart route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use tourline_core::{CartLineId, TourId};

use crate::error::Result;
use crate::models::{CartLine, ContactInfo, Order, OrderLine};
use crate::routes::Principal;
use crate::services::CartAggregator;
use crate::state::AppState;

/// Request body for adding a tour to the cart.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    /// Tour to add.
    pub tour_id: TourId,
    /// Seats to add. Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Request body for replacing a line's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    /// New seat count. Must be at least 1.
    pub quantity: i32,
}

/// Response body for checkout: the committed order and its line snapshot.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// The created order.
    pub order: Order,
    /// One line per distinct tour in the cart at checkout.
    pub lines: Vec<OrderLine>,
}

/// Current cart content for the caller.
pub async fn get_cart(
    State(state): State<AppState>,
    Principal(user_id): Principal,
) -> Result<Json<Vec<CartLine>>> {
    let cart = CartAggregator::new(state.store(), state.notifier());
    Ok(Json(cart.lines(user_id).await?))
}

/// Add a tour to the caller's cart, merging with an existing line.
pub async fn add_item(
    State(state): State<AppState>,
    Principal(user_id): Principal,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartLine>)> {
    let cart = CartAggregator::new(state.store(), state.notifier());
    let line = cart.add_item(user_id, req.tour_id, req.quantity).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// Replace a cart line's quantity.
pub async fn update_item(
    State(state): State<AppState>,
    Principal(user_id): Principal,
    Path(line_id): Path<i32>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<StatusCode> {
    let cart = CartAggregator::new(state.store(), state.notifier());
    cart.update_quantity(user_id, CartLineId::new(line_id), req.quantity)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a line from the caller's cart.
pub async fn remove_item(
    State(state): State<AppState>,
    Principal(user_id): Principal,
    Path(line_id): Path<i32>,
) -> Result<StatusCode> {
    let cart = CartAggregator::new(state.store(), state.notifier());
    cart.remove_item(user_id, CartLineId::new(line_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Convert the caller's cart into a pending order.
pub async fn checkout(
    State(state): State<AppState>,
    Principal(user_id): Principal,
    Json(contact): Json<ContactInfo>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let cart = CartAggregator::new(state.store(), state.notifier());
    let (order, lines) = cart.checkout(user_id, &contact).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { order, lines })))
}
