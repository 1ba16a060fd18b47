//! Cart domain types.

use serde::Serialize;
use sqlx::FromRow;

use tourline_core::{CartId, CartLineId, TourId, UserId};

/// A user's pending selection set. Created lazily on first add; the row may
/// persist empty after checkout for reuse.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
}

/// A single (tour, quantity) entry in a cart.
///
/// Unique per `(cart_id, tour_id)`: adding a tour that is already in the cart
/// increments the existing line instead of duplicating it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    /// Unique line ID.
    pub id: CartLineId,
    /// Cart this line belongs to.
    pub cart_id: CartId,
    /// Selected tour.
    pub tour_id: TourId,
    /// Number of seats, always >= 1.
    pub quantity: i32,
}
