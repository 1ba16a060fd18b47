//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use tourline_core::{Email, OrderId, OrderLineId, OrderStatus, TourId, UserId};

/// Contact details supplied at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Recipient name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Delivery / billing address.
    pub address: String,
}

/// A committed order.
///
/// Created atomically with all of its [`OrderLine`]s at checkout. The order
/// survives independently of the cart it was built from; `contact_email` is a
/// snapshot of the account email at checkout time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// Recipient name.
    pub contact_name: String,
    /// Contact phone number.
    pub contact_phone: String,
    /// Delivery / billing address.
    pub contact_address: String,
    /// Email notifications are sent to.
    pub contact_email: Email,
}

/// An immutable snapshot of a cart line, captured at checkout.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderLine {
    /// Unique line ID.
    pub id: OrderLineId,
    /// Order this line belongs to.
    pub order_id: OrderId,
    /// Booked tour.
    pub tour_id: TourId,
    /// Number of seats, always >= 1.
    pub quantity: i32,
}
