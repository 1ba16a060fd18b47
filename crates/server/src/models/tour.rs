//! Tour domain type.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use tourline_core::TourId;

/// A bookable tour.
///
/// The catalog itself is maintained elsewhere; the workflow only validates
/// references and reads the live price. Prices are never copied onto order
/// lines.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tour {
    /// Unique tour ID.
    pub id: TourId,
    /// Display name.
    pub name: String,
    /// Current price per seat.
    pub price: Decimal,
}
