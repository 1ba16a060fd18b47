//! One-time verification code domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use tourline_core::{Email, OtpCodeId};

/// A one-time verification code bound to an email address.
///
/// Rows are append-only history: `used` flips once at successful redemption,
/// and expired or redeemed codes are never deleted by the service.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OtpCode {
    /// Unique code ID.
    pub id: OtpCodeId,
    /// Address the code was issued for.
    pub email: Email,
    /// The 6-digit numeric code.
    pub code: String,
    /// Moment after which the code can no longer be redeemed.
    pub expire_at: DateTime<Utc>,
    /// Whether the code has been redeemed.
    pub used: bool,
    /// When the code was issued.
    pub created_at: DateTime<Utc>,
}

impl OtpCode {
    /// Whether the code's redemption window has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at < now
    }
}
