//! User domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use tourline_core::{Email, UserId};

/// A registered account.
///
/// `otp_verified` flips exactly once, false to true, when the user redeems a
/// verification code. It never reverts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Account email address (unique).
    pub email: Email,
    /// Whether the email has been verified via OTP.
    pub otp_verified: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
