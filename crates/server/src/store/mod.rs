//! Storage layer for the fulfillment workflow.
//!
//! The [`Store`] trait is the single persistence boundary. Two implementations
//! exist with identical semantics:
//!
//! - [`postgres::PgStore`] - production backend over sqlx/PostgreSQL
//! - [`memory::MemoryStore`] - lock-guarded in-memory backend for tests and
//!   local development
//!
//! Multi-row invariants are enforced here, not in the services: order+lines
//! creation and deletion are single atomic units, quantity increments are a
//! single guarded upsert, and OTP redemption is a guarded `used = false ->
//! true` update so a code can never be redeemed twice.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tourline_core::{CartLineId, Email, OrderId, OrderStatus, OtpCodeId, TourId, UserId};

use crate::models::{CartLine, ContactInfo, Order, OrderLine, OtpCode, Tour, User};

pub use memory::MemoryStore;
pub use postgres::{PgStore, create_pool};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Unique constraint violation (e.g. duplicate email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A foreign-key constraint blocked the operation because the row is
    /// still referenced elsewhere.
    #[error("referential conflict: {0}")]
    ReferentialConflict(String),
}

/// Result type alias for storage operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Persistence boundary for users, tours, OTP codes, carts, and orders.
///
/// Object-safe so application state can hold an `Arc<dyn Store>` and swap the
/// backend per environment.
#[async_trait]
pub trait Store: Send + Sync {
    // -- users ---------------------------------------------------------------

    /// Create a user with an unverified email.
    ///
    /// Returns [`RepositoryError::Conflict`] if the email is already
    /// registered.
    async fn create_user(&self, email: &Email) -> RepoResult<User>;

    /// Fetch a user by ID.
    async fn user_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Fetch a user by email.
    async fn user_by_email(&self, email: &Email) -> RepoResult<Option<User>>;

    /// Flip `otp_verified` to true for the user with this email. Idempotent;
    /// the flag never reverts.
    async fn mark_otp_verified(&self, email: &Email) -> RepoResult<()>;

    // -- tours ---------------------------------------------------------------

    /// Fetch a tour by ID. `None` means the reference is invalid.
    async fn tour_by_id(&self, id: TourId) -> RepoResult<Option<Tour>>;

    // -- otp codes -----------------------------------------------------------

    /// Persist a freshly generated code, unused.
    async fn insert_otp(
        &self,
        email: &Email,
        code: &str,
        expire_at: DateTime<Utc>,
    ) -> RepoResult<OtpCode>;

    /// Find the newest unused code matching `(email, code)`, if any. Used and
    /// never-issued codes are indistinguishable here by design.
    async fn find_active_otp(&self, email: &Email, code: &str) -> RepoResult<Option<OtpCode>>;

    /// Mark a code as used. Returns `false` if it was already used, so a
    /// concurrent redemption of the same code loses.
    async fn mark_otp_used(&self, id: OtpCodeId) -> RepoResult<bool>;

    // -- cart ----------------------------------------------------------------

    /// Add `quantity` of a tour to the user's cart, creating the cart lazily.
    /// If a line for the tour exists its quantity is incremented in a single
    /// guarded statement (no lost updates under concurrency).
    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        tour_id: TourId,
        quantity: i32,
    ) -> RepoResult<CartLine>;

    /// All lines in the user's cart. Empty when no cart exists yet.
    async fn cart_lines(&self, user_id: UserId) -> RepoResult<Vec<CartLine>>;

    /// Replace a line's quantity. Returns `false` if the line does not exist
    /// or does not belong to the user's cart.
    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> RepoResult<bool>;

    /// Remove a line. Returns `false` if the line does not exist or does not
    /// belong to the user's cart.
    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> RepoResult<bool>;

    /// Remove all lines from the user's cart. The cart row itself persists.
    async fn clear_cart(&self, user_id: UserId) -> RepoResult<()>;

    // -- orders --------------------------------------------------------------

    /// Create an order and all of its lines as one atomic unit. A partially
    /// written order is never observable.
    async fn create_order(
        &self,
        user_id: UserId,
        contact: &ContactInfo,
        contact_email: &Email,
        lines: &[(TourId, i32)],
    ) -> RepoResult<(Order, Vec<OrderLine>)>;

    /// Fetch an order by ID.
    async fn order_by_id(&self, id: OrderId) -> RepoResult<Option<Order>>;

    /// All lines of an order.
    async fn order_lines(&self, id: OrderId) -> RepoResult<Vec<OrderLine>>;

    /// Compare-and-set the order status from `from` to `to`. Returns `false`
    /// if the stored status no longer equals `from`.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<bool>;

    /// Delete an order and its lines as one atomic unit. Returns `false` if
    /// the order does not exist. Surfaces
    /// [`RepositoryError::ReferentialConflict`] when foreign keys held
    /// elsewhere block the deletion.
    async fn delete_order(&self, id: OrderId) -> RepoResult<bool>;

    // -- health --------------------------------------------------------------

    /// Verify the backend is reachable.
    async fn ping(&self) -> RepoResult<()>;
}
