//! PostgreSQL store implementation.
//!
//! Queries are runtime-bound (`query_as`/`query_scalar`) over the schema in
//! `migrations/`. Constraint violations are classified through
//! [`sqlx::error::DatabaseError::kind`], never by matching error message
//! strings.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use tourline_core::{CartLineId, Email, OrderId, OrderStatus, OtpCodeId, TourId, UserId};

use crate::models::{CartLine, ContactInfo, Order, OrderLine, OtpCode, Tour, User};
use crate::store::{RepoResult, RepositoryError, Store};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// [`Store`] implementation backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run pending migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns a migration error if the schema cannot be brought up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Classify a database error into the repository taxonomy.
fn map_db_err(e: sqlx::Error, context: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db) = e {
        match db.kind() {
            sqlx::error::ErrorKind::UniqueViolation => {
                return RepositoryError::Conflict(context.to_owned());
            }
            sqlx::error::ErrorKind::ForeignKeyViolation => {
                return RepositoryError::ReferentialConflict(context.to_owned());
            }
            _ => {}
        }
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &Email) -> RepoResult<User> {
        sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (email)
            VALUES ($1)
            RETURNING id, email, otp_verified, created_at
            ",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "email already registered"))
    }

    async fn user_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, otp_verified, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_email(&self, email: &Email) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, otp_verified, created_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn mark_otp_verified(&self, email: &Email) -> RepoResult<()> {
        sqlx::query("UPDATE users SET otp_verified = TRUE WHERE email = $1")
            .bind(email.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn tour_by_id(&self, id: TourId) -> RepoResult<Option<Tour>> {
        let tour = sqlx::query_as::<_, Tour>(
            r"
            SELECT id, name, price
            FROM tours
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(tour)
    }

    async fn insert_otp(
        &self,
        email: &Email,
        code: &str,
        expire_at: DateTime<Utc>,
    ) -> RepoResult<OtpCode> {
        let otp = sqlx::query_as::<_, OtpCode>(
            r"
            INSERT INTO otp_codes (email, code, expire_at)
            VALUES ($1, $2, $3)
            RETURNING id, email, code, expire_at, used, created_at
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .bind(expire_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn find_active_otp(&self, email: &Email, code: &str) -> RepoResult<Option<OtpCode>> {
        let otp = sqlx::query_as::<_, OtpCode>(
            r"
            SELECT id, email, code, expire_at, used, created_at
            FROM otp_codes
            WHERE email = $1 AND code = $2 AND used = FALSE
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(email.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn mark_otp_used(&self, id: OtpCodeId) -> RepoResult<bool> {
        // Guarded flip: a concurrent redemption of the same row loses.
        let result = sqlx::query("UPDATE otp_codes SET used = TRUE WHERE id = $1 AND used = FALSE")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        tour_id: TourId,
        quantity: i32,
    ) -> RepoResult<CartLine> {
        // Lazy cart creation and the quantity increment in one statement, so
        // concurrent adds cannot lose an update.
        let line = sqlx::query_as::<_, CartLine>(
            r"
            WITH cart AS (
                INSERT INTO carts (user_id)
                VALUES ($1)
                ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
                RETURNING id
            )
            INSERT INTO cart_lines (cart_id, tour_id, quantity)
            SELECT cart.id, $2, $3 FROM cart
            ON CONFLICT (cart_id, tour_id)
            DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity
            RETURNING id, cart_id, tour_id, quantity
            ",
        )
        .bind(user_id.as_i32())
        .bind(tour_id.as_i32())
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_err(e, "cart line references a missing tour"))?;
        Ok(line)
    }

    async fn cart_lines(&self, user_id: UserId) -> RepoResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            r"
            SELECT cl.id, cl.cart_id, cl.tour_id, cl.quantity
            FROM cart_lines cl
            JOIN carts c ON c.id = cl.cart_id
            WHERE c.user_id = $1
            ORDER BY cl.id
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE cart_lines SET quantity = $3
            WHERE id = $2
              AND cart_id IN (SELECT id FROM carts WHERE user_id = $1)
            ",
        )
        .bind(user_id.as_i32())
        .bind(line_id.as_i32())
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE id = $2
              AND cart_id IN (SELECT id FROM carts WHERE user_id = $1)
            ",
        )
        .bind(user_id.as_i32())
        .bind(line_id.as_i32())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: UserId) -> RepoResult<()> {
        sqlx::query(
            r"
            DELETE FROM cart_lines
            WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)
            ",
        )
        .bind(user_id.as_i32())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_order(
        &self,
        user_id: UserId,
        contact: &ContactInfo,
        contact_email: &Email,
        lines: &[(TourId, i32)],
    ) -> RepoResult<(Order, Vec<OrderLine>)> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            r"
            INSERT INTO orders
                (user_id, status, contact_name, contact_phone, contact_address, contact_email)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, status, created_at,
                      contact_name, contact_phone, contact_address, contact_email
            ",
        )
        .bind(user_id.as_i32())
        .bind(OrderStatus::Pending)
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(&contact.address)
        .bind(contact_email.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut order_lines = Vec::with_capacity(lines.len());
        for &(tour_id, quantity) in lines {
            let line = sqlx::query_as::<_, OrderLine>(
                r"
                INSERT INTO order_lines (order_id, tour_id, quantity)
                VALUES ($1, $2, $3)
                RETURNING id, order_id, tour_id, quantity
                ",
            )
            .bind(order.id.as_i32())
            .bind(tour_id.as_i32())
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await?;
            order_lines.push(line);
        }

        tx.commit().await?;
        Ok((order, order_lines))
    }

    async fn order_by_id(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r"
            SELECT id, user_id, status, created_at,
                   contact_name, contact_phone, contact_address, contact_email
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn order_lines(&self, id: OrderId) -> RepoResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r"
            SELECT id, order_id, tour_id, quantity
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id.as_i32())
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<bool> {
        // Compare-and-set so a concurrent transition is detected, not
        // silently overwritten.
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id.as_i32())
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, id: OrderId) -> RepoResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RepositoryError::Database)?;

        sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_err(e, "order lines are still referenced"))?;

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_err(e, "order is still referenced"))?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
