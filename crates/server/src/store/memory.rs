//! In-memory store implementation for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use tourline_core::{
    CartId, CartLineId, Email, OrderId, OrderLineId, OrderStatus, OtpCodeId, TourId, UserId,
};

use crate::models::{Cart, CartLine, ContactInfo, Order, OrderLine, OtpCode, Tour, User};
use crate::store::{RepoResult, RepositoryError, Store};

#[derive(Default)]
struct Inner {
    users: HashMap<i32, User>,
    tours: HashMap<i32, Tour>,
    otp_codes: Vec<OtpCode>,
    carts: HashMap<i32, Cart>,
    cart_lines: HashMap<i32, CartLine>,
    orders: HashMap<i32, Order>,
    order_lines: Vec<OrderLine>,
    next_id: i32,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn cart_id_for(&self, user_id: UserId) -> Option<CartId> {
        self.carts
            .values()
            .find(|c| c.user_id == user_id)
            .map(|c| c.id)
    }

    fn owned_line(&self, user_id: UserId, line_id: CartLineId) -> Option<CartLine> {
        let cart_id = self.cart_id_for(user_id)?;
        self.cart_lines
            .get(&line_id.as_i32())
            .filter(|l| l.cart_id == cart_id)
            .cloned()
    }
}

/// In-memory [`Store`] implementation.
///
/// Holds everything behind a single `RwLock`, which makes each trait method
/// an atomic unit and mirrors the transactional guarantees of the PostgreSQL
/// backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tour into the catalog. Test/dev seeding helper; the live
    /// catalog is maintained outside this service.
    pub async fn seed_tour(&self, name: &str, price: Decimal) -> Tour {
        let mut inner = self.inner.write().await;
        let id = TourId::new(inner.next_id());
        let tour = Tour {
            id,
            name: name.to_owned(),
            price,
        };
        inner.tours.insert(id.as_i32(), tour.clone());
        tour
    }

    /// Number of stored (including redeemed and expired) OTP codes.
    pub async fn otp_count(&self) -> usize {
        self.inner.read().await.otp_codes.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &Email) -> RepoResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| &u.email == email) {
            return Err(RepositoryError::Conflict(format!(
                "email already registered: {email}"
            )));
        }
        let id = UserId::new(inner.next_id());
        let user = User {
            id,
            email: email.clone(),
            otp_verified: false,
            created_at: Utc::now(),
        };
        inner.users.insert(id.as_i32(), user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id.as_i32()).cloned())
    }

    async fn user_by_email(&self, email: &Email) -> RepoResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn mark_otp_verified(&self, email: &Email) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.users.values_mut().find(|u| &u.email == email) {
            user.otp_verified = true;
        }
        Ok(())
    }

    async fn tour_by_id(&self, id: TourId) -> RepoResult<Option<Tour>> {
        Ok(self.inner.read().await.tours.get(&id.as_i32()).cloned())
    }

    async fn insert_otp(
        &self,
        email: &Email,
        code: &str,
        expire_at: DateTime<Utc>,
    ) -> RepoResult<OtpCode> {
        let mut inner = self.inner.write().await;
        let id = OtpCodeId::new(inner.next_id());
        let otp = OtpCode {
            id,
            email: email.clone(),
            code: code.to_owned(),
            expire_at,
            used: false,
            created_at: Utc::now(),
        };
        inner.otp_codes.push(otp.clone());
        Ok(otp)
    }

    async fn find_active_otp(&self, email: &Email, code: &str) -> RepoResult<Option<OtpCode>> {
        Ok(self
            .inner
            .read()
            .await
            .otp_codes
            .iter()
            .filter(|c| &c.email == email && c.code == code && !c.used)
            .max_by_key(|c| c.id)
            .cloned())
    }

    async fn mark_otp_used(&self, id: OtpCodeId) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.otp_codes.iter_mut().find(|c| c.id == id && !c.used) {
            Some(code) => {
                code.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_cart_line(
        &self,
        user_id: UserId,
        tour_id: TourId,
        quantity: i32,
    ) -> RepoResult<CartLine> {
        let mut inner = self.inner.write().await;

        let cart_id = match inner.cart_id_for(user_id) {
            Some(id) => id,
            None => {
                let id = CartId::new(inner.next_id());
                inner.carts.insert(id.as_i32(), Cart { id, user_id });
                id
            }
        };

        if let Some(line) = inner
            .cart_lines
            .values_mut()
            .find(|l| l.cart_id == cart_id && l.tour_id == tour_id)
        {
            line.quantity += quantity;
            return Ok(line.clone());
        }

        let id = CartLineId::new(inner.next_id());
        let line = CartLine {
            id,
            cart_id,
            tour_id,
            quantity,
        };
        inner.cart_lines.insert(id.as_i32(), line.clone());
        Ok(line)
    }

    async fn cart_lines(&self, user_id: UserId) -> RepoResult<Vec<CartLine>> {
        let inner = self.inner.read().await;
        let Some(cart_id) = inner.cart_id_for(user_id) else {
            return Ok(Vec::new());
        };
        let mut lines: Vec<CartLine> = inner
            .cart_lines
            .values()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines)
    }

    async fn set_cart_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.owned_line(user_id, line_id).is_none() {
            return Ok(false);
        }
        if let Some(line) = inner.cart_lines.get_mut(&line_id.as_i32()) {
            line.quantity = quantity;
            return Ok(true);
        }
        Ok(false)
    }

    async fn delete_cart_line(&self, user_id: UserId, line_id: CartLineId) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.owned_line(user_id, line_id).is_none() {
            return Ok(false);
        }
        Ok(inner.cart_lines.remove(&line_id.as_i32()).is_some())
    }

    async fn clear_cart(&self, user_id: UserId) -> RepoResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(cart_id) = inner.cart_id_for(user_id) {
            inner.cart_lines.retain(|_, l| l.cart_id != cart_id);
        }
        Ok(())
    }

    async fn create_order(
        &self,
        user_id: UserId,
        contact: &ContactInfo,
        contact_email: &Email,
        lines: &[(TourId, i32)],
    ) -> RepoResult<(Order, Vec<OrderLine>)> {
        // Single write lock spans order + lines, so the unit is atomic.
        let mut inner = self.inner.write().await;
        let order_id = OrderId::new(inner.next_id());
        let order = Order {
            id: order_id,
            user_id,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            contact_name: contact.name.clone(),
            contact_phone: contact.phone.clone(),
            contact_address: contact.address.clone(),
            contact_email: contact_email.clone(),
        };
        inner.orders.insert(order_id.as_i32(), order.clone());

        let mut order_lines = Vec::with_capacity(lines.len());
        for &(tour_id, quantity) in lines {
            let id = OrderLineId::new(inner.next_id());
            let line = OrderLine {
                id,
                order_id,
                tour_id,
                quantity,
            };
            inner.order_lines.push(line.clone());
            order_lines.push(line);
        }

        Ok((order, order_lines))
    }

    async fn order_by_id(&self, id: OrderId) -> RepoResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id.as_i32()).cloned())
    }

    async fn order_lines(&self, id: OrderId) -> RepoResult<Vec<OrderLine>> {
        Ok(self
            .inner
            .read()
            .await
            .order_lines
            .iter()
            .filter(|l| l.order_id == id)
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(&id.as_i32()) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_order(&self, id: OrderId) -> RepoResult<bool> {
        let mut inner = self.inner.write().await;
        let existed = inner.orders.remove(&id.as_i32()).is_some();
        if existed {
            inner.order_lines.retain(|l| l.order_id != id);
        }
        Ok(existed)
    }

    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}
