//! Cart accumulation and checkout.

use thiserror::Error;

use tourline_core::{CartLineId, TourId, UserId};

use crate::models::{CartLine, ContactInfo, Order, OrderLine};
use crate::notify::{Notification, Notifier};
use crate::store::{RepositoryError, Store};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The referenced tour does not exist.
    #[error("tour not found")]
    TourNotFound,

    /// Quantity must be at least 1. Removal is a separate operation.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The cart line does not exist or belongs to another user's cart.
    #[error("cart line not found")]
    NotFound,

    /// Checkout requires at least one line.
    #[error("cart is empty")]
    EmptyCart,

    /// The checking-out user does not exist.
    #[error("user not found")]
    UserNotFound,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Accumulates tour selections per user and converts them into an order at
/// checkout.
pub struct CartAggregator<'a> {
    store: &'a dyn Store,
    notifier: &'a dyn Notifier,
}

impl<'a> CartAggregator<'a> {
    /// Create a new aggregator over the given collaborators.
    #[must_use]
    pub const fn new(store: &'a dyn Store, notifier: &'a dyn Notifier) -> Self {
        Self { store, notifier }
    }

    /// Add `quantity` seats of a tour to the user's cart.
    ///
    /// The cart is created lazily. If the tour is already in the cart the
    /// existing line's quantity is incremented, not replaced.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] for quantities below 1,
    /// [`CartError::TourNotFound`] for dangling tour references.
    pub async fn add_item(
        &self,
        user_id: UserId,
        tour_id: TourId,
        quantity: i32,
    ) -> Result<CartLine, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        if self.store.tour_by_id(tour_id).await?.is_none() {
            return Err(CartError::TourNotFound);
        }
        let line = self.store.upsert_cart_line(user_id, tour_id, quantity).await?;
        Ok(line)
    }

    /// Replace a line's quantity.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] for quantities below 1 (use
    /// [`remove_item`](Self::remove_item) to delete), [`CartError::NotFound`]
    /// when the line is absent or owned by another cart.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        if !self
            .store
            .set_cart_line_quantity(user_id, line_id, quantity)
            .await?
        {
            return Err(CartError::NotFound);
        }
        Ok(())
    }

    /// Remove a line from the user's cart.
    ///
    /// # Errors
    ///
    /// [`CartError::NotFound`] when the line is absent or owned by another
    /// cart.
    pub async fn remove_item(&self, user_id: UserId, line_id: CartLineId) -> Result<(), CartError> {
        if !self.store.delete_cart_line(user_id, line_id).await? {
            return Err(CartError::NotFound);
        }
        Ok(())
    }

    /// The current content of the user's cart.
    ///
    /// # Errors
    ///
    /// Storage failures only; a missing cart reads as empty.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, CartError> {
        Ok(self.store.cart_lines(user_id).await?)
    }

    /// Convert the cart into a pending order.
    ///
    /// The order and its lines are committed as one atomic unit with the
    /// contact email snapshotted from the account. Cart clearing and the
    /// confirmation email happen after that commit and are best-effort:
    /// losing a notification is acceptable, losing an order line is not.
    ///
    /// # Errors
    ///
    /// [`CartError::EmptyCart`] when there is nothing to check out,
    /// [`CartError::UserNotFound`] when the account is gone.
    pub async fn checkout(
        &self,
        user_id: UserId,
        contact: &ContactInfo,
    ) -> Result<(Order, Vec<OrderLine>), CartError> {
        let cart_lines = self.store.cart_lines(user_id).await?;
        if cart_lines.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(CartError::UserNotFound)?;

        let line_specs: Vec<(TourId, i32)> = cart_lines
            .iter()
            .map(|line| (line.tour_id, line.quantity))
            .collect();

        let (order, order_lines) = self
            .store
            .create_order(user_id, contact, &user.email, &line_specs)
            .await?;

        tracing::info!(
            order_id = %order.id,
            %user_id,
            lines = order_lines.len(),
            "order created"
        );

        if let Err(error) = self.store.clear_cart(user_id).await {
            tracing::warn!(%user_id, %error, "failed to clear cart after checkout");
        }

        if let Err(error) = self
            .notifier
            .notify(
                &order.contact_email,
                Notification::OrderCreated {
                    order: order.clone(),
                    lines: order_lines.clone(),
                },
            )
            .await
        {
            tracing::warn!(order_id = %order.id, %error, "failed to send order confirmation");
        }

        Ok((order, order_lines))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tourline_core::{Email, OrderStatus};

    use super::*;
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, MemoryNotifier, UserId, TourId) {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let user = store
            .create_user(&Email::parse("traveler@example.com").unwrap())
            .await
            .unwrap();
        let tour = store.seed_tour("Halong Bay Cruise", Decimal::new(29900, 2)).await;
        (store, notifier, user.id, tour.id)
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "A. Traveler".to_owned(),
            phone: "555-0100".to_owned(),
            address: "1 Harbor Rd".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_add_item_rejects_bad_quantity_and_unknown_tour() {
        let (store, notifier, user_id, tour_id) = setup().await;
        let cart = CartAggregator::new(&store, &notifier);

        assert!(matches!(
            cart.add_item(user_id, tour_id, 0).await,
            Err(CartError::InvalidQuantity)
        ));
        assert!(matches!(
            cart.add_item(user_id, TourId::new(999), 1).await,
            Err(CartError::TourNotFound)
        ));
    }

    #[tokio::test]
    async fn test_adding_same_tour_twice_merges_quantities() {
        let (store, notifier, user_id, tour_id) = setup().await;
        let cart = CartAggregator::new(&store, &notifier);

        cart.add_item(user_id, tour_id, 2).await.unwrap();
        cart.add_item(user_id, tour_id, 3).await.unwrap();

        let lines = cart.lines(user_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_update_and_remove_require_ownership() {
        let (store, notifier, user_id, tour_id) = setup().await;
        let other = store
            .create_user(&Email::parse("other@example.com").unwrap())
            .await
            .unwrap();
        let cart = CartAggregator::new(&store, &notifier);

        let line = cart.add_item(user_id, tour_id, 2).await.unwrap();

        assert!(matches!(
            cart.update_quantity(other.id, line.id, 4).await,
            Err(CartError::NotFound)
        ));
        assert!(matches!(
            cart.remove_item(other.id, line.id).await,
            Err(CartError::NotFound)
        ));

        cart.update_quantity(user_id, line.id, 4).await.unwrap();
        assert_eq!(cart.lines(user_id).await.unwrap()[0].quantity, 4);

        cart.remove_item(user_id, line.id).await.unwrap();
        assert!(cart.lines(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_quantity_rejects_zero() {
        let (store, notifier, user_id, tour_id) = setup().await;
        let cart = CartAggregator::new(&store, &notifier);
        let line = cart.add_item(user_id, tour_id, 2).await.unwrap();

        assert!(matches!(
            cart.update_quantity(user_id, line.id, 0).await,
            Err(CartError::InvalidQuantity)
        ));
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_fails_and_creates_nothing() {
        let (store, notifier, user_id, _) = setup().await;
        let cart = CartAggregator::new(&store, &notifier);

        assert!(matches!(
            cart.checkout(user_id, &contact()).await,
            Err(CartError::EmptyCart)
        ));
        assert_eq!(notifier.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_snapshots_lines_and_clears_cart() {
        let (store, notifier, user_id, tour_id) = setup().await;
        let second_tour = store.seed_tour("Sapa Trek", Decimal::new(19900, 2)).await;
        let cart = CartAggregator::new(&store, &notifier);

        cart.add_item(user_id, tour_id, 2).await.unwrap();
        cart.add_item(user_id, second_tour.id, 1).await.unwrap();

        let (order, lines) = cart.checkout(user_id, &contact()).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.contact_email.as_str(), "traveler@example.com");
        assert_eq!(lines.len(), 2);
        let mut snapshot: Vec<(TourId, i32)> =
            lines.iter().map(|l| (l.tour_id, l.quantity)).collect();
        snapshot.sort_by_key(|(id, _)| id.as_i32());
        assert_eq!(snapshot, vec![(tour_id, 2), (second_tour.id, 1)]);

        assert!(cart.lines(user_id).await.unwrap().is_empty());
        assert_eq!(notifier.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_checkout_succeeds_when_notification_fails() {
        let (store, notifier, user_id, tour_id) = setup().await;
        let cart = CartAggregator::new(&store, &notifier);
        cart.add_item(user_id, tour_id, 1).await.unwrap();

        notifier.set_failing(true);
        let (order, lines) = cart.checkout(user_id, &contact()).await.unwrap();

        // The order is durably present despite the failed email.
        let stored = store.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(store.order_lines(order.id).await.unwrap().len(), lines.len());
    }
}
