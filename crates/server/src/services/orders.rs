//! Order lifecycle transitions.

use thiserror::Error;

use tourline_core::{OrderId, OrderStatus, UserId};

use crate::models::Order;
use crate::notify::{Notification, Notifier};
use crate::store::{RepositoryError, Store};

/// Errors from order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order does not exist.
    #[error("order not found")]
    OrderNotFound,

    /// The requested edge is not in the lifecycle table.
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        /// Status the order is currently in.
        from: OrderStatus,
        /// Requested target status.
        to: OrderStatus,
    },

    /// The order is in a terminal status; nothing leaves it.
    #[error("order is in terminal status {0}")]
    TerminalState(OrderStatus),

    /// Foreign keys held elsewhere block the deletion.
    #[error("order is still referenced")]
    ReferentialConflict,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Enforces legal order-status transitions and drives the notification side
/// effect.
pub struct OrderStateMachine<'a> {
    store: &'a dyn Store,
    notifier: &'a dyn Notifier,
}

impl<'a> OrderStateMachine<'a> {
    /// Create a new state machine over the given collaborators.
    #[must_use]
    pub const fn new(store: &'a dyn Store, notifier: &'a dyn Notifier) -> Self {
        Self { store, notifier }
    }

    /// Move an order to `target`.
    ///
    /// A same-status request is a no-op that returns the order unchanged and
    /// does not re-notify. Valid edges persist the new status with a
    /// compare-and-set on the old one, then send a status-change email
    /// best-effort: the transition is already committed, so a failed send is
    /// logged and never undoes it.
    ///
    /// # Errors
    ///
    /// [`OrderError::OrderNotFound`], [`OrderError::TerminalState`] for
    /// transitions out of `Delivered`/`Cancelled`, and
    /// [`OrderError::IllegalTransition`] for any edge outside the lifecycle
    /// table.
    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        actor: UserId,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .order_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;
        let current = order.status;

        if current == target {
            return Ok(order);
        }
        if current.is_terminal() {
            return Err(OrderError::TerminalState(current));
        }
        if !current.can_transition_to(target) {
            return Err(OrderError::IllegalTransition {
                from: current,
                to: target,
            });
        }

        if !self
            .store
            .update_order_status(order_id, current, target)
            .await?
        {
            // Another request moved the order first.
            return Err(OrderError::Repository(RepositoryError::Conflict(
                "order status changed concurrently".to_owned(),
            )));
        }

        let updated = Order {
            status: target,
            ..order
        };

        tracing::info!(
            %order_id,
            %actor,
            from = %current,
            to = %target,
            "order status changed"
        );

        if let Err(error) = self
            .notifier
            .notify(
                &updated.contact_email,
                Notification::OrderStatusChanged {
                    order: updated.clone(),
                    old_status: current,
                },
            )
            .await
        {
            tracing::warn!(%order_id, %error, "failed to send status change email");
        }

        Ok(updated)
    }

    /// Delete an order and its lines as one atomic unit.
    ///
    /// # Errors
    ///
    /// [`OrderError::OrderNotFound`] when absent;
    /// [`OrderError::ReferentialConflict`] when storage-level constraints
    /// block the deletion (surfaced, not retried).
    pub async fn delete(&self, order_id: OrderId) -> Result<(), OrderError> {
        match self.store.delete_order(order_id).await {
            Ok(true) => {
                tracing::info!(%order_id, "order deleted");
                Ok(())
            }
            Ok(false) => Err(OrderError::OrderNotFound),
            Err(RepositoryError::ReferentialConflict(_)) => Err(OrderError::ReferentialConflict),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use tourline_core::Email;

    use super::*;
    use crate::models::ContactInfo;
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, MemoryNotifier, OrderId, UserId) {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let user = store
            .create_user(&Email::parse("traveler@example.com").unwrap())
            .await
            .unwrap();
        let tour = store.seed_tour("Mekong Delta Tour", Decimal::new(9900, 2)).await;
        let contact = ContactInfo {
            name: "A. Traveler".to_owned(),
            phone: "555-0100".to_owned(),
            address: "1 Harbor Rd".to_owned(),
        };
        let (order, _) = store
            .create_order(user.id, &contact, &user.email, &[(tour.id, 1)])
            .await
            .unwrap();
        (store, notifier, order.id, user.id)
    }

    #[tokio::test]
    async fn test_happy_path_to_delivered() {
        let (store, notifier, order_id, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
        ] {
            let order = machine.transition(order_id, target, actor).await.unwrap();
            assert_eq!(order.status, target);
        }
        assert_eq!(notifier.sent_count().await, 3);
    }

    #[tokio::test]
    async fn test_illegal_edges_leave_status_unchanged() {
        let (store, notifier, order_id, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        for target in [OrderStatus::Shipping, OrderStatus::Delivered] {
            assert!(matches!(
                machine.transition(order_id, target, actor).await,
                Err(OrderError::IllegalTransition { .. })
            ));
        }
        let order = store.order_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(notifier.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_backwards_edge_is_illegal() {
        let (store, notifier, order_id, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        machine
            .transition(order_id, OrderStatus::Confirmed, actor)
            .await
            .unwrap();
        assert!(matches!(
            machine.transition(order_id, OrderStatus::Pending, actor).await,
            Err(OrderError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_terminal_statuses_reject_everything() {
        let (store, notifier, order_id, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        machine
            .transition(order_id, OrderStatus::Cancelled, actor)
            .await
            .unwrap();

        for target in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipping,
            OrderStatus::Delivered,
        ] {
            assert!(matches!(
                machine.transition(order_id, target, actor).await,
                Err(OrderError::TerminalState(OrderStatus::Cancelled))
            ));
        }
    }

    #[tokio::test]
    async fn test_same_status_is_a_noop_without_renotifying() {
        let (store, notifier, order_id, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        let order = machine
            .transition(order_id, OrderStatus::Pending, actor)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(notifier.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_transition_commits_even_when_notification_fails() {
        let (store, notifier, order_id, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        notifier.set_failing(true);
        let order = machine
            .transition(order_id, OrderStatus::Confirmed, actor)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);

        let stored = store.order_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_delete_removes_order_and_lines() {
        let (store, notifier, order_id, _) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        machine.delete(order_id).await.unwrap();
        assert!(store.order_by_id(order_id).await.unwrap().is_none());
        assert!(store.order_lines(order_id).await.unwrap().is_empty());

        assert!(matches!(
            machine.delete(order_id).await,
            Err(OrderError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (store, notifier, _, actor) = setup().await;
        let machine = OrderStateMachine::new(&store, &notifier);

        assert!(matches!(
            machine
                .transition(OrderId::new(9999), OrderStatus::Confirmed, actor)
                .await,
            Err(OrderError::OrderNotFound)
        ));
    }
}
