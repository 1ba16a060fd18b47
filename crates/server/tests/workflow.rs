//! End-to-end workflow tests over the in-memory backends.
//!
//! These walk the full account-to-delivery path the way the HTTP handlers
//! drive it, without the HTTP layer: register, verify, fill a cart, check
//! out, then move the order through its lifecycle.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use tourline_core::{Email, OrderStatus, TourId};
use tourline_server::models::ContactInfo;
use tourline_server::notify::{MemoryNotifier, Notification, TemplateKind};
use tourline_server::services::{CartAggregator, OrderError, OrderStateMachine, OtpLedger};
use tourline_server::store::{MemoryStore, Store};

fn contact() -> ContactInfo {
    ContactInfo {
        name: "A. Traveler".to_owned(),
        phone: "555-0100".to_owned(),
        address: "1 Harbor Rd".to_owned(),
    }
}

#[tokio::test]
async fn test_registration_through_verification_flips_account_flag() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let email = Email::parse("traveler@example.com").unwrap();

    let user = store.create_user(&email).await.unwrap();
    assert!(!user.otp_verified);

    let ledger = OtpLedger::new(&store, &notifier);
    let otp = ledger.generate(&email).await.unwrap();

    // The code travels in the notification, not the API response.
    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 1);
    let (recipient, notification) = &sent[0];
    assert_eq!(recipient, &email);
    match notification {
        Notification::OtpIssued { code, .. } => assert_eq!(code, &otp.code),
        other => panic!("unexpected notification: {:?}", other.kind()),
    }

    ledger.verify(&email, &otp.code).await.unwrap();
    store.mark_otp_verified(&email).await.unwrap();

    let user = store.user_by_email(&email).await.unwrap().unwrap();
    assert!(user.otp_verified);
}

#[tokio::test]
async fn test_cart_to_delivered_lifecycle() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let email = Email::parse("traveler@example.com").unwrap();
    let user = store.create_user(&email).await.unwrap();
    let cruise = store.seed_tour("Halong Bay Cruise", Decimal::new(29900, 2)).await;
    let trek = store.seed_tour("Sapa Trek", Decimal::new(19900, 2)).await;

    let cart = CartAggregator::new(&store, &notifier);
    cart.add_item(user.id, cruise.id, 2).await.unwrap();
    cart.add_item(user.id, trek.id, 1).await.unwrap();
    cart.add_item(user.id, cruise.id, 1).await.unwrap();

    let (order, lines) = cart.checkout(user.id, &contact()).await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.contact_email, email);
    let mut snapshot: Vec<(TourId, i32)> =
        lines.iter().map(|l| (l.tour_id, l.quantity)).collect();
    snapshot.sort_by_key(|(id, _)| id.as_i32());
    assert_eq!(snapshot, vec![(cruise.id, 3), (trek.id, 1)]);
    assert!(cart.lines(user.id).await.unwrap().is_empty());

    let machine = OrderStateMachine::new(&store, &notifier);
    for target in [
        OrderStatus::Confirmed,
        OrderStatus::Shipping,
        OrderStatus::Delivered,
    ] {
        let moved = machine.transition(order.id, target, user.id).await.unwrap();
        assert_eq!(moved.status, target);
    }

    // Delivered is terminal.
    assert!(matches!(
        machine
            .transition(order.id, OrderStatus::Cancelled, user.id)
            .await,
        Err(OrderError::TerminalState(OrderStatus::Delivered))
    ));

    // One confirmation plus three status changes.
    let kinds: Vec<TemplateKind> = notifier
        .sent()
        .await
        .iter()
        .map(|(_, n)| n.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![
            TemplateKind::OrderCreated,
            TemplateKind::OrderStatusChanged,
            TemplateKind::OrderStatusChanged,
            TemplateKind::OrderStatusChanged,
        ]
    );
}

#[tokio::test]
async fn test_cancellation_from_confirmed() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let email = Email::parse("traveler@example.com").unwrap();
    let user = store.create_user(&email).await.unwrap();
    let tour = store.seed_tour("Mekong Delta Tour", Decimal::new(9900, 2)).await;

    let cart = CartAggregator::new(&store, &notifier);
    cart.add_item(user.id, tour.id, 1).await.unwrap();
    let (order, _) = cart.checkout(user.id, &contact()).await.unwrap();

    let machine = OrderStateMachine::new(&store, &notifier);
    machine
        .transition(order.id, OrderStatus::Confirmed, user.id)
        .await
        .unwrap();
    machine
        .transition(order.id, OrderStatus::Cancelled, user.id)
        .await
        .unwrap();

    let stored = store.order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);

    // Cancelled never ships.
    assert!(matches!(
        machine
            .transition(order.id, OrderStatus::Shipping, user.id)
            .await,
        Err(OrderError::TerminalState(OrderStatus::Cancelled))
    ));
}

#[tokio::test]
async fn test_checkout_snapshot_survives_later_cart_activity() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let email = Email::parse("traveler@example.com").unwrap();
    let user = store.create_user(&email).await.unwrap();
    let tour = store.seed_tour("Hoi An Walking Tour", Decimal::new(4900, 2)).await;

    let cart = CartAggregator::new(&store, &notifier);
    cart.add_item(user.id, tour.id, 2).await.unwrap();
    let (order, lines) = cart.checkout(user.id, &contact()).await.unwrap();

    // New cart activity must not touch the committed order.
    cart.add_item(user.id, tour.id, 5).await.unwrap();

    let stored_lines = store.order_lines(order.id).await.unwrap();
    assert_eq!(stored_lines.len(), lines.len());
    assert_eq!(stored_lines[0].quantity, 2);
}

#[tokio::test]
async fn test_delete_order_removes_every_line() {
    let store = MemoryStore::new();
    let notifier = MemoryNotifier::new();
    let email = Email::parse("traveler@example.com").unwrap();
    let user = store.create_user(&email).await.unwrap();
    let tour = store.seed_tour("Hue Citadel Tour", Decimal::new(5900, 2)).await;

    let cart = CartAggregator::new(&store, &notifier);
    cart.add_item(user.id, tour.id, 1).await.unwrap();
    let (order, _) = cart.checkout(user.id, &contact()).await.unwrap();

    let machine = OrderStateMachine::new(&store, &notifier);
    machine.delete(order.id).await.unwrap();

    assert!(store.order_by_id(order.id).await.unwrap().is_none());
    assert!(store.order_lines(order.id).await.unwrap().is_empty());
}
