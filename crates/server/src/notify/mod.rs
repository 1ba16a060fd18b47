//! Outbound notification boundary.
//!
//! The workflow services never talk SMTP directly; they hand a
//! [`Notification`] to a [`Notifier`]. Delivery is best-effort by contract:
//! callers log failures and never roll back committed state because an email
//! did not go out.

pub mod smtp;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use tourline_core::{Email, OrderStatus};

use crate::models::{Order, OrderLine};

pub use smtp::SmtpNotifier;

/// The message template a notification renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// A verification code was issued.
    OtpIssued,
    /// An order was created at checkout.
    OrderCreated,
    /// An order moved to a new lifecycle status.
    OrderStatusChanged,
}

/// A notification payload, carrying the context its template needs.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Deliver a freshly issued verification code.
    OtpIssued {
        /// The 6-digit code.
        code: String,
        /// When the code stops being redeemable.
        expire_at: DateTime<Utc>,
    },
    /// Confirm a newly created order.
    OrderCreated {
        /// The committed order.
        order: Order,
        /// Its line snapshot.
        lines: Vec<OrderLine>,
    },
    /// Announce a status transition.
    OrderStatusChanged {
        /// The order after the transition.
        order: Order,
        /// The status it moved away from.
        old_status: OrderStatus,
    },
}

impl Notification {
    /// The template this notification renders with.
    #[must_use]
    pub const fn kind(&self) -> TemplateKind {
        match self {
            Self::OtpIssued { .. } => TemplateKind::OtpIssued,
            Self::OrderCreated { .. } => TemplateKind::OrderCreated,
            Self::OrderStatusChanged { .. } => TemplateKind::OrderStatusChanged,
        }
    }
}

/// Errors that can occur when sending a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Failed to build the email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    /// The delivery backend refused the message.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Boundary contract for outbound delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Format and deliver `notification` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the message cannot be rendered or the
    /// transport refuses it. Callers treat this as best-effort.
    async fn notify(&self, recipient: &Email, notification: Notification)
    -> Result<(), NotifyError>;
}

/// Recording [`Notifier`] for tests and local development.
///
/// Stores every delivered notification and can be switched into a failing
/// mode to exercise the best-effort paths.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<(Email, Notification)>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryNotifier {
    /// Create a new recording notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    pub async fn sent(&self) -> Vec<(Email, Notification)> {
        self.sent.lock().await.clone()
    }

    /// Number of deliveries so far.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// When `failing` is set, every delivery attempt is rejected.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(
        &self,
        recipient: &Email,
        notification: Notification,
    ) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected("delivery disabled".to_owned()));
        }
        self.sent
            .lock()
            .await
            .push((recipient.clone(), notification));
        Ok(())
    }
}
