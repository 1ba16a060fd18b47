//! Application state shared across handlers.

use std::sync::Arc;

use crate::notify::Notifier;
use crate::store::Store;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; the store and notifier are trait objects so
/// the backends can be swapped per environment (PostgreSQL + SMTP in
/// production, in-memory doubles in tests).
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, notifier }),
        }
    }

    /// The persistence backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        &*self.inner.store
    }

    /// The outbound notification backend.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        &*self.inner.notifier
    }
}
