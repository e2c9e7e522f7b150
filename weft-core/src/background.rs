//! Application background state
//!
//! A `Background` travels with every request dispatched through the view it
//! is bound to. It carries:
//!
//! - Typed values installed once at startup (database handles, shared
//!   clients, configuration)
//! - An optional cancellation signal that the server loops watch for
//!   coordinated shutdown

use http::Extensions;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::debug;

/// Shared background state for an application.
///
/// Cloning is cheap; every clone refers to the same values and the same
/// cancellation signal.
#[derive(Clone)]
pub struct Background {
    inner: Arc<BackgroundInner>,
}

struct BackgroundInner {
    values: RwLock<Extensions>,
    cancel: watch::Sender<bool>,
}

impl Background {
    /// Create a background that is never cancelled.
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(BackgroundInner {
                values: RwLock::new(Extensions::new()),
                cancel,
            }),
        }
    }

    /// Create a background together with the handle that cancels it.
    pub fn cancellable() -> (Self, Cancel) {
        let background = Self::new();
        let cancel = Cancel {
            inner: background.inner.clone(),
        };
        (background, cancel)
    }

    /// Install a typed value, replacing any previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.inner.values.write().unwrap().insert(value);
    }

    /// Fetch a clone of the typed value, if one was installed.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner.values.read().unwrap().get::<T>().cloned()
    }

    /// Whether the background has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    /// Complete once the background is cancelled. Never completes for a
    /// background constructed with [`Background::new`].
    pub async fn cancelled(&self) {
        let mut rx = self.inner.cancel.subscribe();
        // wait_for checks the current value first, so a signal sent before
        // this call is not missed.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels the paired [`Background`].
#[derive(Clone)]
pub struct Cancel {
    inner: Arc<BackgroundInner>,
}

impl Cancel {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel.send_replace(true);
        debug!("background cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Conn(&'static str);

    #[test]
    fn test_insert_and_get() {
        let background = Background::new();
        background.insert(Conn("primary"));
        assert_eq!(background.get::<Conn>(), Some(Conn("primary")));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let background = Background::new();
        assert_eq!(background.get::<Conn>(), None);
    }

    #[test]
    fn test_clones_share_values() {
        let background = Background::new();
        let clone = background.clone();
        background.insert(Conn("shared"));
        assert_eq!(clone.get::<Conn>(), Some(Conn("shared")));
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let background = Background::new();
        background.insert(Conn("first"));
        background.insert(Conn("second"));
        assert_eq!(background.get::<Conn>(), Some(Conn("second")));
    }

    #[test]
    fn test_new_background_is_not_cancelled() {
        let background = Background::new();
        assert!(!background.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let (background, cancel) = Background::cancellable();
        let waiter = tokio::spawn({
            let background = background.clone();
            async move { background.cancelled().await }
        });
        cancel.cancel();
        waiter.await.unwrap();
        assert!(background.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_wait_completes_immediately() {
        let (background, cancel) = Background::cancellable();
        cancel.cancel();
        background.cancelled().await;
        assert!(background.is_cancelled());
    }
}
