//! Update notification sinks.
//!
//! Observers are handed to a manager at construction and called once per
//! frontier update, after the update is applied and the lock released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use tidemark_core::BookmarksUpdated;

/// Default broadcast channel capacity.
const DEFAULT_CAPACITY: usize = 1024;

/// Receives a notification after every frontier update.
pub trait BookmarkObserver: Send + Sync {
    fn bookmarks_updated(&self, event: &BookmarksUpdated);
}

impl<F> BookmarkObserver for F
where
    F: Fn(&BookmarksUpdated) + Send + Sync,
{
    fn bookmarks_updated(&self, event: &BookmarksUpdated) {
        self(event)
    }
}

/// Broadcast-based observer.
///
/// Non-blocking: sending never awaits. Slow receivers lag instead of
/// holding up the transaction that produced the update. Clones share the
/// same channel.
#[derive(Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<BookmarksUpdated>,
    emit_count: Arc<AtomicU64>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            emit_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Receive all events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<BookmarksUpdated> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total number of events emitted, including those nobody received.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl BookmarkObserver for EventChannel {
    fn bookmarks_updated(&self, event: &BookmarksUpdated) {
        self.emit_count.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!(generation = event.generation, "No subscribers for bookmark update");
        }
    }
}

/// Fan-out to several observers, in registration order.
#[derive(Default)]
pub struct Observers {
    inner: Vec<Box<dyn BookmarkObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: impl BookmarkObserver + 'static) {
        self.inner.push(Box::new(observer));
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl BookmarkObserver for Observers {
    fn bookmarks_updated(&self, event: &BookmarksUpdated) {
        for observer in &self.inner {
            observer.bookmarks_updated(event);
        }
    }
}
