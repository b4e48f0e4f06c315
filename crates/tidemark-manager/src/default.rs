//! Mutex-guarded bookmark frontier.

use std::collections::HashSet;

use parking_lot::Mutex;

use tidemark_core::{Bookmark, BookmarksUpdated, Frontier};

use crate::observer::{BookmarkObserver, Observers};
use crate::supplier::BookmarkSupplier;
use crate::BookmarkManager;

struct FrontierState {
    bookmarks: HashSet<Bookmark>,
    generation: u64,
}

/// The standard bookmark manager.
///
/// All mutations of the frontier happen under one lock. Reads return a
/// snapshot copy, so callers never observe a half-applied update. Seed
/// tokens are fetched and observers are notified outside the lock.
pub struct DefaultBookmarkManager {
    state: Mutex<FrontierState>,
    supplier: Option<Box<dyn BookmarkSupplier>>,
    observers: Observers,
}

impl DefaultBookmarkManager {
    pub fn builder() -> DefaultBookmarkManagerBuilder {
        DefaultBookmarkManagerBuilder::default()
    }

    /// Number of updates applied so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

impl BookmarkManager for DefaultBookmarkManager {
    fn get_bookmarks(&self) -> Frontier {
        let seed = self
            .supplier
            .as_ref()
            .map(|s| s.supply())
            .unwrap_or_default();

        let mut state = self.state.lock();
        state.bookmarks.extend(seed);
        Frontier::from(state.bookmarks.clone())
    }

    fn update_bookmarks(&self, used: &Frontier, new: &[Option<Bookmark>]) {
        let (event, removed, added) = {
            let mut state = self.state.lock();

            let removed = used.iter().filter(|b| state.bookmarks.remove(*b)).count();
            let added = new
                .iter()
                .flatten()
                .filter(|b| state.bookmarks.insert((*b).clone()))
                .count();

            state.generation += 1;
            let snapshot = Frontier::from(state.bookmarks.clone());
            (BookmarksUpdated::new(state.generation, snapshot), removed, added)
        };

        tracing::debug!(
            generation = event.generation,
            removed,
            added,
            size = event.bookmarks.len(),
            digest = %event.bookmarks.digest(),
            "Bookmarks updated"
        );

        self.observers.bookmarks_updated(&event);
    }
}

/// Builder for [`DefaultBookmarkManager`].
#[derive(Default)]
pub struct DefaultBookmarkManagerBuilder {
    initial: HashSet<Bookmark>,
    generation: u64,
    supplier: Option<Box<dyn BookmarkSupplier>>,
    observers: Observers,
}

impl DefaultBookmarkManagerBuilder {
    /// Tokens the frontier starts out with.
    pub fn initial(mut self, bookmarks: impl IntoIterator<Item = Bookmark>) -> Self {
        self.initial.extend(bookmarks);
        self
    }

    /// Continue generation numbering after `generation`, e.g. from a
    /// persisted record, so that the next update is `generation + 1`.
    pub fn resume_from(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Seed source consulted on every read. Replaces any earlier supplier.
    pub fn supplier(mut self, supplier: impl BookmarkSupplier + 'static) -> Self {
        self.supplier = Some(Box::new(supplier));
        self
    }

    /// Add an observer. May be called more than once.
    pub fn observer(mut self, observer: impl BookmarkObserver + 'static) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> DefaultBookmarkManager {
        DefaultBookmarkManager {
            state: Mutex::new(FrontierState {
                bookmarks: self.initial,
                generation: self.generation,
            }),
            supplier: self.supplier,
            observers: self.observers,
        }
    }
}
