//! Tidemark Manager — the bookmark frontier.
//!
//! A bookmark manager holds the set of causal-consistency tokens that
//! represent the latest state this client has observed. Transactions read
//! the frontier before they begin and report the tokens they consumed and
//! produced after they commit. The managers themselves are pure in-memory
//! bookkeeping and never fail; persistence lives in [`store`], which seeds
//! a manager once at construction and is attached as an observer.

pub mod default;
pub mod noop;
pub mod observer;
pub mod store;
pub mod supplier;

use std::sync::Arc;

use tidemark_core::{Bookmark, Frontier, ManagerKind, TidemarkConfig};

pub use default::{DefaultBookmarkManager, DefaultBookmarkManagerBuilder};
pub use noop::NoopBookmarkManager;
pub use observer::{BookmarkObserver, EventChannel, Observers};
pub use store::{FileBookmarkStore, FrontierRecord, StoreError};
pub use supplier::BookmarkSupplier;

/// Tracks the bookmark frontier shared by all transactions of a client.
///
/// Implementations must be safe to call from independent transactions on
/// different threads at the same time.
pub trait BookmarkManager: Send + Sync {
    /// Merge any seed tokens into the frontier and return a snapshot of it.
    fn get_bookmarks(&self) -> Frontier;

    /// Remove `used` from the frontier and add every present token of `new`.
    ///
    /// `None` entries stand for tokens a driver did not produce; they are
    /// skipped.
    fn update_bookmarks(&self, used: &Frontier, new: &[Option<Bookmark>]);
}

/// A manager with an empty frontier and no seed.
pub fn create() -> Arc<dyn BookmarkManager> {
    Arc::new(DefaultBookmarkManager::builder().build())
}

/// A manager seeded from `supplier` on every read.
pub fn with_supplier(supplier: impl BookmarkSupplier + 'static) -> Arc<dyn BookmarkManager> {
    Arc::new(DefaultBookmarkManager::builder().supplier(supplier).build())
}

/// A manager that never hands out bookmarks.
pub fn noop() -> Arc<dyn BookmarkManager> {
    Arc::new(NoopBookmarkManager)
}

/// A manager assembled from configuration, plus the channel its updates go to.
pub struct ConfiguredManager {
    pub manager: Arc<dyn BookmarkManager>,
    pub events: EventChannel,
}

/// Build the manager described by `config`.
///
/// With a `seed_file` the stored frontier is loaded once and becomes the
/// initial frontier; with `persist` the store also receives every update.
/// Reads never touch the file.
pub fn from_config(config: &TidemarkConfig) -> ConfiguredManager {
    let events = EventChannel::with_capacity(config.event_capacity);

    let manager: Arc<dyn BookmarkManager> = match config.manager {
        ManagerKind::Noop => {
            tracing::info!("Bookmark tracking disabled");
            Arc::new(NoopBookmarkManager)
        }
        ManagerKind::Default => {
            let mut builder = DefaultBookmarkManager::builder().observer(events.clone());
            if let Some(path) = &config.seed_file {
                let store = FileBookmarkStore::new(path);
                match store.load_record() {
                    Ok(Some(record)) => {
                        builder = builder
                            .initial(record.bookmarks)
                            .resume_from(record.generation);
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        seed_file = %path.display(),
                        error = %e,
                        "Stored frontier unreadable; starting empty from generation 0"
                    ),
                }
                if config.persist {
                    builder = builder.observer(store);
                }
                tracing::info!(
                    seed_file = %path.display(),
                    persist = config.persist,
                    "Bookmark manager seeded from file"
                );
            }
            Arc::new(builder.build())
        }
    };

    ConfiguredManager { manager, events }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bm(s: &str) -> Bookmark {
        Bookmark::parse(s).unwrap()
    }

    #[test]
    fn create_starts_empty() {
        let manager = create();
        assert!(manager.get_bookmarks().is_empty());
    }

    #[test]
    fn with_supplier_seeds_frontier() {
        let manager = with_supplier(|| vec![bm("seed")]);
        assert!(manager.get_bookmarks().contains(&bm("seed")));
    }

    #[test]
    fn from_config_noop() {
        let config = TidemarkConfig {
            manager: ManagerKind::Noop,
            ..Default::default()
        };
        let configured = from_config(&config);
        let mut rx = configured.events.subscribe();

        configured.manager.update_bookmarks(&Frontier::new(), &[Some(bm("a"))]);

        assert!(configured.manager.get_bookmarks().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn from_config_publishes_to_channel() {
        let configured = from_config(&TidemarkConfig::default());
        let mut rx = configured.events.subscribe();

        configured.manager.update_bookmarks(&Frontier::new(), &[Some(bm("a"))]);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.generation, 1);
        assert!(event.bookmarks.contains(&bm("a")));
    }

    #[test]
    fn from_config_persists_to_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.json");
        let config = TidemarkConfig {
            seed_file: Some(path.clone()),
            persist: true,
            ..Default::default()
        };

        let configured = from_config(&config);
        configured.manager.update_bookmarks(&Frontier::new(), &[Some(bm("a"))]);

        let reloaded = FileBookmarkStore::new(&path).load().unwrap();
        assert!(reloaded.contains(&bm("a")));

        // A fresh manager on the same file picks the frontier back up and
        // keeps numbering where the last one stopped.
        let restarted = from_config(&config);
        assert!(restarted.manager.get_bookmarks().contains(&bm("a")));
        restarted
            .manager
            .update_bookmarks(&Frontier::new(), &[Some(bm("b"))]);
        let record = FileBookmarkStore::new(&path).load_record().unwrap().unwrap();
        assert_eq!(record.generation, 2);
    }

    fn seeded_config(path: &std::path::Path, persist: bool) -> TidemarkConfig {
        TidemarkConfig {
            seed_file: Some(path.to_path_buf()),
            persist,
            ..Default::default()
        }
    }

    fn seed(path: &std::path::Path, tokens: &[&str]) {
        let frontier: Frontier = tokens.iter().map(|t| bm(t)).collect();
        FileBookmarkStore::new(path)
            .save(&tidemark_core::BookmarksUpdated::new(1, frontier))
            .unwrap();
    }

    #[test]
    fn consumed_seed_tokens_do_not_return() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.json");
        seed(&path, &["a"]);

        for persist in [false, true] {
            let manager = from_config(&seeded_config(&path, persist)).manager;
            let used = manager.get_bookmarks();
            assert!(used.contains(&bm("a")), "persist={persist}");

            manager.update_bookmarks(&used, &[Some(bm("b"))]);

            let after = manager.get_bookmarks();
            assert_eq!(after.len(), 1, "persist={persist}");
            assert!(after.contains(&bm("b")), "persist={persist}");
        }
    }

    #[test]
    fn seed_file_is_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.json");
        seed(&path, &["a"]);

        let manager = from_config(&seeded_config(&path, false)).manager;
        seed(&path, &["late"]);

        let frontier = manager.get_bookmarks();
        assert!(frontier.contains(&bm("a")));
        assert!(!frontier.contains(&bm("late")));
    }

    #[test]
    fn persisted_chain_collapses_under_concurrent_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frontier.json");
        seed(&path, &["t0"]);
        let manager = from_config(&seeded_config(&path, true)).manager;

        std::thread::scope(|s| {
            for _ in 0..4 {
                let reader = Arc::clone(&manager);
                s.spawn(move || {
                    for _ in 0..300 {
                        reader.get_bookmarks();
                    }
                });
            }
            for i in 1..=300 {
                let used: Frontier = std::iter::once(bm(&format!("t{}", i - 1))).collect();
                manager.update_bookmarks(&used, &[Some(bm(&format!("t{i}")))]);
            }
        });

        let frontier = manager.get_bookmarks();
        assert_eq!(frontier.len(), 1);
        assert!(frontier.contains(&bm("t300")));

        let stored = FileBookmarkStore::new(&path).load_record().unwrap().unwrap();
        assert_eq!(stored.generation, 301);
        assert!(stored.bookmarks.contains(&bm("t300")));
    }
}
