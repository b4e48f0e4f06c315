use tidemark_core::{Bookmark, Frontier};

use crate::BookmarkManager;

/// Manager for clients that opt out of causal chaining.
///
/// Hands out an empty frontier and ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBookmarkManager;

impl BookmarkManager for NoopBookmarkManager {
    fn get_bookmarks(&self) -> Frontier {
        Frontier::new()
    }

    fn update_bookmarks(&self, _used: &Frontier, _new: &[Option<Bookmark>]) {}
}
