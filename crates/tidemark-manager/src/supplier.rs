//! Seed token suppliers.

use tidemark_core::Bookmark;

/// Source of externally tracked bookmarks, e.g. from a previous process.
///
/// Called on every `get_bookmarks`; whatever it returns is merged into
/// the frontier permanently.
pub trait BookmarkSupplier: Send + Sync {
    fn supply(&self) -> Vec<Bookmark>;
}

impl<F> BookmarkSupplier for F
where
    F: Fn() -> Vec<Bookmark> + Send + Sync,
{
    fn supply(&self) -> Vec<Bookmark> {
        self()
    }
}
