//! The seam between the transaction boundary and a database driver.

use std::future::Future;

use tidemark_core::{Bookmark, Frontier};

use crate::config::TransactionConfig;

/// Errors from driver and transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(String),

    #[error("Bookmark {bookmark} is ahead of the latest committed state ({latest})")]
    BookmarkAhead { bookmark: String, latest: u64 },

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Write attempted in a read-only transaction")]
    ReadOnly,

    #[error("Driver error: {0}")]
    Driver(String),
}

/// A database driver able to open transactions that wait for a frontier.
pub trait GraphDriver: Send + Sync {
    type Transaction: DriverTransaction;

    /// Open a transaction that observes at least the state implied by
    /// `bookmarks`.
    fn begin(
        &self,
        config: &TransactionConfig,
        bookmarks: &Frontier,
    ) -> impl Future<Output = Result<Self::Transaction, TxError>> + Send;
}

/// An open driver transaction.
pub trait DriverTransaction: Send {
    /// Commit and return the bookmark for the resulting state, if the
    /// driver issued one.
    fn commit(self) -> impl Future<Output = Result<Option<Bookmark>, TxError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), TxError>> + Send;
}
