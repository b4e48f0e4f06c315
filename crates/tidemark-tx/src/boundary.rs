//! Transaction boundary: frontier in on begin, frontier out on commit.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tidemark_core::{Bookmark, Frontier};
use tidemark_manager::BookmarkManager;

use crate::config::TransactionConfig;
use crate::driver::{DriverTransaction, GraphDriver, TxError};

/// Opens driver transactions chained through a bookmark manager.
pub struct BookmarkedTransactions<D> {
    driver: D,
    manager: Arc<dyn BookmarkManager>,
}

impl<D: GraphDriver> BookmarkedTransactions<D> {
    pub fn new(driver: D, manager: Arc<dyn BookmarkManager>) -> Self {
        Self { driver, manager }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn manager(&self) -> &Arc<dyn BookmarkManager> {
        &self.manager
    }

    /// Begin a transaction that waits for the current frontier.
    pub async fn begin(
        &self,
        config: &TransactionConfig,
    ) -> Result<ManagedTransaction<D::Transaction>, TxError> {
        let used = self.manager.get_bookmarks();

        tracing::debug!(
            database = ?config.database,
            mode = ?config.mode,
            bookmarks = used.len(),
            digest = %used.digest(),
            "Beginning transaction"
        );

        let tx = self.driver.begin(config, &used).await?;
        Ok(ManagedTransaction {
            tx,
            scope: FrontierScope {
                used,
                manager: Arc::clone(&self.manager),
                finished: false,
            },
        })
    }

    /// Run `work` in a transaction; commit on `Ok`, roll back on `Err`.
    ///
    /// Returns the work's result together with the bookmark of the commit.
    pub async fn execute<R, F>(
        &self,
        config: &TransactionConfig,
        work: F,
    ) -> Result<(R, Option<Bookmark>), TxError>
    where
        R: Send,
        F: FnOnce(&mut D::Transaction) -> Result<R, TxError> + Send,
    {
        let mut tx = self.begin(config).await?;

        match work(&mut *tx) {
            Ok(value) => {
                let bookmark = tx.commit().await?;
                Ok((value, bookmark))
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback after failed work also failed");
                }
                Err(e)
            }
        }
    }
}

/// A driver transaction that remembers the frontier it started from.
///
/// Derefs to the driver transaction for the actual work.
pub struct ManagedTransaction<T: DriverTransaction> {
    tx: T,
    scope: FrontierScope,
}

/// The frontier side of a transaction. Warns when dropped unfinished.
struct FrontierScope {
    used: Frontier,
    manager: Arc<dyn BookmarkManager>,
    finished: bool,
}

impl<T: DriverTransaction> ManagedTransaction<T> {
    /// The frontier this transaction was opened with.
    pub fn used_bookmarks(&self) -> &Frontier {
        &self.scope.used
    }

    /// Commit, then replace the used bookmarks with the returned one.
    ///
    /// A failed commit leaves the frontier untouched.
    pub async fn commit(self) -> Result<Option<Bookmark>, TxError> {
        let Self { tx, mut scope } = self;
        scope.finished = true;

        let bookmark = tx.commit().await?;
        scope
            .manager
            .update_bookmarks(&scope.used, std::slice::from_ref(&bookmark));

        tracing::debug!(
            used = scope.used.len(),
            bookmark = ?bookmark.as_ref().map(Bookmark::as_str),
            "Transaction committed"
        );
        Ok(bookmark)
    }

    /// Roll back. The frontier is not touched.
    pub async fn rollback(self) -> Result<(), TxError> {
        let Self { tx, mut scope } = self;
        scope.finished = true;

        tx.rollback().await?;
        tracing::debug!(used = scope.used.len(), "Transaction rolled back");
        Ok(())
    }
}

impl<T: DriverTransaction> Deref for ManagedTransaction<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.tx
    }
}

impl<T: DriverTransaction> DerefMut for ManagedTransaction<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.tx
    }
}

impl Drop for FrontierScope {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                used = self.used.len(),
                "Transaction dropped without commit or rollback; frontier unchanged"
            );
        }
    }
}
