//! Per-transaction settings passed through to the driver.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether a transaction may write.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    #[default]
    Write,
}

/// Settings for one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionConfig {
    /// Target database; `None` means the driver's default.
    pub database: Option<String>,
    pub mode: AccessMode,
    /// Server-side timeout, if the driver supports one.
    pub timeout: Option<Duration>,
    /// Metadata attached to the transaction for server-side logging.
    pub metadata: BTreeMap<String, String>,
}

impl TransactionConfig {
    pub fn read() -> Self {
        Self {
            mode: AccessMode::Read,
            ..Default::default()
        }
    }

    pub fn write() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == AccessMode::Read
    }
}
