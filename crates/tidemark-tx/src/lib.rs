//! Tidemark Tx — causal chaining at the transaction boundary.
//!
//! Every transaction begins with the current bookmark frontier and, once
//! committed, replaces the bookmarks it used with the one the database
//! returned. The database itself sits behind the [`GraphDriver`] seam;
//! [`memory::MemoryCluster`] implements it for tests and simulations.

pub mod boundary;
pub mod config;
pub mod driver;
pub mod memory;

pub use boundary::{BookmarkedTransactions, ManagedTransaction};
pub use config::{AccessMode, TransactionConfig};
pub use driver::{DriverTransaction, GraphDriver, TxError};
pub use memory::{ClusterStats, MemoryCluster, MemoryTransaction, Member};
