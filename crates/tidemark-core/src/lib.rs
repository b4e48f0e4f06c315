//! tidemark-core: Shared types for causal bookmark tracking.
//!
//! This crate provides the foundational types used across all Tidemark crates:
//! - `Bookmark` and `Frontier` for causal-consistency tokens
//! - `BookmarksUpdated` change notifications
//! - Configuration management
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::{ManagerKind, TidemarkConfig};
pub use error::TidemarkError;
pub use events::{BookmarksUpdated, EventId};
pub use types::{Bookmark, Frontier};
