//! Change notifications published by bookmark managers.
//!
//! Every frontier update yields exactly one `BookmarksUpdated`. Events are
//! delivered outside the manager's lock, so consumers that care about order
//! compare `generation` and drop anything older than what they have seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Frontier;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The frontier changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarksUpdated {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    /// Strictly increasing per manager; one step per update.
    pub generation: u64,
    /// Snapshot of the frontier right after the update.
    pub bookmarks: Frontier,
}

impl BookmarksUpdated {
    pub fn new(generation: u64, bookmarks: Frontier) -> Self {
        Self {
            id: EventId::new(),
            timestamp: Utc::now(),
            generation,
            bookmarks,
        }
    }

    /// True if this event carries newer state than `other`.
    pub fn supersedes(&self, other: &BookmarksUpdated) -> bool {
        self.generation > other.generation
    }
}
