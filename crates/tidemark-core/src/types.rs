//! Core bookmark types.
//!
//! A bookmark is an opaque token the database hands back after a commit.
//! The client never interprets it; it only collects the latest ones into
//! a frontier and passes that frontier to the next transaction.

use std::collections::hash_set;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TidemarkError;

// ── Bookmark ──────────────────────────────────────────────────────

/// Causal-consistency token issued by the database after a committed transaction.
///
/// Tokens carry no client-visible ordering; two bookmarks are only
/// comparable for identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bookmark(String);

impl Bookmark {
    /// Parse a raw token as handed out by a driver.
    ///
    /// Empty and whitespace-only tokens are how drivers say "no bookmark";
    /// they yield `None` and are never admitted into a frontier. Any other
    /// token is kept byte for byte.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    /// The raw token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Bookmark {
    type Err = TidemarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| TidemarkError::InvalidBookmark("empty token".to_string()))
    }
}

impl AsRef<str> for Bookmark {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Frontier ──────────────────────────────────────────────────────

/// Immutable snapshot of the bookmarks that represent the latest state
/// this client has observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier(HashSet<Bookmark>);

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, bookmark: &Bookmark) -> bool {
        self.0.contains(bookmark)
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Bookmark> {
        self.0.iter()
    }

    /// Tokens in ascending lexical order, for stable output.
    pub fn sorted(&self) -> Vec<&Bookmark> {
        let mut tokens: Vec<&Bookmark> = self.0.iter().collect();
        tokens.sort();
        tokens
    }

    /// BLAKE3 hex digest of the sorted tokens.
    ///
    /// Two frontiers with the same tokens always share a digest, regardless
    /// of the order in which they were built.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for token in self.sorted() {
            let bytes = token.as_str().as_bytes();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl FromIterator<Bookmark> for Frontier {
    fn from_iter<I: IntoIterator<Item = Bookmark>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Bookmark> for Frontier {
    fn extend<I: IntoIterator<Item = Bookmark>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Frontier {
    type Item = Bookmark;
    type IntoIter = hash_set::IntoIter<Bookmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Frontier {
    type Item = &'a Bookmark;
    type IntoIter = hash_set::Iter<'a, Bookmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<HashSet<Bookmark>> for Frontier {
    fn from(set: HashSet<Bookmark>) -> Self {
        Self(set)
    }
}

impl Serialize for Frontier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sorted().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Frontier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        Ok(raw.iter().filter_map(|s| Bookmark::parse(s)).collect())
    }
}
