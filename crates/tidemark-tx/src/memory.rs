//! In-memory causal cluster.
//!
//! One leader takes every write; read replicas only see those writes once
//! they are replicated. A transaction that arrives at a lagging member with
//! a bookmark makes the member catch up first, which is what a real cluster
//! does when it waits for a bookmark. Bookmarks look like `mem:<seq>`,
//! where `seq` counts committed write transactions.
//!
//! Concurrent writers are applied in commit order with last-writer-wins;
//! there is no conflict detection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tidemark_core::{Bookmark, Frontier};

use crate::config::{AccessMode, TransactionConfig};
use crate::driver::{DriverTransaction, GraphDriver, TxError};

const BOOKMARK_PREFIX: &str = "mem:";
const DEFAULT_DATABASE: &str = "neo4j";

/// Which cluster member serves a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member {
    Leader,
    Replica(usize),
}

#[derive(Debug, Clone)]
enum Write {
    Put(String, String),
    Delete(String),
}

#[derive(Debug, Default, Clone)]
struct MemberState {
    applied: u64,
    data: BTreeMap<String, String>,
}

impl MemberState {
    fn catch_up(&mut self, log: &[Vec<Write>], target: u64) {
        while self.applied < target {
            for write in &log[self.applied as usize] {
                match write {
                    Write::Put(k, v) => {
                        self.data.insert(k.clone(), v.clone());
                    }
                    Write::Delete(k) => {
                        self.data.remove(k);
                    }
                }
            }
            self.applied += 1;
        }
    }
}

/// Counters describing cluster activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    /// Sequence number of the latest committed write transaction.
    pub latest: u64,
    pub commits: u64,
    /// Transactions that had to wait for a member to catch up.
    pub causal_waits: u64,
}

#[derive(Default)]
struct ClusterState {
    log: Vec<Vec<Write>>,
    leader: MemberState,
    replicas: Vec<MemberState>,
    commits: u64,
    causal_waits: u64,
}

impl ClusterState {
    fn latest(&self) -> u64 {
        self.log.len() as u64
    }
}

struct ClusterInner {
    database: String,
    state: Mutex<ClusterState>,
    next_replica: AtomicUsize,
}

/// A simulated leader/replica cluster. Clones share the cluster.
#[derive(Clone)]
pub struct MemoryCluster {
    inner: Arc<ClusterInner>,
}

impl MemoryCluster {
    /// A cluster with `replicas` read replicas serving the default database.
    pub fn new(replicas: usize) -> Self {
        Self::with_database(DEFAULT_DATABASE, replicas)
    }

    pub fn with_database(database: impl Into<String>, replicas: usize) -> Self {
        let state = ClusterState {
            replicas: vec![MemberState::default(); replicas],
            ..Default::default()
        };
        Self {
            inner: Arc::new(ClusterInner {
                database: database.into(),
                state: Mutex::new(state),
                next_replica: AtomicUsize::new(0),
            }),
        }
    }

    pub fn database(&self) -> &str {
        &self.inner.database
    }

    pub fn replica_count(&self) -> usize {
        self.inner.state.lock().replicas.len()
    }

    /// Bring every replica up to the leader.
    pub fn replicate(&self) {
        let mut state = self.inner.state.lock();
        let latest = state.latest();
        let ClusterState { log, replicas, .. } = &mut *state;
        for replica in replicas.iter_mut() {
            replica.catch_up(log.as_slice(), latest);
        }
        tracing::trace!(latest, "Replicas caught up");
    }

    /// How many committed transactions `replica` has not applied yet.
    pub fn lag(&self, replica: usize) -> Option<u64> {
        let state = self.inner.state.lock();
        let latest = state.latest();
        state.replicas.get(replica).map(|r| latest - r.applied)
    }

    pub fn latest_bookmark(&self) -> Option<Bookmark> {
        let latest = self.inner.state.lock().latest();
        (latest > 0).then(|| format_bookmark(latest))
    }

    pub fn stats(&self) -> ClusterStats {
        let state = self.inner.state.lock();
        ClusterStats {
            latest: state.latest(),
            commits: state.commits,
            causal_waits: state.causal_waits,
        }
    }

    fn route(&self, mode: AccessMode, replicas: usize) -> Member {
        match mode {
            AccessMode::Write => Member::Leader,
            AccessMode::Read if replicas == 0 => Member::Leader,
            AccessMode::Read => {
                let next = self.inner.next_replica.fetch_add(1, Ordering::Relaxed);
                Member::Replica(next % replicas)
            }
        }
    }
}

fn format_bookmark(seq: u64) -> Bookmark {
    Bookmark::parse(&format!("{BOOKMARK_PREFIX}{seq}"))
        .unwrap_or_else(|| unreachable!("formatted bookmark is never blank"))
}

fn parse_bookmark(bookmark: &Bookmark) -> Result<u64, TxError> {
    bookmark
        .as_str()
        .strip_prefix(BOOKMARK_PREFIX)
        .and_then(|seq| seq.parse().ok())
        .ok_or_else(|| TxError::InvalidBookmark(bookmark.to_string()))
}

impl GraphDriver for MemoryCluster {
    type Transaction = MemoryTransaction;

    async fn begin(
        &self,
        config: &TransactionConfig,
        bookmarks: &Frontier,
    ) -> Result<MemoryTransaction, TxError> {
        if let Some(db) = &config.database {
            if db != &self.inner.database {
                return Err(TxError::DatabaseNotFound(db.clone()));
            }
        }

        let mut required = 0;
        for bookmark in bookmarks {
            required = required.max(parse_bookmark(bookmark)?);
        }

        let mut state = self.inner.state.lock();
        let latest = state.latest();
        if required > latest {
            return Err(TxError::BookmarkAhead {
                bookmark: format_bookmark(required).to_string(),
                latest,
            });
        }

        let member = self.route(config.mode, state.replicas.len());
        let ClusterState {
            log,
            leader,
            replicas,
            causal_waits,
            ..
        } = &mut *state;
        let target = match member {
            Member::Leader => leader,
            Member::Replica(i) => &mut replicas[i],
        };

        if target.applied < required {
            tracing::debug!(
                ?member,
                applied = target.applied,
                required,
                "Waiting for member to reach bookmark"
            );
            target.catch_up(log.as_slice(), required);
            *causal_waits += 1;
        }

        Ok(MemoryTransaction {
            cluster: Arc::clone(&self.inner),
            member,
            mode: config.mode,
            base: target.applied,
            view: target.data.clone(),
            writes: Vec::new(),
        })
    }
}

/// A transaction against one member's snapshot.
pub struct MemoryTransaction {
    cluster: Arc<ClusterInner>,
    member: Member,
    mode: AccessMode,
    base: u64,
    view: BTreeMap<String, String>,
    writes: Vec<Write>,
}

impl MemoryTransaction {
    pub fn member(&self) -> Member {
        self.member
    }

    /// Sequence number of the state this transaction reads from.
    pub fn applied(&self) -> u64 {
        self.base
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.view.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TxError> {
        self.ensure_writable()?;
        let (key, value) = (key.into(), value.into());
        self.view.insert(key.clone(), value.clone());
        self.writes.push(Write::Put(key, value));
        Ok(())
    }

    /// Remove `key`; returns whether it was visible to this transaction.
    pub fn delete(&mut self, key: &str) -> Result<bool, TxError> {
        self.ensure_writable()?;
        let existed = self.view.remove(key).is_some();
        self.writes.push(Write::Delete(key.to_string()));
        Ok(existed)
    }

    fn ensure_writable(&self) -> Result<(), TxError> {
        match self.mode {
            AccessMode::Read => Err(TxError::ReadOnly),
            AccessMode::Write => Ok(()),
        }
    }
}

impl DriverTransaction for MemoryTransaction {
    async fn commit(self) -> Result<Option<Bookmark>, TxError> {
        if self.writes.is_empty() {
            return Ok((self.base > 0).then(|| format_bookmark(self.base)));
        }

        let mut state = self.cluster.state.lock();
        state.log.push(self.writes);
        state.commits += 1;
        let latest = state.latest();

        let ClusterState { log, leader, .. } = &mut *state;
        leader.catch_up(log.as_slice(), latest);

        tracing::trace!(seq = latest, "Write committed");
        Ok(Some(format_bookmark(latest)))
    }

    async fn rollback(self) -> Result<(), TxError> {
        tracing::trace!(discarded = self.writes.len(), "Transaction rolled back");
        Ok(())
    }
}
