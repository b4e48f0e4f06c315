//! Concurrent read-after-write workload against the in-memory cluster.
//!
//! Each worker writes a key and immediately reads it back through a read
//! replica. With bookmark tracking every read sees its write; without it,
//! replicas serve whatever they have replicated so far.

use std::sync::Arc;

use serde::Serialize;

use tidemark_manager::BookmarkManager;
use tidemark_tx::{BookmarkedTransactions, MemoryCluster, TransactionConfig, TxError};

/// Outcome for one worker.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub writes: usize,
    pub stale_reads: usize,
}

/// Outcome for the whole run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub replicas: usize,
    pub commits: u64,
    pub causal_waits: u64,
    pub final_bookmarks: Vec<String>,
    pub workers: Vec<WorkerReport>,
}

impl SimulationReport {
    pub fn stale_reads(&self) -> usize {
        self.workers.iter().map(|w| w.stale_reads).sum()
    }
}

pub async fn run_simulation(
    manager: Arc<dyn BookmarkManager>,
    replicas: usize,
    workers: usize,
    writes: usize,
) -> Result<SimulationReport, TxError> {
    let cluster = MemoryCluster::new(replicas);
    let txs = Arc::new(BookmarkedTransactions::new(cluster.clone(), Arc::clone(&manager)));

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let txs = Arc::clone(&txs);
        handles.push(tokio::spawn(async move {
            run_worker(&txs, worker, writes).await
        }));
    }

    let mut reports = Vec::with_capacity(workers);
    for handle in handles {
        let report = handle
            .await
            .map_err(|e| TxError::Driver(format!("worker task failed: {e}")))??;
        reports.push(report);
    }

    let stats = cluster.stats();
    let final_bookmarks = manager
        .get_bookmarks()
        .sorted()
        .into_iter()
        .map(ToString::to_string)
        .collect();

    Ok(SimulationReport {
        replicas,
        commits: stats.commits,
        causal_waits: stats.causal_waits,
        final_bookmarks,
        workers: reports,
    })
}

async fn run_worker(
    txs: &BookmarkedTransactions<MemoryCluster>,
    worker: usize,
    writes: usize,
) -> Result<WorkerReport, TxError> {
    let mut stale_reads = 0;

    for i in 0..writes {
        let key = format!("worker-{worker}/item-{i}");
        let value = format!("{worker}:{i}");

        txs.execute(&TransactionConfig::write(), |tx| tx.put(key.clone(), value.clone()))
            .await?;

        let (seen, _) = txs
            .execute(&TransactionConfig::read(), |tx| {
                Ok(tx.get(&key).map(str::to_string))
            })
            .await?;

        if seen.as_deref() != Some(value.as_str()) {
            tracing::debug!(worker, key = %key, "Stale read");
            stale_reads += 1;
        }
        tokio::task::yield_now().await;
    }

    tracing::info!(worker, writes, stale_reads, "Worker finished");
    Ok(WorkerReport {
        worker,
        writes,
        stale_reads,
    })
}
