//! Single drain loop: pop the highest priority batch, run it, wait.
//!
//! All batches go through this worker, one at a time. Submissions push onto
//! the queue and poll the request store for progress.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::batch::WorkItemId;
use super::ingest::IngestScheduler;
use super::queue::QueueEntry;
use super::store::ProcessingStatus;
use super::work::WorkUnit;
use crate::telemetry::{self, BatchSpan};

/// Delay enforced after every drained batch.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(5000);

/// Configuration for the drain loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Global pause between batches, shared by every request and priority.
    pub rate_limit: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

/// Spawn the drain loop. Returns a handle for shutdown.
///
/// Only one worker should run per scheduler; batches must never overlap.
pub fn spawn_worker(
    scheduler: Arc<IngestScheduler>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        worker_loop(&scheduler, shutdown).await;
    })
}

async fn worker_loop(scheduler: &IngestScheduler, shutdown: CancellationToken) {
    let rate_limit = scheduler.worker_config().rate_limit;
    loop {
        let entry = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("worker: shutdown signal received");
                break;
            }
            entry = scheduler.queue().wait_and_pop() => entry,
        };

        execute_batch(scheduler, entry).await;

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("worker: shutdown signal received");
                break;
            }
            () = tokio::time::sleep(rate_limit) => {}
        }
    }
}

/// Run one drain cycle for `entry`: trigger, execute, complete.
async fn execute_batch(scheduler: &IngestScheduler, entry: QueueEntry) {
    let span = BatchSpan::new(&entry);
    run_cycle(scheduler, entry).instrument(span).await;
}

async fn run_cycle(scheduler: &IngestScheduler, entry: QueueEntry) {
    let store = scheduler.store();
    let Some(ids) = store.batch_ids(&entry.ingestion_id, entry.batch_index) else {
        tracing::warn!("queued batch has no matching record, skipping");
        return;
    };

    let status = store.set_batch_status(
        &entry.ingestion_id,
        entry.batch_index,
        ProcessingStatus::Triggered,
    );
    tracing::debug!(items = ids.len(), request_status = ?status, "batch triggered");

    let start = Instant::now();
    let failed = run_items(scheduler.work(), &entry, &ids).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let status = store.set_batch_status(
        &entry.ingestion_id,
        entry.batch_index,
        ProcessingStatus::Completed,
    );

    let span = tracing::Span::current();
    span.record("latency_ms", latency_ms);
    span.record("failed_items", failed as u64);
    telemetry::record_batch_completed(entry.priority, latency_ms);
    tracing::info!(request_status = ?status, "batch completed");
}

/// Run the work unit for every item concurrently. Returns the failure count.
///
/// A failed item does not fail its batch: it is logged and counted, and the
/// batch still completes.
async fn run_items(work: &dyn WorkUnit, entry: &QueueEntry, ids: &[WorkItemId]) -> usize {
    let results = join_all(ids.iter().map(|&id| work.process(id))).await;

    let mut failed = 0;
    for result in results {
        if let Err(e) = result {
            tracing::warn!(
                ingestion_id = %entry.ingestion_id,
                batch_index = entry.batch_index,
                item_id = e.id,
                error = %e,
                "work item failed"
            );
            telemetry::record_work_failure();
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
