//! Ingestion scheduler: the store, the queue, and the work unit in one handle.
//!
//! Construct once per process, wrap in an `Arc`, and share it with the request
//! surface and the drain worker.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::batch::{BatchConfig, WorkItemId};
use super::priority::Priority;
use super::queue::{BatchQueue, BatchQueueConfig, DrainState, QueueEntry, QueueError};
use super::store::{Ingestion, IngestionId, RequestStore};
use super::work::{SimulatedWork, WorkUnit};
use super::worker::{self, WorkerConfig};
use crate::telemetry;

/// Configuration for the whole scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    pub batch: BatchConfig,
    pub queue: BatchQueueConfig,
    pub worker: WorkerConfig,
}

/// Priority-aware, rate-limited batch scheduler.
pub struct IngestScheduler {
    store: RequestStore,
    queue: BatchQueue,
    work: Arc<dyn WorkUnit>,
    worker: WorkerConfig,
}

impl IngestScheduler {
    pub fn new(config: SchedulerConfig, work: Arc<dyn WorkUnit>) -> Self {
        Self {
            store: RequestStore::new(config.batch),
            queue: BatchQueue::new(config.queue),
            work,
            worker: config.worker,
        }
    }

    /// Scheduler whose work unit is the default simulated external call.
    pub fn with_simulated_work(config: SchedulerConfig) -> Self {
        Self::new(config, Arc::new(SimulatedWork::default()))
    }

    /// Partition `ids`, record the request, and queue every batch.
    ///
    /// Record creation and queueing happen under the queue lock, so the
    /// worker can never pop a batch whose record is missing, and a bounded
    /// queue either admits the whole request or none of it.
    pub async fn submit(
        &self,
        ids: &[WorkItemId],
        priority: Priority,
    ) -> Result<IngestionId, QueueError> {
        let batch_count = ids.len().div_ceil(self.store.batch_config().batch_size.max(1));
        let mut permit = self.queue.reserve(batch_count).await?;
        let submitted_at = Instant::now();

        let ingestion = self.store.create(ids, priority);
        for batch_index in 0..ingestion.batches.len() {
            permit.push(QueueEntry {
                ingestion_id: ingestion.ingestion_id,
                batch_index,
                priority,
                submitted_at,
            });
        }
        let depth = permit.len();
        drop(permit);

        telemetry::record_submission(priority, ingestion.batches.len());
        telemetry::record_queue_depth(depth);
        tracing::info!(
            ingestion_id = %ingestion.ingestion_id,
            %priority,
            items = ids.len(),
            batches = ingestion.batches.len(),
            queue_depth = depth,
            "ingestion request accepted"
        );
        Ok(ingestion.ingestion_id)
    }

    /// Current state of a request, or `None` if it was never submitted.
    pub fn status(&self, id: &IngestionId) -> Option<Ingestion> {
        self.store.get(id)
    }

    /// Start the single drain worker for this scheduler.
    pub fn spawn_worker(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        worker::spawn_worker(Arc::clone(self), shutdown)
    }

    pub fn drain_state(&self) -> DrainState {
        self.queue.drain_state()
    }

    /// Batches waiting to start.
    pub async fn pending(&self) -> usize {
        self.queue.len().await
    }

    /// Wake a worker blocked on an empty queue (used during shutdown).
    pub fn wake(&self) {
        self.queue.wake();
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    pub fn queue(&self) -> &BatchQueue {
        &self.queue
    }

    pub(crate) fn work(&self) -> &dyn WorkUnit {
        self.work.as_ref()
    }

    pub fn worker_config(&self) -> &WorkerConfig {
        &self.worker
    }
}
