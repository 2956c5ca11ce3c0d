//! Batch scheduling module.
//!
//! Partitions submitted work items into batches, orders pending batches by
//! priority and arrival, and drains them one at a time under a global rate
//! limit while tracking per-batch and per-request status.

mod batch;
mod ingest;
mod priority;
mod queue;
mod store;
mod work;
mod worker;

pub use batch::{partition, BatchConfig, WorkItemId, DEFAULT_BATCH_SIZE};
pub use ingest::{IngestScheduler, SchedulerConfig};
pub use priority::{ParsePriorityError, Priority, PriorityQueue};
pub use queue::{BatchQueue, BatchQueueConfig, DrainState, EnqueuePermit, QueueEntry, QueueError};
pub use store::{
    derive_status, Batch, BatchId, Ingestion, IngestionId, ProcessingStatus, RequestStore,
};
pub use work::{SimulatedWork, WorkError, WorkUnit, DEFAULT_WORK_LATENCY};
pub use worker::{spawn_worker, WorkerConfig, DEFAULT_RATE_LIMIT};
