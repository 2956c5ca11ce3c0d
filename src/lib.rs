//! ingest-core
//!
//! In-memory, priority-aware, rate-limited batch ingestion scheduler.
//!
//! Clients submit lists of work item ids with a priority. Each submission is
//! split into fixed-size batches, and a single worker drains batches one at a
//! time in priority order, pausing for a global rate limit after every batch.
//! Clients poll for per-request and per-batch status.
//!
//! # Components
//!
//! - [`scheduler`]: partitioning, request store, priority queue, drain worker
//! - [`api`]: submit/status messages with validation and status codes
//! - [`shutdown`]: stop accepting, drain, stop
//! - [`config`]: `INGEST_CORE_*` environment configuration
//! - [`telemetry`]: logging, metrics, and per-batch spans

pub mod api;
pub mod cli;
pub mod config;
pub mod scheduler;
pub mod shutdown;
pub mod telemetry;

use std::sync::Arc;

use api::ApiHandler;
use config::EnvConfig;
use scheduler::{IngestScheduler, SimulatedWork, WorkUnit};
use shutdown::ShutdownCoordinator;

/// The assembled service: scheduler, request handler, and shutdown control.
pub struct Runtime {
    pub config: EnvConfig,
    pub scheduler: Arc<IngestScheduler>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub handler: Arc<ApiHandler>,
}

impl Runtime {
    /// Create a runtime whose work unit simulates the external call.
    pub fn new(config: EnvConfig) -> Self {
        let work = Arc::new(SimulatedWork::new(config.work_latency));
        Self::with_work(config, work)
    }

    /// Create a runtime around a caller-supplied work unit.
    pub fn with_work(config: EnvConfig, work: Arc<dyn WorkUnit>) -> Self {
        let scheduler = Arc::new(IngestScheduler::new(config.scheduler.clone(), work));
        let shutdown = Arc::new(ShutdownCoordinator::new());
        let handler = Arc::new(ApiHandler::new(scheduler.clone(), shutdown.clone()));

        Self {
            config,
            scheduler,
            shutdown,
            handler,
        }
    }
}
