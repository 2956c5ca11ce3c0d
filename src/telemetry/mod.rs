//! Telemetry module for the ingestion scheduler.
//!
//! Provides structured logging, batch spans, and metrics collection.

mod logging;
mod metrics;
mod spans;

pub use logging::{build_filter, init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_batch_completed, record_queue_depth, record_submission,
    record_work_failure,
};
pub use spans::BatchSpan;
