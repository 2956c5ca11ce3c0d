//! Scheduler metrics via the `metrics` crate facade.
//!
//! Nothing here installs a recorder; without one every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::scheduler::Priority;

/// Register metric descriptions. Call once after installing a recorder.
pub fn init_metrics() {
    describe_counter!(
        "ingest_requests_total",
        "Ingestion requests accepted, by priority"
    );
    describe_counter!(
        "ingest_batches_enqueued_total",
        "Batches pushed onto the pending queue, by priority"
    );
    describe_counter!(
        "ingest_batches_completed_total",
        "Batches drained to completion, by priority"
    );
    describe_counter!(
        "ingest_work_failures_total",
        "Work items whose unit of work returned an error"
    );
    describe_gauge!("ingest_queue_depth", "Pending batches awaiting execution");
    describe_histogram!(
        "ingest_batch_latency_ms",
        "Wall time from trigger to completion of one batch"
    );
}

/// Record an accepted submission and the batches it queued.
pub fn record_submission(priority: Priority, batches: usize) {
    let label = priority.as_str();
    counter!("ingest_requests_total", "priority" => label).increment(1);
    counter!("ingest_batches_enqueued_total", "priority" => label).increment(batches as u64);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("ingest_queue_depth").set(depth as f64);
}

/// Record a batch reaching `completed`.
pub fn record_batch_completed(priority: Priority, latency_ms: u64) {
    counter!("ingest_batches_completed_total", "priority" => priority.as_str()).increment(1);
    histogram!("ingest_batch_latency_ms").record(latency_ms as f64);
}

pub fn record_work_failure() {
    counter!("ingest_work_failures_total").increment(1);
}
