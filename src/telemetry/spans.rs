//! Span factory for drained batches.

use tracing::{info_span, Span};

use crate::scheduler::QueueEntry;

/// Factory for creating standardized batch spans.
pub struct BatchSpan;

impl BatchSpan {
    /// Create a span for one drain cycle.
    ///
    /// Fields included:
    /// - `ingestion_id`: Request owning the batch
    /// - `batch_index`: Position within the request's batches
    /// - `priority`: Priority copied at enqueue time
    /// - `latency_ms`: To be filled in after completion
    /// - `failed_items`: To be filled in after completion
    pub fn new(entry: &QueueEntry) -> Span {
        info_span!(
            "batch",
            ingestion_id = %entry.ingestion_id,
            batch_index = entry.batch_index,
            priority = %entry.priority,
            latency_ms = tracing::field::Empty,
            failed_items = tracing::field::Empty,
        )
    }
}
