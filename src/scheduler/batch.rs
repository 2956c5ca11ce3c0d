//! Request batching logic.

/// Identifier of a single unit of work inside an ingestion request.
pub type WorkItemId = u64;

/// Default number of work items per batch.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Configuration for batch partitioning.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl BatchConfig {
    /// Create config with a specific batch size (floor: 1).
    pub fn with_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Split `ids` into contiguous batches of this config's size.
    pub fn partition(&self, ids: &[WorkItemId]) -> Vec<Vec<WorkItemId>> {
        partition(ids, self.batch_size)
    }
}

/// Split `ids` into contiguous groups of `batch_size`; the last may be shorter.
///
/// Order is preserved and nothing is dropped or deduplicated. A zero
/// `batch_size` is treated as 1.
pub fn partition(ids: &[WorkItemId], batch_size: usize) -> Vec<Vec<WorkItemId>> {
    ids.chunks(batch_size.max(1)).map(<[_]>::to_vec).collect()
}
