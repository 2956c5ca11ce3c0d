//! Per-item unit of work executed by the drain loop.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::batch::WorkItemId;

/// Latency of the simulated external call, per item.
pub const DEFAULT_WORK_LATENCY: Duration = Duration::from_millis(1000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("work item {id} failed: {message}")]
pub struct WorkError {
    pub id: WorkItemId,
    pub message: String,
}

/// Asynchronous work performed for a single item of a batch.
///
/// All items of one batch run concurrently; implementations must be safe to
/// call from several tasks at once.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    async fn process(&self, id: WorkItemId) -> Result<(), WorkError>;
}

/// Stand-in for an external API call: waits a fixed latency, then succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    latency: Duration,
}

impl SimulatedWork {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_LATENCY)
    }
}

#[async_trait]
impl WorkUnit for SimulatedWork {
    async fn process(&self, id: WorkItemId) -> Result<(), WorkError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        tracing::trace!(item_id = id, "work item processed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn simulated_work_waits_its_latency() {
        let work = SimulatedWork::new(Duration::from_millis(250));
        let start = tokio::time::Instant::now();
        assert_eq!(work.process(42).await, Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn default_latency_is_one_second() {
        assert_eq!(SimulatedWork::default().latency(), Duration::from_secs(1));
    }
}
