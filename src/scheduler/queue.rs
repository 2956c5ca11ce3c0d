//! Pending batch queue.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::time::Instant;

use super::priority::{Priority, PriorityQueue};
use super::store::IngestionId;
use crate::telemetry;

/// Configuration for the pending batch queue.
#[derive(Debug, Clone, Default)]
pub struct BatchQueueConfig {
    /// Maximum pending batches. Zero means unbounded.
    pub max_pending: usize,
}

impl BatchQueueConfig {
    pub fn is_bounded(&self) -> bool {
        self.max_pending > 0
    }
}

/// Reference to one not-yet-started batch.
///
/// Carries copies of the owning request's ordering keys; the batch data
/// itself stays in the request store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub ingestion_id: IngestionId,
    pub batch_index: usize,
    pub priority: Priority,
    /// Monotonic submission instant; the wall-clock time lives on the record.
    pub submitted_at: Instant,
}

/// Whether the consumer is working through the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Idle,
    Draining,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("batch queue is full: {pending} pending + {requested} requested exceeds {max}")]
    QueueFull {
        pending: usize,
        requested: usize,
        max: usize,
    },
}

/// Thread-safe priority queue of pending batches.
pub struct BatchQueue {
    queue: Mutex<PriorityQueue<QueueEntry>>,
    config: BatchQueueConfig,
    /// Notifies the worker when new entries are pushed.
    notify: Notify,
    /// True from a successful pop until a pop finds the queue empty.
    draining: AtomicBool,
    /// Notifies waiters when the consumer goes idle.
    idle: Notify,
}

impl BatchQueue {
    pub fn new(config: BatchQueueConfig) -> Self {
        Self {
            queue: Mutex::new(PriorityQueue::new()),
            config,
            notify: Notify::new(),
            draining: AtomicBool::new(false),
            idle: Notify::new(),
        }
    }

    pub fn config(&self) -> &BatchQueueConfig {
        &self.config
    }

    /// Lock the queue and check there is room for `batches` more entries.
    ///
    /// The returned permit holds the queue lock until dropped, so everything
    /// pushed through it lands atomically. The worker is woken on drop.
    pub async fn reserve(&self, batches: usize) -> Result<EnqueuePermit<'_>, QueueError> {
        let queue = self.queue.lock().await;
        if self.config.is_bounded() && queue.len() + batches > self.config.max_pending {
            return Err(QueueError::QueueFull {
                pending: queue.len(),
                requested: batches,
                max: self.config.max_pending,
            });
        }
        Ok(EnqueuePermit {
            queue,
            notify: &self.notify,
            pushed: 0,
        })
    }

    /// Push a single entry. Returns its queue position at insert time.
    pub async fn push(&self, entry: QueueEntry) -> Result<usize, QueueError> {
        let mut permit = self.reserve(1).await?;
        Ok(permit.push(entry))
    }

    /// Remove the highest priority entry, if any.
    ///
    /// Also drives the drain state: a hit marks the consumer draining, a miss
    /// marks it idle. Both happen under the queue lock.
    pub async fn pop(&self) -> Option<QueueEntry> {
        let mut queue = self.queue.lock().await;
        let entry = queue.pop();
        if entry.is_some() {
            telemetry::record_queue_depth(queue.len());
        }
        let was_draining = self.draining.swap(entry.is_some(), Ordering::AcqRel);
        if entry.is_none() && was_draining {
            self.idle.notify_waiters();
        }
        entry
    }

    /// Wait for a notification then pop. Never returns on an empty queue.
    pub async fn wait_and_pop(&self) -> QueueEntry {
        loop {
            if let Some(entry) = self.pop().await {
                return entry;
            }
            self.notify.notified().await;
        }
    }

    /// Wake the worker (used during shutdown).
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    pub fn drain_state(&self) -> DrainState {
        if self.draining.load(Ordering::Acquire) {
            DrainState::Draining
        } else {
            DrainState::Idle
        }
    }

    /// True when nothing is pending and the consumer is idle.
    pub async fn is_drained(&self) -> bool {
        let queue = self.queue.lock().await;
        queue.is_empty() && !self.draining.load(Ordering::Acquire)
    }

    /// Future resolving the next time the consumer goes idle.
    ///
    /// Call `enable` on it before checking `is_drained` to avoid a lost wakeup.
    pub fn idle_notified(&self) -> Notified<'_> {
        self.idle.notified()
    }

    /// Current number of pending batches.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}

/// Exclusive, capacity-checked access to the queue for one submission.
pub struct EnqueuePermit<'a> {
    queue: MutexGuard<'a, PriorityQueue<QueueEntry>>,
    notify: &'a Notify,
    pushed: usize,
}

impl EnqueuePermit<'_> {
    /// Push an entry. Returns its queue position at insert time.
    pub fn push(&mut self, entry: QueueEntry) -> usize {
        let position = self.queue.len();
        let (priority, submitted_at) = (entry.priority, entry.submitted_at);
        self.queue.push(entry, priority, submitted_at);
        self.pushed += 1;
        position
    }

    /// Pending entries, including ones pushed through this permit.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Drop for EnqueuePermit<'_> {
    fn drop(&mut self) {
        if self.pushed > 0 {
            self.notify.notify_one();
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
