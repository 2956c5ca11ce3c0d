//! Graceful shutdown coordination.
//!
//! Stops new submissions, waits for in-flight submissions to land, then
//! waits for the scheduler to drain its queue and go idle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::scheduler::IngestScheduler;

/// Shutdown state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Stopped,
}

/// Result of a shutdown operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownResult {
    Complete,
    /// Deadline hit; `remaining` batches never started.
    Timeout { remaining: usize },
}

/// Coordinates graceful shutdown of the request surface and the scheduler.
pub struct ShutdownCoordinator {
    state: RwLock<ShutdownState>,
    in_flight: Arc<AtomicU32>,
    notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ShutdownState::Running),
            in_flight: Arc::new(AtomicU32::new(0)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.read()
    }

    /// Check if accepting new submissions.
    pub fn is_accepting(&self) -> bool {
        self.state() == ShutdownState::Running
    }

    /// Track an in-flight submission. Returns None if shutting down.
    pub fn track(&self) -> Option<ShutdownGuard> {
        // Hold the read lock so `initiate` cannot slip in between the check
        // and the increment.
        let state = self.state.read();
        if *state != ShutdownState::Running {
            return None;
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(ShutdownGuard {
            counter: self.in_flight.clone(),
            notify: self.notify.clone(),
        })
    }

    pub fn in_flight_count(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop accepting, then wait for the scheduler to finish queued work.
    ///
    /// The caller cancels the worker afterwards; batches still queued at the
    /// deadline stay `yet_to_start`.
    pub async fn initiate(&self, scheduler: &IngestScheduler, timeout: Duration) -> ShutdownResult {
        *self.state.write() = ShutdownState::Draining;
        tracing::info!(timeout_secs = timeout.as_secs(), "shutdown: draining");

        let deadline = Instant::now() + timeout;
        let result = if self.wait_for_submissions(deadline).await {
            Self::wait_for_drain(scheduler, deadline).await
        } else {
            ShutdownResult::Timeout {
                remaining: scheduler.pending().await,
            }
        };

        *self.state.write() = ShutdownState::Stopped;
        match &result {
            ShutdownResult::Complete => tracing::info!("shutdown: complete"),
            ShutdownResult::Timeout { remaining } => {
                tracing::warn!(remaining, "shutdown: timed out with batches pending")
            }
        }
        result
    }

    async fn wait_for_submissions(&self, deadline: Instant) -> bool {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight_count() == 0 {
                return true;
            }
            tokio::select! {
                _ = notified => continue,
                _ = tokio::time::sleep_until(deadline) => {
                    return self.in_flight_count() == 0;
                }
            }
        }
    }

    async fn wait_for_drain(scheduler: &IngestScheduler, deadline: Instant) -> ShutdownResult {
        let queue = scheduler.queue();
        loop {
            let idle = queue.idle_notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if queue.is_drained().await {
                return ShutdownResult::Complete;
            }
            tokio::select! {
                _ = idle => continue,
                _ = tokio::time::sleep_until(deadline) => {
                    if queue.is_drained().await {
                        return ShutdownResult::Complete;
                    }
                    return ShutdownResult::Timeout { remaining: queue.len().await };
                }
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for in-flight submission tracking.
pub struct ShutdownGuard {
    counter: Arc<AtomicU32>,
    notify: Arc<Notify>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}
