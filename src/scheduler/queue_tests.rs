//! Tests for the pending batch queue and enqueue permits.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::*;

fn entry(priority: Priority, batch_index: usize) -> QueueEntry {
    QueueEntry {
        ingestion_id: IngestionId::new(),
        batch_index,
        priority,
        submitted_at: Instant::now(),
    }
}

fn bounded(max_pending: usize) -> BatchQueue {
    BatchQueue::new(BatchQueueConfig { max_pending })
}

#[tokio::test]
async fn push_reports_position() {
    let q = BatchQueue::new(BatchQueueConfig::default());
    assert_eq!(q.push(entry(Priority::Low, 0)).await, Ok(0));
    assert_eq!(q.push(entry(Priority::Low, 1)).await, Ok(1));
    assert_eq!(q.len().await, 2);
}

#[tokio::test]
async fn high_overtakes_pending_low() {
    let q = BatchQueue::new(BatchQueueConfig::default());
    let low = entry(Priority::Low, 0);
    let high = entry(Priority::High, 0);
    q.push(low.clone()).await.unwrap();
    q.push(high.clone()).await.unwrap();

    assert_eq!(q.pop().await, Some(high));
    assert_eq!(q.pop().await, Some(low));
    assert_eq!(q.pop().await, None);
}

#[tokio::test]
async fn same_request_batches_pop_in_partition_order() {
    let q = BatchQueue::new(BatchQueueConfig::default());
    let id = IngestionId::new();
    let submitted_at = Instant::now();
    {
        let mut permit = q.reserve(3).await.unwrap();
        for batch_index in 0..3 {
            permit.push(QueueEntry {
                ingestion_id: id,
                batch_index,
                priority: Priority::Medium,
                submitted_at,
            });
        }
        assert_eq!(permit.len(), 3);
    }

    for expected in 0..3 {
        assert_eq!(q.pop().await.unwrap().batch_index, expected);
    }
}

#[tokio::test]
async fn bounded_queue_rejects_whole_submission() {
    let q = bounded(3);
    q.push(entry(Priority::Medium, 0)).await.unwrap();
    q.push(entry(Priority::Medium, 1)).await.unwrap();

    let err = q.reserve(2).await.err();
    assert_eq!(
        err,
        Some(QueueError::QueueFull {
            pending: 2,
            requested: 2,
            max: 3,
        })
    );
    // Nothing was admitted by the failed reservation.
    assert_eq!(q.len().await, 2);
    assert!(q.reserve(1).await.is_ok());
}

#[tokio::test]
async fn unbounded_queue_accepts_any_reservation() {
    let q = BatchQueue::new(BatchQueueConfig::default());
    assert!(!q.config().is_bounded());
    let mut permit = q.reserve(10_000).await.unwrap();
    for i in 0..10_000 {
        permit.push(entry(Priority::Low, i));
    }
    drop(permit);
    assert_eq!(q.len().await, 10_000);
}

#[tokio::test]
async fn wait_and_pop_wakes_on_push() {
    let q = Arc::new(BatchQueue::new(BatchQueueConfig::default()));
    let waiter = {
        let q = q.clone();
        tokio::spawn(async move { q.wait_and_pop().await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());

    let pushed = entry(Priority::High, 0);
    q.push(pushed.clone()).await.unwrap();

    let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("worker should wake")
        .unwrap();
    assert_eq!(popped, pushed);
    assert!(q.is_empty().await);
}

#[tokio::test]
async fn drain_state_follows_pops() {
    let q = BatchQueue::new(BatchQueueConfig::default());
    assert_eq!(q.drain_state(), DrainState::Idle);
    assert!(q.is_drained().await);

    q.push(entry(Priority::Medium, 0)).await.unwrap();
    assert!(!q.is_drained().await);

    q.pop().await.unwrap();
    assert_eq!(q.drain_state(), DrainState::Draining);
    assert!(!q.is_drained().await, "popped batch is still in flight");

    assert!(q.pop().await.is_none());
    assert_eq!(q.drain_state(), DrainState::Idle);
    assert!(q.is_drained().await);
}

#[tokio::test]
async fn idle_notification_fires_when_consumer_runs_dry() {
    let q = Arc::new(BatchQueue::new(BatchQueueConfig::default()));
    q.push(entry(Priority::Low, 0)).await.unwrap();
    q.pop().await.unwrap();

    let notified = q.idle_notified();
    tokio::pin!(notified);
    notified.as_mut().enable();

    assert!(q.pop().await.is_none());
    tokio::time::timeout(Duration::from_secs(1), notified)
        .await
        .expect("idle notification");
}
