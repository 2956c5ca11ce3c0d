//! In-memory record of every ingestion request and its batches.
//!
//! Uses DashMap for concurrent lookup and one parking_lot::RwLock per record,
//! so status reads never wait on writes to unrelated requests. Records live
//! for the lifetime of the process.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::batch::{BatchConfig, WorkItemId};
use super::priority::Priority;

/// Opaque identifier of an ingestion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngestionId(Uuid);

impl IngestionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IngestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IngestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IngestionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Opaque identifier of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a batch, and (derived) of an ingestion request.
///
/// Variants are declared in lifecycle order; a batch only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    YetToStart,
    Triggered,
    Completed,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YetToStart => "yet_to_start",
            Self::Triggered => "triggered",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous group of work items from one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    pub ids: Vec<WorkItemId>,
    pub status: ProcessingStatus,
}

/// One client submission and its batches, in partition order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingestion {
    pub ingestion_id: IngestionId,
    pub status: ProcessingStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub batches: Vec<Batch>,
}

impl Ingestion {
    /// Build a fresh record with every batch `yet_to_start`.
    pub fn new(ids: &[WorkItemId], priority: Priority, config: &BatchConfig) -> Self {
        let batches = config
            .partition(ids)
            .into_iter()
            .map(|ids| Batch {
                batch_id: BatchId::new(),
                ids,
                status: ProcessingStatus::YetToStart,
            })
            .collect();
        Self {
            ingestion_id: IngestionId::new(),
            status: ProcessingStatus::YetToStart,
            priority,
            created_at: Utc::now(),
            batches,
        }
    }
}

/// Derive a request's status from its batches.
///
/// All completed → completed; any triggered → triggered; otherwise
/// yet_to_start. A mix of completed and yet_to_start with nothing triggered
/// also lands on yet_to_start, which is what a multi-batch request reads as
/// during the rate-limit pause between its batches.
pub fn derive_status(batches: &[Batch]) -> ProcessingStatus {
    if batches.iter().all(|b| b.status == ProcessingStatus::Completed) {
        ProcessingStatus::Completed
    } else if batches.iter().any(|b| b.status == ProcessingStatus::Triggered) {
        ProcessingStatus::Triggered
    } else {
        ProcessingStatus::YetToStart
    }
}

/// Concurrent store of ingestion records keyed by ingestion id.
pub struct RequestStore {
    records: DashMap<IngestionId, RwLock<Ingestion>>,
    config: BatchConfig,
}

impl RequestStore {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            records: DashMap::new(),
            config,
        }
    }

    pub fn batch_config(&self) -> &BatchConfig {
        &self.config
    }

    /// Partition `ids` and store a new request. Returns the stored record.
    ///
    /// The record is complete before it becomes visible, so a `get` issued
    /// after this returns always sees the full batch list.
    pub fn create(&self, ids: &[WorkItemId], priority: Priority) -> Ingestion {
        let ingestion = Ingestion::new(ids, priority, &self.config);
        self.records
            .insert(ingestion.ingestion_id, RwLock::new(ingestion.clone()));
        ingestion
    }

    /// Snapshot of a request, or `None` if the id was never issued.
    pub fn get(&self, id: &IngestionId) -> Option<Ingestion> {
        let entry = self.records.get(id)?;
        let snapshot = entry.read().clone();
        Some(snapshot)
    }

    /// Work items of one batch, or `None` if the id or index is unknown.
    pub fn batch_ids(&self, id: &IngestionId, batch_index: usize) -> Option<Vec<WorkItemId>> {
        let entry = self.records.get(id)?;
        let record = entry.read();
        record.batches.get(batch_index).map(|b| b.ids.clone())
    }

    /// Advance one batch's status and re-derive the request status.
    ///
    /// Returns the request's new status, or `None` if the id or index is
    /// unknown. A transition that would move a batch backwards is ignored.
    pub fn set_batch_status(
        &self,
        id: &IngestionId,
        batch_index: usize,
        status: ProcessingStatus,
    ) -> Option<ProcessingStatus> {
        let entry = self.records.get(id)?;
        let mut record = entry.write();
        let batch = record.batches.get_mut(batch_index)?;
        if status < batch.status {
            tracing::warn!(
                ingestion_id = %id,
                batch_index,
                from = %batch.status,
                to = %status,
                "ignoring batch status regression"
            );
        } else {
            batch.status = status;
        }
        record.status = derive_status(&record.batches);
        Some(record.status)
    }

    /// Re-derive and store a request's status from its batches.
    pub fn recompute_status(&self, id: &IngestionId) -> Option<ProcessingStatus> {
        let entry = self.records.get(id)?;
        let mut record = entry.write();
        record.status = derive_status(&record.batches);
        Some(record.status)
    }

    /// Number of requests ever created.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}
