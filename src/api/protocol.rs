//! Wire format and validation for submit/status messages.
//!
//! One JSON object per message, tagged by `type`. Validation of work item ids
//! and priority labels happens here; the scheduler assumes clean input.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::scheduler::{
    BatchId, Ingestion, IngestionId, Priority, ProcessingStatus, QueueError, WorkItemId,
};

/// Largest accepted work item id.
pub const MAX_WORK_ITEM_ID: WorkItemId = 1_000_000_007;

/// Maximum accepted message size.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024; // 1 MiB

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid or missing ids array")]
    InvalidIds,

    #[error("ids array must not be empty")]
    EmptyIds,

    #[error("All IDs must be integers between 1 and {}", MAX_WORK_ITEM_ID)]
    IdOutOfRange,

    #[error("Invalid priority level")]
    InvalidPriority,

    #[error("Ingestion request not found")]
    NotFound,

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("{0}")]
    Queue(#[from] QueueError),

    #[error("Invalid message format: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl ApiError {
    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidIds
            | Self::EmptyIds
            | Self::IdOutOfRange
            | Self::InvalidPriority
            | Self::InvalidFormat(_) => 400,
            Self::NotFound => 404,
            Self::MessageTooLarge { .. } => 413,
            Self::ShuttingDown | Self::Queue(_) => 503,
        }
    }
}

/// Submission as received. Fields stay loosely typed so that each kind of
/// malformed input maps to its own error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub ids: Option<Value>,
    /// `None` only when the field is absent; an explicit `null` is kept as
    /// `Some(Value::Null)` and rejected.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Integral JSON number within `1..=MAX_WORK_ITEM_ID`. Floats with no
/// fractional part (`1.0`, `1e3`) count as integers.
fn work_item_id(value: &Value) -> Option<WorkItemId> {
    let id = match value.as_u64() {
        Some(id) => id,
        None => {
            let n = value.as_f64()?;
            if n.fract() != 0.0 || n < 1.0 || n > MAX_WORK_ITEM_ID as f64 {
                return None;
            }
            n as WorkItemId
        }
    };
    (1..=MAX_WORK_ITEM_ID).contains(&id).then_some(id)
}

/// Submission after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIngest {
    pub ids: Vec<WorkItemId>,
    pub priority: Priority,
}

impl IngestRequest {
    pub fn new(ids: &[WorkItemId], priority: Option<Priority>) -> Self {
        Self {
            ids: Some(Value::from(ids.to_vec())),
            priority: priority.map(|p| Value::from(p.as_str())),
        }
    }

    /// Check shape, priority label, and id range. A missing priority means
    /// MEDIUM; anything other than the exact labels HIGH, MEDIUM, LOW is
    /// rejected, `null` included.
    pub fn validate(&self) -> Result<ValidatedIngest, ApiError> {
        let Some(Value::Array(raw)) = &self.ids else {
            return Err(ApiError::InvalidIds);
        };

        let priority = match &self.priority {
            None => Priority::default(),
            Some(Value::String(label)) => label.parse().map_err(|_| ApiError::InvalidPriority)?,
            Some(_) => return Err(ApiError::InvalidPriority),
        };

        let ids = raw
            .iter()
            .map(|v| work_item_id(v).ok_or(ApiError::IdOutOfRange))
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            return Err(ApiError::EmptyIds);
        }
        Ok(ValidatedIngest { ids, priority })
    }
}

/// Reply to an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingestion_id: IngestionId,
}

/// One batch in a status reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchView {
    pub batch_id: BatchId,
    pub ids: Vec<WorkItemId>,
    pub status: ProcessingStatus,
}

/// Reply to a status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ingestion_id: IngestionId,
    pub status: ProcessingStatus,
    pub batches: Vec<BatchView>,
}

impl From<Ingestion> for StatusResponse {
    fn from(ingestion: Ingestion) -> Self {
        Self {
            ingestion_id: ingestion.ingestion_id,
            status: ingestion.status,
            batches: ingestion
                .batches
                .into_iter()
                .map(|b| BatchView {
                    batch_id: b.batch_id,
                    ids: b.ids,
                    status: b.status,
                })
                .collect(),
        }
    }
}

/// Error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// All inbound message types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApiRequest {
    #[serde(rename = "ingest")]
    Ingest(IngestRequest),

    #[serde(rename = "status")]
    Status { ingestion_id: String },
}

/// Outbound envelope: a status code and a JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(code: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { code, body },
            Err(e) => Self::internal(&e.to_string()),
        }
    }

    pub fn error(err: &ApiError) -> Self {
        Self::ok(
            err.status_code(),
            &ErrorBody {
                error: err.to_string(),
            },
        )
    }

    fn internal(message: &str) -> Self {
        tracing::error!(error = message, "failed to encode response body");
        Self {
            code: 500,
            body: serde_json::json!({ "error": "Internal server error" }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Decode a message with size limit enforcement.
///
/// Size check happens before parsing.
pub fn decode_request(bytes: &[u8]) -> Result<ApiRequest, ApiError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ApiError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Encode a response as a single JSON line (no trailing newline).
pub fn encode_response(response: &ApiResponse) -> Result<Vec<u8>, ApiError> {
    Ok(serde_json::to_vec(response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> IngestRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_priority_defaults_to_medium() {
        let valid = request(json!({ "ids": [1, 2, 3] })).validate().unwrap();
        assert_eq!(valid.priority, Priority::Medium);
        assert_eq!(valid.ids, vec![1, 2, 3]);
    }

    #[test]
    fn ids_must_be_an_array() {
        for body in [json!({}), json!({ "ids": "1,2" }), json!({ "ids": null })] {
            assert!(matches!(request(body).validate(), Err(ApiError::InvalidIds)));
        }
    }

    #[test]
    fn ids_outside_range_are_rejected() {
        let cases = [
            json!({ "ids": [0, 1] }),
            json!({ "ids": [1, 1_000_000_008u64] }),
            json!({ "ids": [-5] }),
            json!({ "ids": [1.5] }),
            json!({ "ids": [0.0] }),
            json!({ "ids": [1_000_000_008.0] }),
            json!({ "ids": ["7"] }),
        ];
        for body in cases {
            let err = request(body).validate().unwrap_err();
            assert!(matches!(err, ApiError::IdOutOfRange));
            assert_eq!(
                err.to_string(),
                "All IDs must be integers between 1 and 1000000007"
            );
        }
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let valid = request(json!({ "ids": [1, MAX_WORK_ITEM_ID] }))
            .validate()
            .unwrap();
        assert_eq!(valid.ids, vec![1, MAX_WORK_ITEM_ID]);
    }

    #[test]
    fn unknown_priority_is_rejected() {
        let err = request(json!({ "ids": [1], "priority": "INVALID" }))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidPriority));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn null_or_non_string_priority_is_rejected() {
        for priority in [json!(null), json!(3), json!(true), json!(["HIGH"])] {
            let err = request(json!({ "ids": [1], "priority": priority }))
                .validate()
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidPriority), "{priority}");
        }
    }

    #[test]
    fn non_string_priority_survives_message_decoding() {
        let msg = decode_request(br#"{"type":"ingest","ids":[1],"priority":3}"#).unwrap();
        let ApiRequest::Ingest(req) = msg else {
            panic!("expected ingest");
        };
        assert!(matches!(req.validate(), Err(ApiError::InvalidPriority)));
    }

    #[test]
    fn integral_floats_are_valid_ids() {
        let valid = request(json!({ "ids": [1.0, 2, 1e3] })).validate().unwrap();
        assert_eq!(valid.ids, vec![1, 2, 1000]);

        let msg = decode_request(br#"{"type":"ingest","ids":[1.0,2]}"#).unwrap();
        let ApiRequest::Ingest(req) = msg else {
            panic!("expected ingest");
        };
        assert_eq!(req.validate().unwrap().ids, vec![1, 2]);
    }

    #[test]
    fn empty_ids_are_rejected() {
        let err = request(json!({ "ids": [] })).validate().unwrap_err();
        assert!(matches!(err, ApiError::EmptyIds));
    }

    #[test]
    fn decode_tagged_messages() {
        let msg = decode_request(br#"{"type":"ingest","ids":[4,5],"priority":"HIGH"}"#).unwrap();
        let ApiRequest::Ingest(req) = msg else {
            panic!("expected ingest");
        };
        assert_eq!(req.validate().unwrap().priority, Priority::High);

        let msg = decode_request(br#"{"type":"status","ingestion_id":"abc"}"#).unwrap();
        assert!(matches!(msg, ApiRequest::Status { ingestion_id } if ingestion_id == "abc"));
    }

    #[test]
    fn decode_rejects_unknown_and_oversized() {
        assert!(matches!(
            decode_request(br#"{"type":"cancel"}"#),
            Err(ApiError::InvalidFormat(_))
        ));

        let big = vec![b' '; MAX_MESSAGE_SIZE + 1];
        let err = decode_request(&big).unwrap_err();
        assert_eq!(err.status_code(), 413);
    }

    #[test]
    fn queue_errors_map_to_unavailable() {
        let err = ApiError::from(QueueError::QueueFull {
            pending: 1,
            requested: 1,
            max: 1,
        });
        assert_eq!(err.status_code(), 503);
        assert_eq!(ApiError::NotFound.status_code(), 404);
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::error(&ApiError::NotFound);
        assert_eq!(response.code, 404);
        assert_eq!(response.body, json!({ "error": "Ingestion request not found" }));
        assert!(!response.is_success());
    }
}
