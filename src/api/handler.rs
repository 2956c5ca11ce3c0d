//! Request/response handling for submit and status messages.

use std::sync::Arc;

use super::protocol::{
    decode_request, encode_response, ApiError, ApiRequest, ApiResponse, IngestRequest,
    IngestResponse, StatusResponse,
};
use crate::scheduler::{IngestScheduler, IngestionId};
use crate::shutdown::ShutdownCoordinator;

/// Routes decoded messages to the scheduler.
pub struct ApiHandler {
    scheduler: Arc<IngestScheduler>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl ApiHandler {
    pub fn new(scheduler: Arc<IngestScheduler>, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self {
            scheduler,
            shutdown,
        }
    }

    /// Process one raw message and return the encoded response.
    pub async fn process(&self, bytes: &[u8]) -> Vec<u8> {
        let response = match decode_request(bytes) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::debug!(error = %e, "rejecting undecodable message");
                ApiResponse::error(&e)
            }
        };
        match encode_response(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                br#"{"code":500,"body":{"error":"Internal server error"}}"#.to_vec()
            }
        }
    }

    /// Handle one decoded message.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let result = match request {
            ApiRequest::Ingest(req) => self.handle_ingest(req).await,
            ApiRequest::Status { ingestion_id } => self.handle_status(&ingestion_id),
        };
        result.unwrap_or_else(|e| ApiResponse::error(&e))
    }

    async fn handle_ingest(&self, request: IngestRequest) -> Result<ApiResponse, ApiError> {
        let valid = request.validate()?;
        let _guard = self.shutdown.track().ok_or(ApiError::ShuttingDown)?;

        let ingestion_id = self.scheduler.submit(&valid.ids, valid.priority).await?;
        Ok(ApiResponse::ok(201, &IngestResponse { ingestion_id }))
    }

    fn handle_status(&self, raw_id: &str) -> Result<ApiResponse, ApiError> {
        let id: IngestionId = raw_id.parse().map_err(|_| ApiError::NotFound)?;
        let ingestion = self.scheduler.status(&id).ok_or(ApiError::NotFound)?;
        Ok(ApiResponse::ok(200, &StatusResponse::from(ingestion)))
    }

    pub fn scheduler(&self) -> &Arc<IngestScheduler> {
        &self.scheduler
    }

    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}
