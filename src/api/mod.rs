//! Submit/status request surface.
//!
//! Newline-delimited JSON messages carrying the same routes and status codes
//! as an HTTP front end would: `ingest` answers 201 with an ingestion id,
//! `status` answers 200 with the request's batches or 404.

mod handler;
mod protocol;

pub use handler::ApiHandler;
pub use protocol::{
    decode_request, encode_response, ApiError, ApiRequest, ApiResponse, BatchView, ErrorBody,
    IngestRequest, IngestResponse, StatusResponse, ValidatedIngest, MAX_MESSAGE_SIZE,
    MAX_WORK_ITEM_ID,
};
