//! Fuzz target for request decoding and submission validation.
//!
//! Arbitrary bytes must decode to Ok or Err without panicking, and a decoded
//! submission must validate to either clean ids in range or an error.

#![no_main]

use ingest_core::api::{decode_request, ApiRequest, MAX_WORK_ITEM_ID};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(ApiRequest::Ingest(request)) = decode_request(data) {
        if let Ok(valid) = request.validate() {
            assert!(!valid.ids.is_empty());
            assert!(valid.ids.iter().all(|id| (1..=MAX_WORK_ITEM_ID).contains(id)));
        }
    }
});
