//! Fuzz target for batch partitioning.
//!
//! Batches must concatenate back to the input, and every batch but the last
//! must be full.

#![no_main]

use ingest_core::scheduler::partition;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, Vec<u64>)| {
    let (size, ids) = input;
    let size = usize::from(size).max(1);
    let batches = partition(&ids, size);

    assert_eq!(batches.concat(), ids);
    if let Some((last, full)) = batches.split_last() {
        assert!(full.iter().all(|b| b.len() == size));
        assert!(!last.is_empty() && last.len() <= size);
    }
});
