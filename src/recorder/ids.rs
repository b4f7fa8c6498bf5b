//! X-Ray identifier generation.
//!
//! Trace ids are `1-<epoch seconds, 8 hex>-<96 random bits, 24 hex>`,
//! segment ids are 64 random bits as 16 hex digits.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

const TRACE_ID_VERSION: u8 = 1;
const RANDOM_BITS_MASK: u128 = (1 << 96) - 1;

/// Mint a new trace id.
pub fn new_trace_id() -> String {
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32;
    let random = rand::thread_rng().gen::<u128>() & RANDOM_BITS_MASK;
    format!("{}-{:08x}-{:024x}", TRACE_ID_VERSION, epoch, random)
}

/// Mint a new segment id.
pub fn new_segment_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}
