//! Deterministic keys that bind a usage event to (user, pipeline, input, time bucket).
//!
//! Retries of the same request inside one bucket collapse to one key; the same
//! payload a bucket later is a new billable event.

use sha2::{Digest, Sha256};

use crate::operation::PipelineType;

/// Default bucket width for idempotency keys.
pub const IDEMPOTENCY_WINDOW_MS: i64 = 60_000;

const KEY_LEN: usize = 32;
const INPUT_HASH_LEN: usize = 16;

/// Hash the logical identity of a request: who, which pipeline, which operations, how big.
pub fn hash_input(
    user_id: &str,
    pipeline_type: PipelineType,
    operations: &[String],
    input_size: usize,
) -> String {
    let content = format!(
        "{user_id}:{pipeline_type}:{}:{input_size}",
        operations.join(",")
    );
    truncated_sha256(content.as_bytes(), INPUT_HASH_LEN)
}

/// Bucket index for a wall-clock timestamp.
pub fn time_window(timestamp_ms: i64, window_ms: i64) -> i64 {
    timestamp_ms.div_euclid(window_ms.max(1))
}

/// Derive the idempotency key using the default one-minute bucket.
pub fn derive_key(
    user_id: &str,
    pipeline_type: PipelineType,
    input_hash: &str,
    timestamp_ms: i64,
) -> String {
    derive_key_in_window(user_id, pipeline_type, input_hash, timestamp_ms, IDEMPOTENCY_WINDOW_MS)
}

pub fn derive_key_in_window(
    user_id: &str,
    pipeline_type: PipelineType,
    input_hash: &str,
    timestamp_ms: i64,
    window_ms: i64,
) -> String {
    let window = time_window(timestamp_ms, window_ms);
    let data = format!("{user_id}:{pipeline_type}:{input_hash}:{window}");
    truncated_sha256(data.as_bytes(), KEY_LEN)
}

fn truncated_sha256(data: &[u8], len: usize) -> String {
    let mut hex = format!("{:x}", Sha256::digest(data));
    hex.truncate(len);
    hex
}
