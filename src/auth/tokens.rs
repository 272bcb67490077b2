//! Opaque single-use tokens for email verification and password reset.

use rand::{rngs::OsRng, RngCore};
use time::OffsetDateTime;

pub const TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

/// 32 random bytes from the OS, hex encoded.
pub fn generate_token() -> String {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn reset_expiry(now_ms: i64) -> i64 {
    now_ms + RESET_TOKEN_TTL_MS
}
