//! Guest token string generation.

use std::fmt::Write;

use rand::RngCore;
use rand::rngs::OsRng;

/// Random bytes per token string (128 bits).
const TOKEN_BYTES: usize = 16;

/// Generate a fresh token string: 16 CSPRNG bytes as 32 uppercase hex digits.
///
/// Uniqueness against stored and retired strings is the caller's job.
pub fn generate_token_string() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(TOKEN_BYTES * 2), |mut out, b| {
        let _ = write!(out, "{b:02X}");
        out
    })
}
