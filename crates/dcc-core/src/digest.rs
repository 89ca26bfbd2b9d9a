//! # Content Hash
//!
//! Byte-exact hash of the raw credential string, used by the structure-level
//! check to confirm the presented credential is the one the access token was
//! issued for.
//!
//! The hash is the lowercase hexadecimal SHA-256 of the UTF-8 bytes of the
//! credential exactly as received (prefix included, no trimming).

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 of `raw`'s UTF-8 bytes.
pub fn content_hash(raw: &str) -> String {
    Sha256::digest(raw.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Whether `expected` equals the content hash of `raw`.
///
/// Comparison is exact string equality: an upper-case or truncated hash
/// does not match.
pub fn hash_matches(raw: &str, expected: &str) -> bool {
    content_hash(raw) == expected
}
