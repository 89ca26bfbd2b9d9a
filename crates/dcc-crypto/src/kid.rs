//! # Key Identifiers
//!
//! Key identifiers travel as raw bytes inside the envelope and as standard
//! base64 (with padding) everywhere else: certificate lookup, rule-engine
//! parameters and logs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CryptoError;

/// Encode a raw key identifier as standard base64.
pub fn encode_kid(kid: &[u8]) -> String {
    STANDARD.encode(kid)
}

/// Decode standard base64 into bytes.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(STANDARD.decode(encoded.trim())?)
}
