//! # Cryptographic Error Types
//!
//! Structured errors for signature verification. A verification error for
//! one candidate certificate is not fatal to a validation call; the
//! signature stage records it and moves to the next candidate.

use thiserror::Error;

/// Errors from cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The signature does not verify under the given key.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// The envelope's algorithm is not supported by this verifier.
    #[error("unsupported COSE algorithm: {0}")]
    UnsupportedAlgorithm(i64),

    /// Signature bytes have the wrong length.
    #[error("invalid signature length: expected {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        /// Length the algorithm requires.
        expected: usize,
        /// Length received.
        actual: usize,
    },

    /// The certificate's public key cannot be used.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}
