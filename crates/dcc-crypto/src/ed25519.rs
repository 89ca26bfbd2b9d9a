//! # Ed25519 Signing and Verification
//!
//! Reference [`SignatureVerifier`] for EdDSA-signed envelopes (COSE
//! algorithm `-8`), plus a key pair used to produce signed fixtures.
//!
//! ## Security Invariant
//!
//! - Private keys are never serialized or logged. `Ed25519KeyPair` does
//!   not implement `Serialize` and its `Debug` output is redacted.
//! - Verification is over `envelope.signed_data` exactly as produced by the
//!   COSE collaborator; nothing is re-encoded here.

use dcc_core::{CoseEnvelope, SignerCertificate};
use ed25519_dalek::{Signer, Verifier};

use crate::error::CryptoError;
use crate::verifier::SignatureVerifier;

/// COSE algorithm identifier for EdDSA.
pub const COSE_ALG_EDDSA: i64 = -8;

const PUBLIC_KEY_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

/// Verifies EdDSA envelopes against raw 32-byte Ed25519 public keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519SignatureVerifier;

impl Ed25519SignatureVerifier {
    /// Create a verifier.
    pub fn new() -> Self {
        Self
    }
}

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify(
        &self,
        envelope: &CoseEnvelope,
        certificate: &SignerCertificate,
    ) -> Result<(), CryptoError> {
        if let Some(alg) = envelope.algorithm {
            if alg != COSE_ALG_EDDSA {
                return Err(CryptoError::UnsupportedAlgorithm(alg));
            }
        }

        let key_bytes: [u8; PUBLIC_KEY_LEN] =
            certificate.public_key.as_slice().try_into().map_err(|_| {
                CryptoError::InvalidPublicKey(format!(
                    "expected {PUBLIC_KEY_LEN} bytes, got {}",
                    certificate.public_key.len()
                ))
            })?;
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

        let sig_bytes: [u8; SIGNATURE_LEN] =
            envelope.signature.as_slice().try_into().map_err(|_| {
                CryptoError::InvalidSignatureLength {
                    expected: SIGNATURE_LEN,
                    actual: envelope.signature.len(),
                }
            })?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);

        verifying_key
            .verify(&envelope.signed_data, &signature)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

/// An Ed25519 key pair for producing signed envelopes.
///
/// Does not implement `Serialize`, so the private key cannot end up
/// in logs or responses.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519KeyPair {
    /// Create a key pair from a raw 32-byte private key seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The raw 32-byte public key.
    pub fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    /// Sign `data`, returning the 64-byte signature.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing_key.sign(data).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}
