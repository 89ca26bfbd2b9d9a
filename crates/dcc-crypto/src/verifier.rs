//! # Signature Verifier Seam

use dcc_core::{CoseEnvelope, SignerCertificate};

use crate::error::CryptoError;

/// Verifies a COSE envelope's signature against one candidate certificate.
///
/// Implementations must be pure: the same envelope and certificate always
/// produce the same answer. `Ok(())` means the signature verifies; any error
/// means this certificate did not produce it.
pub trait SignatureVerifier: Send + Sync {
    /// Verify `envelope.signature` over `envelope.signed_data`.
    fn verify(
        &self,
        envelope: &CoseEnvelope,
        certificate: &SignerCertificate,
    ) -> Result<(), CryptoError>;
}
