//! # Signed Envelope and Signer Certificates
//!
//! The decoded COSE_Sign1 envelope as seen by the validation core, and the
//! candidate certificates a key identifier resolves to.
//!
//! The wire layout of COSE is not modelled here. The COSE collaborator hands
//! over the already-built signed structure bytes so that signature
//! verification is a pure function of envelope and certificate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decoded COSE_Sign1 envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoseEnvelope {
    /// Key identifier from the protected or unprotected header.
    pub kid: Option<Vec<u8>>,
    /// COSE algorithm identifier, if present.
    pub algorithm: Option<i64>,
    /// CBOR-encoded CWT payload.
    pub payload: Vec<u8>,
    /// The `Sig_structure` bytes the signature was computed over.
    pub signed_data: Vec<u8>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

impl CoseEnvelope {
    /// The key identifier, if present and non-empty.
    pub fn key_id(&self) -> Option<&[u8]> {
        self.kid.as_deref().filter(|kid| !kid.is_empty())
    }
}

/// A certificate that may have produced a DCC signature.
///
/// `not_after` is absent for bare public keys; for those, the
/// validation-clock expiry check does not apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerCertificate {
    /// Base64 key identifier this certificate is published under.
    pub kid: String,
    /// Raw public key bytes.
    pub public_key: Vec<u8>,
    /// Certificate subject, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// End of the certificate validity period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
}

impl SignerCertificate {
    /// Whether the certificate has expired at `clock`.
    ///
    /// Certificates without a `not_after` bound never expire.
    pub fn is_expired_at(&self, clock: &DateTime<Utc>) -> bool {
        self.not_after.is_some_and(|not_after| *clock > not_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cert(not_after: Option<DateTime<Utc>>) -> SignerCertificate {
        SignerCertificate {
            kid: "AAECAwQFBgc=".to_string(),
            public_key: vec![0u8; 32],
            subject: None,
            not_after,
        }
    }

    #[test]
    fn empty_kid_is_absent() {
        let mut env = CoseEnvelope {
            kid: Some(vec![]),
            algorithm: Some(-8),
            payload: vec![],
            signed_data: vec![],
            signature: vec![],
        };
        assert!(env.key_id().is_none());
        env.kid = Some(vec![1, 2]);
        assert_eq!(env.key_id(), Some(&[1u8, 2][..]));
        env.kid = None;
        assert!(env.key_id().is_none());
    }

    #[test]
    fn expiry_is_strictly_after_not_after() {
        let not_after = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let c = cert(Some(not_after));
        assert!(!c.is_expired_at(&not_after));
        assert!(c.is_expired_at(&(not_after + chrono::Duration::seconds(1))));
        assert!(!c.is_expired_at(&(not_after - chrono::Duration::days(30))));
    }

    #[test]
    fn certificate_without_bound_never_expires() {
        let c = cert(None);
        assert!(!c.is_expired_at(&Utc.with_ymd_and_hms(2999, 1, 1, 0, 0, 0).unwrap()));
    }
}
