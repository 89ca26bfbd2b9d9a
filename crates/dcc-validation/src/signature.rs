//! # Signature Stage
//!
//! Resolves the candidate signer certificates for the envelope's key
//! identifier and tries them in provider order. The first certificate that
//! verifies wins; later candidates are not tried.
//!
//! A verifying certificate whose not-after bound lies before the validation
//! clock still counts as a valid signature, but adds a
//! `certificate expired for validation clock` failure ahead of the summary.

use dcc_core::{
    AccessTokenConditions, DccError, ResultCollector, ResultIdentifier, SignerCertificate,
    ValidationResult,
};
use dcc_crypto::SignatureVerifier;

use crate::decode::DecodedDcc;
use crate::provider::CertificateProvider;

/// Verify the envelope signature against the candidates for its kid.
///
/// # Errors
///
/// Returns [`DccError::InvalidCondition`] if the validation clock is
/// needed for an expiry comparison and does not parse.
pub fn check_signature(
    decoded: &DecodedDcc,
    conditions: &AccessTokenConditions,
    certificates: &dyn CertificateProvider,
    verifier: &dyn SignatureVerifier,
    results: &mut ResultCollector,
) -> Result<(), DccError> {
    let kid = decoded.kid_base64();
    let candidates = certificates.certificates_for_kid(&kid);
    if candidates.is_empty() {
        tracing::debug!(%kid, "no signer certificate for kid");
        results.technical_failure("unknown dcc signing kid");
        return Ok(());
    }

    let signer = first_verifying(&candidates, decoded, verifier);
    if let Some(certificate) = signer {
        if certificate.not_after.is_some() {
            let clock = conditions.validation_clock()?;
            if certificate.is_expired_at(&clock) {
                results.technical_failure("certificate expired for validation clock");
            }
        }
        results.push(ValidationResult::passed(
            ResultIdentifier::TechnicalVerification,
            "signature valid",
        ));
    } else {
        results.technical_failure("signature invalid");
    }
    Ok(())
}

fn first_verifying<'a>(
    candidates: &'a [SignerCertificate],
    decoded: &DecodedDcc,
    verifier: &dyn SignatureVerifier,
) -> Option<&'a SignerCertificate> {
    candidates.iter().enumerate().find_map(|(index, certificate)| {
        match verifier.verify(&decoded.envelope, certificate) {
            Ok(()) => {
                tracing::debug!(index, subject = ?certificate.subject, "signature verified");
                Some(certificate)
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "candidate certificate rejected");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DccCodec;
    use crate::decode::decode;
    use crate::testing::{
        sample_vaccination, CountingVerifier, FixtureCodec, FixtureDccBuilder, FixtureSchema,
        StaticCertificates,
    };
    use chrono::{TimeZone, Utc};
    use dcc_core::CheckType;
    use dcc_crypto::{encode_kid, Ed25519KeyPair, Ed25519SignatureVerifier};

    const KID: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

    fn decoded(signer: &Ed25519KeyPair) -> DecodedDcc {
        let raw = FixtureDccBuilder::new(sample_vaccination())
            .kid(KID.to_vec())
            .sign(signer);
        let codec: &dyn DccCodec = &FixtureCodec::new();
        decode(codec, &FixtureSchema::accepting(), &raw).unwrap()
    }

    fn cert(kp: &Ed25519KeyPair) -> SignerCertificate {
        SignerCertificate {
            kid: encode_kid(&KID),
            public_key: kp.public_key(),
            subject: None,
            not_after: None,
        }
    }

    fn conditions() -> AccessTokenConditions {
        AccessTokenConditions {
            validation_clock: "2021-06-01T10:00:00+00:00".to_string(),
            valid_from: "2021-06-01T10:00:00+00:00".to_string(),
            valid_to: "2021-06-03T10:00:00+00:00".to_string(),
            ..Default::default()
        }
    }

    fn run(
        decoded: &DecodedDcc,
        conditions: &AccessTokenConditions,
        certificates: &StaticCertificates,
        verifier: &dyn SignatureVerifier,
    ) -> Vec<ValidationResult> {
        let mut results = ResultCollector::new();
        check_signature(decoded, conditions, certificates, verifier, &mut results).unwrap();
        results.results().to_vec()
    }

    #[test]
    fn unknown_kid_emits_single_failure() {
        let signer = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let out = run(
            &decoded(&signer),
            &conditions(),
            &StaticCertificates::new(),
            &Ed25519SignatureVerifier::new(),
        );
        assert_eq!(out, vec![ValidationResult::technical_failure("unknown dcc signing kid")]);
    }

    #[test]
    fn kth_candidate_wins_and_later_are_not_tried() {
        let signer = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let others: Vec<_> = (10u8..14).map(|s| Ed25519KeyPair::from_seed(&[s; 32])).collect();
        let mut list = vec![cert(&others[0]), cert(&others[1]), cert(&signer)];
        list.push(cert(&others[2]));
        list.push(cert(&others[3]));
        let certificates = StaticCertificates::new().with(encode_kid(&KID), list);
        let verifier = CountingVerifier::new(Ed25519SignatureVerifier::new());

        let out = run(&decoded(&signer), &conditions(), &certificates, &verifier);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].details, "signature valid");
        assert_eq!(out[0].check_type, CheckType::Passed);
        assert_eq!(verifier.calls(), 3);
    }

    #[test]
    fn no_verifying_candidate_is_invalid() {
        let signer = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let other = Ed25519KeyPair::from_seed(&[2u8; 32]);
        let certificates = StaticCertificates::new().with(encode_kid(&KID), vec![cert(&other)]);
        let out = run(
            &decoded(&signer),
            &conditions(),
            &certificates,
            &Ed25519SignatureVerifier::new(),
        );
        assert_eq!(out, vec![ValidationResult::technical_failure("signature invalid")]);
    }

    #[test]
    fn expired_signer_adds_failure_before_summary() {
        let signer = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let mut expired = cert(&signer);
        expired.not_after = Some(Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap());
        let certificates = StaticCertificates::new().with(encode_kid(&KID), vec![expired]);
        let out = run(
            &decoded(&signer),
            &conditions(),
            &certificates,
            &Ed25519SignatureVerifier::new(),
        );
        let details: Vec<_> = out.iter().map(|r| r.details.as_str()).collect();
        assert_eq!(details, vec!["certificate expired for validation clock", "signature valid"]);
        assert!(!out[0].is_ok());
        assert!(out[1].is_ok());
    }

    #[test]
    fn unparseable_clock_is_fatal_only_when_needed() {
        let signer = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let mut c = conditions();
        c.validation_clock = "now".to_string();

        let certificates = StaticCertificates::new().with(encode_kid(&KID), vec![cert(&signer)]);
        let out = run(&decoded(&signer), &c, &certificates, &Ed25519SignatureVerifier::new());
        assert_eq!(out[0].details, "signature valid");

        let mut bounded = cert(&signer);
        bounded.not_after = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        let certificates = StaticCertificates::new().with(encode_kid(&KID), vec![bounded]);
        let mut results = ResultCollector::new();
        let err = check_signature(
            &decoded(&signer),
            &c,
            &certificates,
            &Ed25519SignatureVerifier::new(),
            &mut results,
        )
        .unwrap_err();
        assert!(matches!(err, DccError::InvalidCondition { field: "validationClock", .. }));
    }
}
