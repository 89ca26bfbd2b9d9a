//! # Semantic Checks
//!
//! Checks that compare the decoded credential with the caller's conditions:
//! the structure-level content hash, expiry against the condition window,
//! acceptable credential type and holder identity.
//!
//! Every check appends its own `TechnicalVerification / FAILED` entry and
//! returns; none of them stops the pipeline. A [`DccError`] is returned only
//! for malformed conditions (unparseable timestamp, unknown type symbol).

use dcc_core::temporal::resolve_instant;
use dcc_core::{
    hash_matches, AccessTokenConditions, CertificateEntry, DccError, DecodedCredential,
    ResultCollector,
};

/// Compare the content hash of `raw` with the caller-supplied hash.
///
/// An absent or empty hash is reported as not provided.
pub fn check_structure_hash(
    raw: &str,
    conditions: &AccessTokenConditions,
    results: &mut ResultCollector,
) {
    match conditions.hash.as_deref().filter(|h| !h.is_empty()) {
        None => results.technical_failure("dcc hash not provided for check type 0"),
        Some(expected) if !hash_matches(raw, expected) => {
            tracing::debug!("structure hash mismatch");
            results.technical_failure("dcc hash does not match");
        }
        Some(_) => {}
    }
}

/// Check that the credential outlives the condition window.
///
/// Both window bounds must parse even when only `validTo` is compared.
/// Recovery credentials are additionally checked against the window: the
/// certificate's own validity must enclose it. Credential dates that do
/// not resolve skip their comparison.
pub fn check_expiry(
    credential: &DecodedCredential,
    conditions: &AccessTokenConditions,
    results: &mut ResultCollector,
) -> Result<(), DccError> {
    let valid_from = conditions.valid_from()?;
    let valid_to = conditions.valid_to()?;
    if credential.expiration_time <= valid_to {
        results.technical_failure("Dcc exp date before validTo");
    }

    match &credential.certificate.entry {
        CertificateEntry::Vaccination(_) | CertificateEntry::Test(_) => {}
        CertificateEntry::Recovery(recoveries) => {
            let Some(recovery) = recoveries.first() else {
                return Ok(());
            };
            if let Some(from) = resolve_instant(&recovery.certificate_valid_from) {
                if from >= valid_from {
                    results.technical_failure("Recovery validFrom after condition validFrom");
                }
            }
            if let Some(until) = resolve_instant(&recovery.certificate_valid_until) {
                if until <= valid_to {
                    results.technical_failure("Recovery validTo before condition validTo");
                }
            }
        }
    }
    Ok(())
}

/// Check the credential against the acceptable types, if any are given.
///
/// # Errors
///
/// Returns [`DccError::UnknownAcceptableType`] for an unrecognised symbol.
pub fn check_acceptable_type(
    credential: &DecodedCredential,
    conditions: &AccessTokenConditions,
    results: &mut ResultCollector,
) -> Result<(), DccError> {
    let Some(accepted) = conditions.parsed_acceptable_types()? else {
        return Ok(());
    };
    if !accepted.iter().any(|t| t.matches(&credential.certificate)) {
        tracing::debug!(
            certificate_type = %credential.certificate_type(),
            "credential type not acceptable"
        );
        results.technical_failure("required acceptable cert type not provided");
    }
    Ok(())
}

/// Compare the holder's standardised names and date of birth with the
/// expected values.
///
/// Each field is checked on its own with exact equality. A field the
/// credential lacks never matches, and neither does one the conditions
/// leave unset.
pub fn check_identity(
    credential: &DecodedCredential,
    conditions: &AccessTokenConditions,
    results: &mut ResultCollector,
) {
    let certificate = &credential.certificate;
    let checks = [
        (
            conditions.fnt.as_deref(),
            certificate.person.standardised_family_name.as_deref(),
            "family name does not match",
        ),
        (
            conditions.gnt.as_deref(),
            certificate.person.standardised_given_name.as_deref(),
            "given name does not match",
        ),
        (
            conditions.dob.as_deref(),
            certificate.date_of_birth.as_deref(),
            "data of birth does not match",
        ),
    ];
    for (expected, actual, details) in checks {
        if actual.is_none() || actual != expected {
            results.technical_failure(details);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_recovery, sample_test, sample_vaccination};
    use chrono::{DateTime, TimeZone, Utc};
    use dcc_core::{content_hash, GreenCertificate};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn credential(cert: GreenCertificate, exp: DateTime<Utc>) -> DecodedCredential {
        DecodedCredential::new(at(2021, 5, 1), exp, "DE", cert).unwrap()
    }

    fn conditions() -> AccessTokenConditions {
        AccessTokenConditions {
            validation_clock: "2021-06-01T10:00:00+00:00".to_string(),
            valid_from: "2021-06-01T10:00:00+00:00".to_string(),
            valid_to: "2021-06-03T10:00:00+00:00".to_string(),
            ..Default::default()
        }
    }

    fn details(results: ResultCollector) -> Vec<String> {
        results.results().iter().map(|r| r.details.clone()).collect()
    }

    // ---- structure hash ----

    #[test]
    fn hash_absent_or_empty_is_not_provided() {
        let mut c = conditions();
        for hash in [None, Some(String::new())] {
            c.hash = hash;
            let mut results = ResultCollector::new();
            check_structure_hash("HC1:abc", &c, &mut results);
            assert_eq!(details(results), vec!["dcc hash not provided for check type 0"]);
        }
    }

    #[test]
    fn hash_mismatch_and_match() {
        let mut c = conditions();
        c.hash = Some(content_hash("HC1:other"));
        let mut results = ResultCollector::new();
        check_structure_hash("HC1:abc", &c, &mut results);
        assert_eq!(details(results), vec!["dcc hash does not match"]);

        c.hash = Some(content_hash("HC1:abc"));
        let mut results = ResultCollector::new();
        check_structure_hash("HC1:abc", &c, &mut results);
        assert!(results.is_empty());
    }

    // ---- expiry ----

    #[test]
    fn expiry_must_be_strictly_after_valid_to() {
        let valid_to = conditions().valid_to().unwrap();
        let mut results = ResultCollector::new();
        check_expiry(&credential(sample_vaccination(), valid_to), &conditions(), &mut results)
            .unwrap();
        assert_eq!(details(results), vec!["Dcc exp date before validTo"]);

        let mut results = ResultCollector::new();
        let later = valid_to + chrono::Duration::seconds(1);
        check_expiry(&credential(sample_vaccination(), later), &conditions(), &mut results)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn unparseable_valid_to_is_fatal() {
        let mut c = conditions();
        c.valid_to = "soon".to_string();
        let mut results = ResultCollector::new();
        let err = check_expiry(&credential(sample_vaccination(), at(2022, 1, 1)), &c, &mut results)
            .unwrap_err();
        assert!(matches!(err, DccError::InvalidCondition { field: "validTo", .. }));
    }

    #[test]
    fn test_collection_date_is_not_compared_with_window() {
        // sample test was collected 2021-05-30T10:00:00Z
        for valid_from in ["2021-06-01T10:00:00+00:00", "2021-05-29T10:00:00+00:00"] {
            let mut c = conditions();
            c.valid_from = valid_from.to_string();
            let mut results = ResultCollector::new();
            check_expiry(&credential(sample_test(), at(2022, 1, 1)), &c, &mut results).unwrap();
            assert!(results.is_empty(), "validFrom {valid_from}");
        }
    }

    #[test]
    fn unparseable_valid_from_is_fatal_for_every_type() {
        let mut c = conditions();
        c.valid_from = "from now on".to_string();
        for cert in [sample_vaccination(), sample_test(), sample_recovery()] {
            let mut results = ResultCollector::new();
            let err = check_expiry(&credential(cert, at(2022, 1, 1)), &c, &mut results)
                .unwrap_err();
            assert!(matches!(err, DccError::InvalidCondition { field: "validFrom", .. }));
        }
    }

    #[test]
    fn recovery_window_must_enclose_conditions() {
        // sample recovery is valid 2021-01-20 until 2021-07-10
        let mut results = ResultCollector::new();
        check_expiry(&credential(sample_recovery(), at(2022, 1, 1)), &conditions(), &mut results)
            .unwrap();
        assert!(results.is_empty());

        let mut c = conditions();
        c.valid_from = "2021-01-10T00:00:00+00:00".to_string();
        c.valid_to = "2021-08-01T00:00:00+00:00".to_string();
        let mut results = ResultCollector::new();
        check_expiry(&credential(sample_recovery(), at(2022, 1, 1)), &c, &mut results).unwrap();
        assert_eq!(
            details(results),
            vec![
                "Recovery validFrom after condition validFrom",
                "Recovery validTo before condition validTo"
            ]
        );
    }

    #[test]
    fn unresolvable_recovery_dates_skip_comparison() {
        let mut cert = sample_recovery();
        if let CertificateEntry::Recovery(r) = &mut cert.entry {
            r[0].certificate_valid_from = "unknown".to_string();
            r[0].certificate_valid_until = String::new();
        }
        let mut results = ResultCollector::new();
        check_expiry(&credential(cert, at(2022, 1, 1)), &conditions(), &mut results).unwrap();
        assert!(results.is_empty());
    }

    // ---- acceptable type ----

    #[test]
    fn acceptable_type_absent_or_empty_is_no_op() {
        let cred = credential(sample_vaccination(), at(2022, 1, 1));
        let mut c = conditions();
        for types in [None, Some(vec![])] {
            c.acceptable_types = types;
            let mut results = ResultCollector::new();
            check_acceptable_type(&cred, &c, &mut results).unwrap();
            assert!(results.is_empty());
        }
    }

    #[test]
    fn acceptable_type_mismatch_emits_one_failure() {
        let cred = credential(sample_vaccination(), at(2022, 1, 1));
        let mut c = conditions();
        c.acceptable_types = Some(vec!["r".to_string(), "tp".to_string()]);
        let mut results = ResultCollector::new();
        check_acceptable_type(&cred, &c, &mut results).unwrap();
        assert_eq!(details(results), vec!["required acceptable cert type not provided"]);

        c.acceptable_types = Some(vec!["r".to_string(), "v".to_string()]);
        let mut results = ResultCollector::new();
        check_acceptable_type(&cred, &c, &mut results).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn pcr_symbol_accepts_pcr_test() {
        let cred = credential(sample_test(), at(2022, 1, 1));
        let mut c = conditions();
        c.acceptable_types = Some(vec!["tp".to_string()]);
        let mut results = ResultCollector::new();
        check_acceptable_type(&cred, &c, &mut results).unwrap();
        assert!(results.is_empty());

        c.acceptable_types = Some(vec!["tr".to_string()]);
        let mut results = ResultCollector::new();
        check_acceptable_type(&cred, &c, &mut results).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn unknown_symbol_is_fatal() {
        let cred = credential(sample_vaccination(), at(2022, 1, 1));
        let mut c = conditions();
        c.acceptable_types = Some(vec!["x".to_string()]);
        let mut results = ResultCollector::new();
        assert!(matches!(
            check_acceptable_type(&cred, &c, &mut results),
            Err(DccError::UnknownAcceptableType(_))
        ));
        assert!(results.is_empty());
    }

    // ---- identity ----

    #[test]
    fn identity_mismatches_are_reported_independently() {
        let cred = credential(sample_vaccination(), at(2022, 1, 1));
        let mut c = conditions();
        c.fnt = Some("MUSTERFRAU".to_string());
        c.gnt = Some("ERIKA".to_string());
        c.dob = Some("1964-08-13".to_string());
        let mut results = ResultCollector::new();
        check_identity(&cred, &c, &mut results);
        assert_eq!(
            details(results),
            vec!["family name does not match", "data of birth does not match"]
        );
    }

    #[test]
    fn missing_credential_field_never_matches() {
        let mut cert = sample_vaccination();
        cert.person.standardised_given_name = None;
        let cred = credential(cert, at(2022, 1, 1));
        let mut c = conditions();
        c.fnt = Some("MUSTERMANN".to_string());
        c.gnt = Some("ERIKA".to_string());
        c.dob = Some("1964-08-12".to_string());
        let mut results = ResultCollector::new();
        check_identity(&cred, &c, &mut results);
        assert_eq!(details(results), vec!["given name does not match"]);
    }

    #[test]
    fn unset_condition_fields_never_match() {
        let cred = credential(sample_vaccination(), at(2022, 1, 1));
        let mut results = ResultCollector::new();
        check_identity(&cred, &conditions(), &mut results);
        assert_eq!(
            details(results),
            vec![
                "family name does not match",
                "given name does not match",
                "data of birth does not match"
            ]
        );
    }

    #[test]
    fn matching_identity_emits_nothing() {
        let cred = credential(sample_vaccination(), at(2022, 1, 1));
        let mut c = conditions();
        c.fnt = Some("MUSTERMANN".to_string());
        c.gnt = Some("ERIKA".to_string());
        c.dob = Some("1964-08-12".to_string());
        let mut results = ResultCollector::new();
        check_identity(&cred, &c, &mut results);
        assert!(results.is_empty());
    }
}
