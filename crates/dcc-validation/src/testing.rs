//! # Fixture Collaborators
//!
//! Deterministic stand-ins for the external collaborators, for unit and
//! integration tests. Available under `cfg(test)` and with the `test-utils`
//! feature.
//!
//! The fixture codec uses a readable wire form instead of Base45, zlib,
//! COSE and CBOR: `HC1:` followed by standard base64 of a JSON envelope
//! whose payload is the JSON claim set. Signatures are real Ed25519
//! signatures over `"Signature1"` followed by the payload bytes, so the
//! signature stage runs against real cryptography.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use dcc_core::{
    CertificateEntry, CertificateType, CoseEnvelope, DecodedCredential, GreenCertificate, Person,
    RecoveryStatement, SignerCertificate, TestStatement, VaccinationStatement,
};
use dcc_crypto::{
    CryptoError, Ed25519KeyPair, Ed25519SignatureVerifier, SignatureVerifier, COSE_ALG_EDDSA,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, DccCodec, SchemaValidator, StrippedCredential};
use crate::decode::DecodeStep;
use crate::provider::{CertificateProvider, RulesProvider, ValueSetProvider};
use crate::rules::{
    ExternalParameter, Rule, RuleDescription, RuleEngine, RuleOutcome, RuleType, RuleVerdict,
};
use crate::validator::Collaborators;

/// Context prefix the fixture codec recognises.
pub const FIXTURE_PREFIX: &str = "HC1:";

/// Key identifier used by [`FixtureDccBuilder`] unless overridden.
pub const FIXTURE_KID: [u8; 8] = [0x25, 0x3c, 0xd1, 0x7a, 0xd2, 0x7a, 0x7f, 0x1b];

const SIG_CONTEXT: &[u8] = b"Signature1";

#[derive(Serialize, Deserialize)]
struct FixtureEnvelope {
    kid: Option<String>,
    alg: Option<i64>,
    payload: String,
    signature: String,
}

#[derive(Serialize, Deserialize)]
struct FixtureClaims {
    iss: String,
    iat: i64,
    exp: i64,
    hcert: GreenCertificate,
}

fn signed_data(payload: &[u8]) -> Vec<u8> {
    [SIG_CONTEXT, payload].concat()
}

// ---------------------------------------------------------------------------
// Codec and schema
// ---------------------------------------------------------------------------

/// Codec for the fixture wire form, optionally failing at one step.
#[derive(Debug, Clone, Default)]
pub struct FixtureCodec {
    fail_at: Option<DecodeStep>,
}

impl FixtureCodec {
    /// A codec that decodes every well-formed fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec that rejects its input at `step`.
    ///
    /// `KeyId` and `Schema` are not codec steps; injecting them has no
    /// effect here (use an empty kid or [`FixtureSchema::rejecting()`]).
    pub fn failing_at(step: DecodeStep) -> Self {
        Self {
            fail_at: Some(step),
        }
    }

    fn check(&self, step: DecodeStep) -> Result<(), CodecError> {
        if self.fail_at == Some(step) {
            return Err(CodecError::new(format!("injected failure at {step}")));
        }
        Ok(())
    }
}

impl DccCodec for FixtureCodec {
    fn strip_prefix<'a>(&self, raw: &'a str) -> Option<StrippedCredential<'a>> {
        if self.fail_at == Some(DecodeStep::Prefix) {
            return None;
        }
        raw.strip_prefix(FIXTURE_PREFIX)
            .map(|body| StrippedCredential {
                context_prefix: FIXTURE_PREFIX.to_string(),
                body,
            })
    }

    fn base45_decode(&self, body: &str) -> Result<Vec<u8>, CodecError> {
        self.check(DecodeStep::Base45)?;
        STANDARD
            .decode(body)
            .map_err(|e| CodecError::new(e.to_string()))
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.check(DecodeStep::Decompress)?;
        Ok(compressed.to_vec())
    }

    fn decode_cose(&self, cose: &[u8]) -> Result<CoseEnvelope, CodecError> {
        self.check(DecodeStep::Cose)?;
        let envelope: FixtureEnvelope =
            serde_json::from_slice(cose).map_err(|e| CodecError::new(e.to_string()))?;
        let kid = envelope
            .kid
            .map(|k| STANDARD.decode(k))
            .transpose()
            .map_err(|e| CodecError::new(e.to_string()))?;
        let signature = STANDARD
            .decode(&envelope.signature)
            .map_err(|e| CodecError::new(e.to_string()))?;
        let payload = envelope.payload.into_bytes();
        Ok(CoseEnvelope {
            kid,
            algorithm: envelope.alg,
            signed_data: signed_data(&payload),
            payload,
            signature,
        })
    }

    fn decode_cbor(&self, payload: &[u8]) -> Result<DecodedCredential, CodecError> {
        self.check(DecodeStep::Cbor)?;
        let claims: FixtureClaims =
            serde_json::from_slice(payload).map_err(|e| CodecError::new(e.to_string()))?;
        let instant = |secs: i64| {
            DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| CodecError::new(format!("timestamp out of range: {secs}")))
        };
        DecodedCredential::new(
            instant(claims.iat)?,
            instant(claims.exp)?,
            claims.iss,
            claims.hcert,
        )
        .map_err(|e| CodecError::new(e.to_string()))
    }
}

/// Schema check for fixture payloads: a JSON object with an `hcert` object
/// carrying `ver`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSchema {
    reject_all: bool,
}

impl FixtureSchema {
    /// Accept every payload that has the expected shape.
    pub fn accepting() -> Self {
        Self { reject_all: false }
    }

    /// Reject every payload.
    pub fn rejecting() -> Self {
        Self { reject_all: true }
    }

    /// [`rejecting()`](Self::rejecting) if `reject`, otherwise
    /// [`accepting()`](Self::accepting).
    pub fn failing_if(reject: bool) -> Self {
        Self { reject_all: reject }
    }
}

impl SchemaValidator for FixtureSchema {
    fn is_valid(&self, payload: &[u8]) -> bool {
        if self.reject_all {
            return false;
        }
        serde_json::from_slice::<serde_json::Value>(payload)
            .ok()
            .and_then(|v| v.get("hcert").and_then(|h| h.get("ver")).cloned())
            .is_some()
    }
}

// ---------------------------------------------------------------------------
// Credential builder
// ---------------------------------------------------------------------------

/// Builds signed credentials in the fixture wire form.
#[derive(Debug, Clone)]
pub struct FixtureDccBuilder {
    certificate: GreenCertificate,
    kid: Vec<u8>,
    algorithm: Option<i64>,
    issuer: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl FixtureDccBuilder {
    /// Start from a health certificate. Defaults: kid [`FIXTURE_KID`],
    /// EdDSA, issuer `DE`, issued 2021-05-01, expiring 2022-05-01.
    pub fn new(certificate: GreenCertificate) -> Self {
        Self {
            certificate,
            kid: FIXTURE_KID.to_vec(),
            algorithm: Some(COSE_ALG_EDDSA),
            issuer: "DE".to_string(),
            issued_at: utc(2021, 5, 1),
            expires_at: utc(2022, 5, 1),
        }
    }

    /// Override the key identifier. An empty kid is encoded as present but
    /// empty.
    pub fn kid(mut self, kid: Vec<u8>) -> Self {
        self.kid = kid;
        self
    }

    /// Override the COSE algorithm.
    pub fn algorithm(mut self, algorithm: Option<i64>) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Override the issuing country.
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Override the issuance instant.
    pub fn issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Override the expiration instant.
    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Sign with `key` and encode.
    pub fn sign(self, key: &Ed25519KeyPair) -> String {
        let claims = FixtureClaims {
            iss: self.issuer,
            iat: self.issued_at.timestamp(),
            exp: self.expires_at.timestamp(),
            hcert: self.certificate,
        };
        let payload = serde_json::to_string(&claims).unwrap_or_default();
        let envelope = FixtureEnvelope {
            kid: Some(STANDARD.encode(&self.kid)),
            alg: self.algorithm,
            signature: STANDARD.encode(key.sign(&signed_data(payload.as_bytes()))),
            payload,
        };
        let json = serde_json::to_vec(&envelope).unwrap_or_default();
        format!("{FIXTURE_PREFIX}{}", STANDARD.encode(json))
    }
}

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Sample payloads
// ---------------------------------------------------------------------------

fn sample_person() -> Person {
    Person {
        family_name: Some("Mustermann".to_string()),
        standardised_family_name: Some("MUSTERMANN".to_string()),
        given_name: Some("Erika".to_string()),
        standardised_given_name: Some("ERIKA".to_string()),
    }
}

/// A completed two-dose vaccination for `MUSTERMANN / ERIKA`, born
/// 1964-08-12.
pub fn sample_vaccination() -> GreenCertificate {
    GreenCertificate {
        schema_version: "1.3.0".to_string(),
        person: sample_person(),
        date_of_birth: Some("1964-08-12".to_string()),
        entry: CertificateEntry::Vaccination(vec![VaccinationStatement {
            target: "840539006".to_string(),
            vaccine: "1119349007".to_string(),
            medicinal_product: "EU/1/20/1528".to_string(),
            manufacturer: "ORG-100030215".to_string(),
            dose_number: 2,
            total_doses: 2,
            date_of_vaccination: "2021-05-29".to_string(),
            country: "DE".to_string(),
            issuer: "Robert Koch-Institut".to_string(),
            certificate_identifier: "URN:UVCI:01DE/IZ12345A/5CWLU12RNOB9RXSEOP6FG8#W".to_string(),
        }]),
    }
}

/// A negative PCR test collected 2021-05-30T10:00:00Z.
pub fn sample_test() -> GreenCertificate {
    GreenCertificate {
        schema_version: "1.3.0".to_string(),
        person: sample_person(),
        date_of_birth: Some("1964-08-12".to_string()),
        entry: CertificateEntry::Test(vec![TestStatement {
            target: "840539006".to_string(),
            type_of_test: dcc_core::conditions::PCR_TEST_TYPE.to_string(),
            name: Some("Roche LightCycler qPCR".to_string()),
            manufacturer: None,
            date_time_of_collection: "2021-05-30T10:00:00Z".to_string(),
            result: "260415000".to_string(),
            testing_centre: Some("Testzentrum Köln Hbf".to_string()),
            country: "DE".to_string(),
            issuer: "Robert Koch-Institut".to_string(),
            certificate_identifier: "URN:UVCI:01DE/IBMT102/18Q12HTUJ7NPM7IVNQZ9#4".to_string(),
        }]),
    }
}

/// A recovery certificate valid 2021-01-20 until 2021-07-10.
pub fn sample_recovery() -> GreenCertificate {
    GreenCertificate {
        schema_version: "1.3.0".to_string(),
        person: sample_person(),
        date_of_birth: Some("1964-08-12".to_string()),
        entry: CertificateEntry::Recovery(vec![RecoveryStatement {
            target: "840539006".to_string(),
            first_positive_result: "2021-01-10".to_string(),
            country: "DE".to_string(),
            issuer: "Robert Koch-Institut".to_string(),
            certificate_valid_from: "2021-01-20".to_string(),
            certificate_valid_until: "2021-07-10".to_string(),
            certificate_identifier: "URN:UVCI:01DE/5CWLU12RNOB9RXSEOP6FG8#W".to_string(),
        }]),
    }
}

/// A general rule for `country` whose English description is
/// `Sample rule {identifier}`.
pub fn sample_rule(identifier: &str, country: &str, rule_type: Option<RuleType>) -> Rule {
    Rule {
        identifier: identifier.to_string(),
        rule_type,
        country: country.to_string(),
        version: "1.0.0".to_string(),
        schema_version: "1.0.0".to_string(),
        engine: "CERTLOGIC".to_string(),
        engine_version: "0.7.5".to_string(),
        certificate_type: "General".to_string(),
        description: vec![RuleDescription {
            lang: "en".to_string(),
            desc: format!("Sample rule {identifier}"),
        }],
        valid_from: "2021-06-01T00:00:00Z".to_string(),
        valid_to: "2030-06-01T00:00:00Z".to_string(),
        affected_fields: Vec::new(),
        logic: serde_json::json!(true),
        region: None,
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Fixed signer certificates by kid.
#[derive(Debug, Clone, Default)]
pub struct StaticCertificates {
    by_kid: BTreeMap<String, Vec<SignerCertificate>>,
}

impl StaticCertificates {
    /// No certificates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `certificates` under `kid`, in order.
    pub fn with(mut self, kid: impl Into<String>, certificates: Vec<SignerCertificate>) -> Self {
        self.by_kid.insert(kid.into(), certificates);
        self
    }
}

impl CertificateProvider for StaticCertificates {
    fn certificates_for_kid(&self, kid: &str) -> Vec<SignerCertificate> {
        self.by_kid.get(kid).cloned().unwrap_or_default()
    }
}

/// Fixed rules by country.
#[derive(Debug, Clone, Default)]
pub struct StaticRules {
    by_country: BTreeMap<String, Vec<Rule>>,
}

impl StaticRules {
    /// No rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the rules of `country`.
    pub fn with(mut self, country: impl Into<String>, rules: Vec<Rule>) -> Self {
        self.by_country.insert(country.into(), rules);
        self
    }
}

impl RulesProvider for StaticRules {
    fn rules_for_country(&self, country: &str) -> Vec<Rule> {
        self.by_country.get(country).cloned().unwrap_or_default()
    }
}

/// Fixed value sets.
#[derive(Debug, Clone, Default)]
pub struct StaticValueSets {
    sets: BTreeMap<String, Vec<String>>,
}

impl StaticValueSets {
    /// No value sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define value set `id`.
    pub fn with(mut self, id: impl Into<String>, codes: Vec<String>) -> Self {
        self.sets.insert(id.into(), codes);
        self
    }
}

impl ValueSetProvider for StaticValueSets {
    fn value_sets(&self) -> BTreeMap<String, Vec<String>> {
        self.sets.clone()
    }
}

// ---------------------------------------------------------------------------
// Rule engine and verifier wrappers
// ---------------------------------------------------------------------------

/// One call received by a [`ScriptedRuleEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvaluation {
    /// Credential kind passed in.
    pub certificate_type: CertificateType,
    /// Schema version passed in.
    pub schema_version: String,
    /// Identifiers of the rules passed in, in order.
    pub rule_ids: Vec<String>,
    /// External parameters passed in.
    pub params: ExternalParameter,
    /// Credential JSON passed in.
    pub hcert_json: String,
}

#[derive(Debug, Clone)]
struct ScriptedOutcome {
    verdict: RuleVerdict,
    current: Option<String>,
    errors: Vec<String>,
}

/// Rule engine returning one scripted outcome per rule, `Passed` unless
/// scripted otherwise, and recording every call.
#[derive(Debug, Default)]
pub struct ScriptedRuleEngine {
    script: BTreeMap<String, ScriptedOutcome>,
    calls: Mutex<Vec<RecordedEvaluation>>,
}

impl ScriptedRuleEngine {
    /// An engine that passes every rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the verdict for `rule_id`.
    pub fn with_verdict(self, rule_id: impl Into<String>, verdict: RuleVerdict) -> Self {
        self.with_outcome(rule_id, verdict, None, Vec::new())
    }

    /// Script the full outcome for `rule_id`.
    pub fn with_outcome(
        mut self,
        rule_id: impl Into<String>,
        verdict: RuleVerdict,
        current: Option<String>,
        errors: Vec<String>,
    ) -> Self {
        self.script.insert(
            rule_id.into(),
            ScriptedOutcome {
                verdict,
                current,
                errors,
            },
        );
        self
    }

    /// Calls received so far.
    pub fn evaluations(&self) -> Vec<RecordedEvaluation> {
        self.calls.lock().clone()
    }
}

impl RuleEngine for ScriptedRuleEngine {
    fn evaluate(
        &self,
        certificate_type: CertificateType,
        schema_version: &str,
        rules: &[Rule],
        params: &ExternalParameter,
        hcert_json: &str,
    ) -> Vec<RuleOutcome> {
        self.calls.lock().push(RecordedEvaluation {
            certificate_type,
            schema_version: schema_version.to_string(),
            rule_ids: rules.iter().map(|r| r.identifier.clone()).collect(),
            params: params.clone(),
            hcert_json: hcert_json.to_string(),
        });
        rules
            .iter()
            .map(|rule| {
                let scripted = self.script.get(&rule.identifier);
                RuleOutcome {
                    rule: rule.clone(),
                    result: scripted.map_or(RuleVerdict::Passed, |s| s.verdict),
                    current: scripted.and_then(|s| s.current.clone()),
                    validation_errors: scripted.map(|s| s.errors.clone()).unwrap_or_default(),
                }
            })
            .collect()
    }
}

/// Wraps a verifier and counts how many candidates it was asked to check.
#[derive(Debug, Default)]
pub struct CountingVerifier<V> {
    inner: V,
    calls: AtomicUsize,
}

impl<V> CountingVerifier<V> {
    /// Wrap `inner`.
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `verify` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<V: SignatureVerifier> SignatureVerifier for CountingVerifier<V> {
    fn verify(
        &self,
        envelope: &CoseEnvelope,
        certificate: &SignerCertificate,
    ) -> Result<(), CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(envelope, certificate)
    }
}

/// Fixture codec, accepting schema, Ed25519 verifier, a passing rule
/// engine and empty providers.
pub fn fixture_collaborators() -> Collaborators {
    Collaborators {
        codec: Arc::new(FixtureCodec::new()),
        schema: Arc::new(FixtureSchema::accepting()),
        certificates: Arc::new(StaticCertificates::new()),
        verifier: Arc::new(Ed25519SignatureVerifier::new()),
        rules: Arc::new(StaticRules::new()),
        value_sets: Arc::new(StaticValueSets::new()),
        engine: Arc::new(ScriptedRuleEngine::new()),
    }
}
