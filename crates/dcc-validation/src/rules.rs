//! # Business Rules
//!
//! The rule model shared with the rule engine and the rules provider, in
//! the EU business-rule JSON layout (PascalCase keys), plus the engine seam.
//!
//! The condition language in `Logic` is opaque here. It is carried as raw
//! JSON and only the rule engine interprets it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dcc_core::CertificateType;
use serde::{Deserialize, Serialize};

/// Rule kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    /// Destination-country acceptance rule.
    Acceptance,
    /// Issuer-side invalidation rule.
    Invalidation,
    /// Any kind this service does not know.
    #[serde(other)]
    Unrecognised,
}

/// One localised rule description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescription {
    /// ISO 639-1 language code.
    pub lang: String,
    /// Description text.
    pub desc: String,
}

/// A business rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    /// Rule identifier, e.g. `VR-DE-0001`.
    pub identifier: String,
    /// Rule kind. Absent and unknown kinds are treated as invalidation.
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,
    /// Country the rule belongs to.
    pub country: String,
    /// Rule version.
    pub version: String,
    /// DCC schema version the rule was written against.
    pub schema_version: String,
    /// Engine name, e.g. `CERTLOGIC`.
    pub engine: String,
    /// Engine version.
    pub engine_version: String,
    /// Credential kind the rule applies to (`General`, `Vaccination`, ...).
    pub certificate_type: String,
    /// Localised descriptions.
    #[serde(default)]
    pub description: Vec<RuleDescription>,
    /// Start of the rule's validity.
    pub valid_from: String,
    /// End of the rule's validity.
    pub valid_to: String,
    /// Payload fields the logic reads.
    #[serde(default)]
    pub affected_fields: Vec<String>,
    /// Condition expression, opaque to this crate.
    pub logic: serde_json::Value,
    /// Region within the country, if the rule is regional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Rule {
    /// The description for `lang`, if one exists.
    pub fn description_for(&self, lang: &str) -> Option<&str> {
        self.description
            .iter()
            .find(|d| d.lang.eq_ignore_ascii_case(lang))
            .map(|d| d.desc.as_str())
    }

    /// The English description, or the empty string.
    pub fn english_description(&self) -> &str {
        self.description_for("en").unwrap_or_default()
    }
}

/// Verdict of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleVerdict {
    /// The rule holds.
    Passed,
    /// The rule does not hold.
    Fail,
    /// The rule could not be decided.
    Open,
}

/// What the engine reports for one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// The evaluated rule.
    pub rule: Rule,
    /// The verdict.
    pub result: RuleVerdict,
    /// Snapshot of the value the rule looked at, if the engine provides one.
    pub current: Option<String>,
    /// Messages of errors raised while evaluating.
    pub validation_errors: Vec<String>,
}

/// Parameters supplied to the rule engine alongside the credential JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalParameter {
    /// Instant the rules are evaluated at.
    pub validation_clock: DateTime<Utc>,
    /// Value-set identifier to member codes.
    pub value_sets: BTreeMap<String, Vec<String>>,
    /// Country whose rules are applied.
    pub country_code: String,
    /// Credential expiration.
    pub exp: DateTime<Utc>,
    /// Credential issuance.
    pub iat: DateTime<Utc>,
    /// Country that issued the credential.
    pub issuer_country_code: String,
    /// Base64 key identifier of the signer.
    pub kid: String,
    /// Region of arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// The business-rule evaluator.
///
/// Returns one outcome per evaluated rule, in evaluation order. Evaluation
/// problems for a single rule are reported in that outcome's
/// `validation_errors`, never as a failure of the whole call.
pub trait RuleEngine: Send + Sync {
    /// Evaluate `rules` against `hcert_json`.
    fn evaluate(
        &self,
        certificate_type: CertificateType,
        schema_version: &str,
        rules: &[Rule],
        params: &ExternalParameter,
        hcert_json: &str,
    ) -> Vec<RuleOutcome>;
}
