//! # Validation Results
//!
//! The itemized verdict returned to the verification backend. Each
//! [`ValidationResult`] is one observation from one stage; the response is
//! the ordered sequence of them.
//!
//! ## Invariants
//!
//! - Order reflects stage execution order, and within the rule stage, rule
//!   evaluation order. The [`ResultCollector`] only appends.
//! - A finished sequence is never empty: [`ResultCollector::finish()`]
//!   appends a synthetic `OK / PASSED / TechnicalVerification` entry when no
//!   stage produced one.

use serde::{Deserialize, Serialize};

/// Coarse outcome of one result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultType {
    /// The check is satisfied.
    Ok,
    /// The check is not satisfied or could not be decided.
    Nok,
}

/// Fine outcome of one result entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    /// The check passed.
    Passed,
    /// The check failed.
    Failed,
    /// The check could not be decided (e.g. a rule evaluated to open).
    Open,
}

/// Which part of the acceptance decision a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultIdentifier {
    /// Decoding, hashing, dates, identity and signature checks.
    TechnicalVerification,
    /// Issuer-side invalidation rules.
    IssuerInvalidation,
    /// Destination-country acceptance rules.
    DestinationAcceptance,
    /// Traveller-specific acceptance rules.
    TravellerAcceptance,
}

impl ResultIdentifier {
    /// Returns the identifier code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TechnicalVerification => "TechnicalVerification",
            Self::IssuerInvalidation => "IssuerInvalidation",
            Self::DestinationAcceptance => "DestinationAcceptance",
            Self::TravellerAcceptance => "TravellerAcceptance",
        }
    }
}

impl std::fmt::Display for ResultIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the validation verdict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Coarse outcome.
    pub result: ResultType,
    /// Fine outcome.
    #[serde(rename = "type")]
    pub check_type: CheckType,
    /// Decision area.
    pub identifier: ResultIdentifier,
    /// Free-text diagnostic.
    pub details: String,
}

impl ValidationResult {
    /// Create a result entry.
    pub fn new(
        result: ResultType,
        check_type: CheckType,
        identifier: ResultIdentifier,
        details: impl Into<String>,
    ) -> Self {
        Self {
            result,
            check_type,
            identifier,
            details: details.into(),
        }
    }

    /// `OK / PASSED` with the given identifier.
    pub fn passed(identifier: ResultIdentifier, details: impl Into<String>) -> Self {
        Self::new(ResultType::Ok, CheckType::Passed, identifier, details)
    }

    /// `NOK / FAILED` with the given identifier.
    pub fn failed(identifier: ResultIdentifier, details: impl Into<String>) -> Self {
        Self::new(ResultType::Nok, CheckType::Failed, identifier, details)
    }

    /// `NOK / FAILED / TechnicalVerification`, the shape of every
    /// decode, date, identity and signature failure.
    pub fn technical_failure(details: impl Into<String>) -> Self {
        Self::failed(ResultIdentifier::TechnicalVerification, details)
    }

    /// Whether this entry is `OK`.
    pub fn is_ok(&self) -> bool {
        self.result == ResultType::Ok
    }
}

/// Append-only accumulator of result entries for one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultCollector {
    results: Vec<ValidationResult>,
}

impl ResultCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    /// Append `NOK / FAILED / TechnicalVerification`.
    pub fn technical_failure(&mut self, details: impl Into<String>) {
        self.push(ValidationResult::technical_failure(details));
    }

    /// Entries collected so far.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Number of entries collected so far.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no entry has been collected yet.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Close the collector, guaranteeing a non-empty verdict.
    pub fn finish(mut self) -> Vec<ValidationResult> {
        if self.results.is_empty() {
            self.results.push(ValidationResult::passed(
                ResultIdentifier::TechnicalVerification,
                "OK",
            ));
        }
        self.results
    }
}
