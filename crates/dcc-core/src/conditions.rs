//! # Access-Token Conditions
//!
//! The caller-supplied policy a credential is validated against, and the
//! depth of validation requested.
//!
//! Conditions arrive as JSON (camelCase keys, as carried in the access token)
//! and are immutable for the duration of one validation call.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::certificate::{CertificateEntry, GreenCertificate};
use crate::error::DccError;
use crate::temporal::parse_condition_instant;

/// How deep validation must go.
///
/// Variants are totally ordered by ordinal; a higher level runs every check
/// of the lower levels plus its own. Serialized as the integer ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AccessTokenType {
    /// Decode, structure hash, expiry and acceptable type only.
    Structure,
    /// Adds identity match and signature verification.
    Cryptographic,
    /// Adds business-rule evaluation.
    Full,
}

impl AccessTokenType {
    /// The ordinal value carried on the wire.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Structure => 0,
            Self::Cryptographic => 1,
            Self::Full => 2,
        }
    }

    /// Returns the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structure => "Structure",
            Self::Cryptographic => "Cryptographic",
            Self::Full => "Full",
        }
    }
}

impl TryFrom<u8> for AccessTokenType {
    type Error = DccError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Structure),
            1 => Ok(Self::Cryptographic),
            2 => Ok(Self::Full),
            other => Err(DccError::InvalidAccessTokenType(other)),
        }
    }
}

impl From<AccessTokenType> for u8 {
    fn from(value: AccessTokenType) -> Self {
        value.ordinal()
    }
}

impl std::fmt::Display for AccessTokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-type code of a NAA (PCR) test.
pub const PCR_TEST_TYPE: &str = "LP6464-4";

/// Sub-type code of a rapid antigen test.
pub const RAPID_TEST_TYPE: &str = "LP217198-3";

/// A credential type the caller is willing to accept.
///
/// `PcrTest` and `RatTest` refine `Test` by the type-of-test code of the
/// first test entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptableType {
    /// Any vaccination certificate (`v`).
    Vaccination,
    /// Any recovery certificate (`r`).
    Recovery,
    /// Any test certificate (`t`).
    Test,
    /// A test certificate for a PCR test (`tp`).
    PcrTest,
    /// A test certificate for a rapid antigen test (`tr`).
    RatTest,
}

impl AcceptableType {
    /// The symbol used in the conditions' `type` list.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Vaccination => "v",
            Self::Recovery => "r",
            Self::Test => "t",
            Self::PcrTest => "tp",
            Self::RatTest => "tr",
        }
    }

    /// Whether `certificate` is of this acceptable type.
    pub fn matches(&self, certificate: &GreenCertificate) -> bool {
        match (self, &certificate.entry) {
            (Self::Vaccination, CertificateEntry::Vaccination(_)) => true,
            (Self::Recovery, CertificateEntry::Recovery(_)) => true,
            (Self::Test, CertificateEntry::Test(_)) => true,
            (Self::PcrTest, CertificateEntry::Test(tests)) => tests
                .first()
                .is_some_and(|t| t.type_of_test == PCR_TEST_TYPE),
            (Self::RatTest, CertificateEntry::Test(tests)) => tests
                .first()
                .is_some_and(|t| t.type_of_test == RAPID_TEST_TYPE),
            _ => false,
        }
    }
}

impl FromStr for AcceptableType {
    type Err = DccError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v" => Ok(Self::Vaccination),
            "r" => Ok(Self::Recovery),
            "t" => Ok(Self::Test),
            "tp" => Ok(Self::PcrTest),
            "tr" => Ok(Self::RatTest),
            other => Err(DccError::UnknownAcceptableType(other.to_string())),
        }
    }
}

impl std::fmt::Display for AcceptableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Acceptance conditions carried in the access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenConditions {
    /// Expected content hash of the raw credential (structure level only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Preferred language of the traveller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Expected standardised family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fnt: Option<String>,
    /// Expected standardised given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnt: Option<String>,
    /// Expected date of birth, compared verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    /// Country of arrival (destination); selects the business rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coa: Option<String>,
    /// Country of departure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cod: Option<String>,
    /// Region of arrival; passed to the rule engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roa: Option<String>,
    /// Region of departure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rod: Option<String>,
    /// Acceptable credential type symbols.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub acceptable_types: Option<Vec<String>>,
    /// Rule categories requested by the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<String>>,
    /// Instant at which signatures and rules are evaluated.
    pub validation_clock: String,
    /// Start of the window the credential must cover.
    pub valid_from: String,
    /// End of the window the credential must cover.
    pub valid_to: String,
}

impl AccessTokenConditions {
    /// Resolve `validFrom` to a UTC instant.
    pub fn valid_from(&self) -> Result<DateTime<Utc>, DccError> {
        parse_condition_instant("validFrom", &self.valid_from)
    }

    /// Resolve `validTo` to a UTC instant.
    pub fn valid_to(&self) -> Result<DateTime<Utc>, DccError> {
        parse_condition_instant("validTo", &self.valid_to)
    }

    /// Resolve `validationClock` to a UTC instant.
    pub fn validation_clock(&self) -> Result<DateTime<Utc>, DccError> {
        parse_condition_instant("validationClock", &self.validation_clock)
    }

    /// Parse the acceptable type symbols.
    ///
    /// Returns `Ok(None)` when no type list was given or the list is empty,
    /// meaning any credential type is acceptable.
    ///
    /// # Errors
    ///
    /// Returns [`DccError::UnknownAcceptableType`] for the first
    /// unrecognised symbol.
    pub fn parsed_acceptable_types(&self) -> Result<Option<Vec<AcceptableType>>, DccError> {
        match self.acceptable_types.as_deref() {
            None | Some([]) => Ok(None),
            Some(symbols) => symbols
                .iter()
                .map(|s| s.parse())
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
        }
    }
}
