//! # Decoded Credential Model
//!
//! The payload of a DCC after the technical decode chain has run. The JSON
//! layout follows the EU DCC schema (`ver`, `nam`, `dob`, and one of the
//! `v` / `t` / `r` entry arrays).
//!
//! ## Invariant
//!
//! A [`GreenCertificate`] carries exactly one [`CertificateEntry`] kind.
//! Deserialization goes through an intermediate wire struct and rejects
//! payloads with no non-empty entry array or with more than one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DccError;

/// The credential kind, as classified for the rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateType {
    /// Vaccination certificate.
    Vaccination,
    /// Test certificate.
    Test,
    /// Recovery certificate.
    Recovery,
}

impl CertificateType {
    /// Returns the type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vaccination => "VACCINATION",
            Self::Test => "TEST",
            Self::Recovery => "RECOVERY",
        }
    }
}

impl std::fmt::Display for CertificateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name block of the certificate holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Family name as printed.
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// ICAO 9303 standardised family name.
    #[serde(rename = "fnt", default, skip_serializing_if = "Option::is_none")]
    pub standardised_family_name: Option<String>,
    /// Given name as printed.
    #[serde(rename = "gn", default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// ICAO 9303 standardised given name.
    #[serde(rename = "gnt", default, skip_serializing_if = "Option::is_none")]
    pub standardised_given_name: Option<String>,
}

/// A vaccination entry (`v`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationStatement {
    /// Disease or agent targeted.
    #[serde(rename = "tg")]
    pub target: String,
    /// Vaccine or prophylaxis.
    #[serde(rename = "vp")]
    pub vaccine: String,
    /// Vaccine medicinal product.
    #[serde(rename = "mp")]
    pub medicinal_product: String,
    /// Marketing authorisation holder or manufacturer.
    #[serde(rename = "ma")]
    pub manufacturer: String,
    /// Dose number.
    #[serde(rename = "dn")]
    pub dose_number: u32,
    /// Total series of doses.
    #[serde(rename = "sd")]
    pub total_doses: u32,
    /// Date of vaccination.
    #[serde(rename = "dt")]
    pub date_of_vaccination: String,
    /// Member state of vaccination.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

/// A test entry (`t`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStatement {
    /// Disease or agent targeted.
    #[serde(rename = "tg")]
    pub target: String,
    /// Type of test (e.g. `LP6464-4` for PCR).
    #[serde(rename = "tt")]
    pub type_of_test: String,
    /// NAA test name.
    #[serde(rename = "nm", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// RAT test name and manufacturer.
    #[serde(rename = "ma", default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Date and time of sample collection.
    #[serde(rename = "sc")]
    pub date_time_of_collection: String,
    /// Test result.
    #[serde(rename = "tr")]
    pub result: String,
    /// Testing centre.
    #[serde(rename = "tc", default, skip_serializing_if = "Option::is_none")]
    pub testing_centre: Option<String>,
    /// Member state of test.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

/// A recovery entry (`r`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStatement {
    /// Disease or agent the holder recovered from.
    #[serde(rename = "tg")]
    pub target: String,
    /// Date of first positive test result.
    #[serde(rename = "fr")]
    pub first_positive_result: String,
    /// Member state of test.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Certificate valid from.
    #[serde(rename = "df")]
    pub certificate_valid_from: String,
    /// Certificate valid until.
    #[serde(rename = "du")]
    pub certificate_valid_until: String,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

/// The one kind of entry a certificate carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateEntry {
    /// Vaccination entries, non-empty.
    Vaccination(Vec<VaccinationStatement>),
    /// Test entries, non-empty.
    Test(Vec<TestStatement>),
    /// Recovery entries, non-empty.
    Recovery(Vec<RecoveryStatement>),
}

impl CertificateEntry {
    /// The credential kind of this entry.
    pub fn certificate_type(&self) -> CertificateType {
        match self {
            Self::Vaccination(_) => CertificateType::Vaccination,
            Self::Test(_) => CertificateType::Test,
            Self::Recovery(_) => CertificateType::Recovery,
        }
    }
}

/// The health certificate payload (`hcert` claim, key `1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireCertificate", into = "WireCertificate")]
pub struct GreenCertificate {
    /// Schema version the payload claims to follow.
    pub schema_version: String,
    /// Holder name.
    pub person: Person,
    /// Holder date of birth, verbatim.
    pub date_of_birth: Option<String>,
    /// The single entry kind.
    pub entry: CertificateEntry,
}

impl GreenCertificate {
    /// The credential kind.
    pub fn certificate_type(&self) -> CertificateType {
        self.entry.certificate_type()
    }
}

#[derive(Serialize, Deserialize)]
struct WireCertificate {
    ver: String,
    nam: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    v: Option<Vec<VaccinationStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<Vec<TestStatement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r: Option<Vec<RecoveryStatement>>,
}

impl TryFrom<WireCertificate> for GreenCertificate {
    type Error = DccError;

    fn try_from(wire: WireCertificate) -> Result<Self, Self::Error> {
        let non_empty = |len: Option<usize>| len.is_some_and(|n| n > 0);
        let kinds = [
            non_empty(wire.v.as_ref().map(Vec::len)),
            non_empty(wire.t.as_ref().map(Vec::len)),
            non_empty(wire.r.as_ref().map(Vec::len)),
        ];
        let entry = match (kinds, wire.v, wire.t, wire.r) {
            ([true, false, false], Some(v), _, _) => CertificateEntry::Vaccination(v),
            ([false, true, false], _, Some(t), _) => CertificateEntry::Test(t),
            ([false, false, true], _, _, Some(r)) => CertificateEntry::Recovery(r),
            ([false, false, false], ..) => {
                return Err(DccError::InvalidCertificate(
                    "no vaccination, test or recovery entry".to_string(),
                ))
            }
            _ => {
                return Err(DccError::InvalidCertificate(
                    "more than one entry kind present".to_string(),
                ))
            }
        };
        Ok(Self {
            schema_version: wire.ver,
            person: wire.nam,
            date_of_birth: wire.dob,
            entry,
        })
    }
}

impl From<GreenCertificate> for WireCertificate {
    fn from(cert: GreenCertificate) -> Self {
        let (v, t, r) = match cert.entry {
            CertificateEntry::Vaccination(v) => (Some(v), None, None),
            CertificateEntry::Test(t) => (None, Some(t), None),
            CertificateEntry::Recovery(r) => (None, None, Some(r)),
        };
        Self {
            ver: cert.schema_version,
            nam: cert.person,
            dob: cert.date_of_birth,
            v,
            t,
            r,
        }
    }
}

/// A fully decoded credential: CWT claims plus the health certificate.
///
/// Produced once per validation call by the decode stage and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCredential {
    /// CWT issued-at.
    pub issued_at: DateTime<Utc>,
    /// CWT expiration.
    pub expiration_time: DateTime<Utc>,
    /// CWT issuer country code.
    pub issuing_country: String,
    /// The health certificate payload.
    pub certificate: GreenCertificate,
    /// Canonical JSON of the payload, as handed to the rule engine.
    pub hcert_json: String,
}

impl DecodedCredential {
    /// Build a decoded credential, rendering `hcert_json` from the payload.
    pub fn new(
        issued_at: DateTime<Utc>,
        expiration_time: DateTime<Utc>,
        issuing_country: impl Into<String>,
        certificate: GreenCertificate,
    ) -> Result<Self, DccError> {
        let hcert_json = serde_json::to_string(&certificate)?;
        Ok(Self {
            issued_at,
            expiration_time,
            issuing_country: issuing_country.into(),
            certificate,
            hcert_json,
        })
    }

    /// The credential kind.
    pub fn certificate_type(&self) -> CertificateType {
        self.certificate.certificate_type()
    }
}
