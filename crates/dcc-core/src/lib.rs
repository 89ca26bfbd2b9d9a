#![deny(missing_docs)]

//! # dcc-core: Foundational Types for DCC Acceptance Validation
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `thiserror`, `chrono`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **The credential payload is a sum type.** A [`GreenCertificate`] holds
//!    exactly one [`CertificateEntry`] (vaccination, test or recovery).
//!    Payloads with zero or several entry kinds are rejected at
//!    deserialization, so per-type logic is an exhaustive `match`.
//!
//! 2. **Results are append-only.** Stages push [`ValidationResult`] values into
//!    a [`ResultCollector`]; nothing is ever removed or reordered, and
//!    [`ResultCollector::finish()`] guarantees a non-empty verdict.
//!
//! 3. **All instants are UTC.** Condition timestamps and credential dates are
//!    resolved to `DateTime<Utc>` through the [`temporal`] helpers, which
//!    accept zoned, local and date-only forms.
//!
//! 4. **[`DccError`] is for faults, not verdicts.** Semantic failures are
//!    results. Only malformed caller input surfaces as an error.

pub mod certificate;
pub mod conditions;
pub mod digest;
pub mod envelope;
pub mod error;
pub mod result;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use certificate::{
    CertificateEntry, CertificateType, DecodedCredential, GreenCertificate, Person,
    RecoveryStatement, TestStatement, VaccinationStatement,
};
pub use conditions::{AcceptableType, AccessTokenConditions, AccessTokenType};
pub use digest::{content_hash, hash_matches};
pub use envelope::{CoseEnvelope, SignerCertificate};
pub use error::DccError;
pub use result::{CheckType, ResultCollector, ResultIdentifier, ResultType, ValidationResult};
