#![deny(missing_docs)]

//! # dcc-validation: DCC Acceptance Validation Pipeline
//!
//! Validates an encoded, signed health credential against access-token
//! conditions and returns an itemized verdict.
//!
//! ## Stages
//!
//! - **[`decode`]**: the technical codec chain. The only stage that can end
//!   a call early.
//! - **[`semantic`]**: structure hash, expiry, acceptable type, identity.
//! - **[`signature`]**: first verifying candidate certificate wins.
//! - **[`evaluation`]**: business rules of the destination country.
//!
//! [`DccValidator`] sequences the stages according to the requested
//! [`AccessTokenType`](dcc_core::AccessTokenType).
//!
//! ## Collaborators
//!
//! Codecs, schema validation, certificate / rule / value-set lookup and the
//! rule engine are external. They are reached through the traits in
//! [`codec`], [`provider`] and [`rules`], and injected once via
//! [`Collaborators`]. Deterministic fixtures live in `testing` (feature
//! `test-utils`).

pub mod codec;
pub mod decode;
pub mod evaluation;
pub mod provider;
pub mod rules;
pub mod semantic;
pub mod signature;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod validator;

pub use codec::{CodecError, DccCodec, SchemaValidator, StrippedCredential};
pub use decode::{DecodeFailure, DecodeStep, DecodedDcc};
pub use provider::{CertificateProvider, RulesProvider, ValueSetProvider};
pub use rules::{
    ExternalParameter, Rule, RuleDescription, RuleEngine, RuleOutcome, RuleType, RuleVerdict,
};
pub use validator::{Collaborators, DccValidator};
