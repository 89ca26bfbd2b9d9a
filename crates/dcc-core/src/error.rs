//! # Error Hierarchy
//!
//! Structured errors for DCC validation, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! These errors are reserved for malformed caller input and internal faults.
//! A credential that fails a check is not an error: it produces a
//! [`ValidationResult`](crate::ValidationResult) entry instead.

use thiserror::Error;

/// Top-level error type for DCC validation.
#[derive(Error, Debug)]
pub enum DccError {
    /// A condition timestamp could not be resolved to an instant.
    #[error("invalid condition {field}: \"{value}\" ({reason})")]
    InvalidCondition {
        /// The condition field name (e.g. `validTo`).
        field: &'static str,
        /// The value that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An acceptable-type symbol that maps to no known credential type.
    #[error("unknown acceptable type symbol: \"{0}\" (expected one of v, r, t, tp, tr)")]
    UnknownAcceptableType(String),

    /// An access-token type ordinal outside the known range.
    #[error("invalid access token type ordinal: {0} (expected 0, 1 or 2)")]
    InvalidAccessTokenType(u8),

    /// A credential payload that violates the one-entry-kind rule.
    #[error("invalid certificate payload: {0}")]
    InvalidCertificate(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
