//! # Validation Orchestrator
//!
//! [`DccValidator`] sequences the stages for one credential:
//!
//! ```text
//! decode ──fail──▶ [single TechnicalVerification FAILED]
//!   │
//!   ▼ OK
//! structure hash (Structure only)
//! expiry, acceptable type
//! identity, signature        (Cryptographic and above)
//! business rules             (Full only)
//!   │
//!   ▼
//! finish ──▶ non-empty result list
//! ```
//!
//! Only the decode stage can end a call early. Every later stage appends
//! to the same [`ResultCollector`] and the next stage runs regardless.
//!
//! ## Concurrency
//!
//! A validator holds only shared, read-only collaborators. All per-call
//! state lives on the stack of [`DccValidator::validate()`], so one
//! instance can serve concurrent calls.

use std::sync::Arc;

use dcc_core::{
    AccessTokenConditions, AccessTokenType, DccError, ResultCollector, ResultIdentifier,
    ValidationResult,
};
use dcc_crypto::SignatureVerifier;

use crate::codec::{DccCodec, SchemaValidator};
use crate::decode::decode;
use crate::evaluation::{evaluate_rules, RuleContext};
use crate::provider::{CertificateProvider, RulesProvider, ValueSetProvider};
use crate::rules::RuleEngine;
use crate::semantic::{check_acceptable_type, check_expiry, check_identity, check_structure_hash};
use crate::signature::check_signature;

/// The external collaborators a validator delegates to.
#[derive(Clone)]
pub struct Collaborators {
    /// Technical codec chain.
    pub codec: Arc<dyn DccCodec>,
    /// Payload schema check.
    pub schema: Arc<dyn SchemaValidator>,
    /// Signer certificates by kid.
    pub certificates: Arc<dyn CertificateProvider>,
    /// Signature verification.
    pub verifier: Arc<dyn SignatureVerifier>,
    /// Business rules by country.
    pub rules: Arc<dyn RulesProvider>,
    /// Value sets for the rule engine.
    pub value_sets: Arc<dyn ValueSetProvider>,
    /// Business-rule evaluator.
    pub engine: Arc<dyn RuleEngine>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Validates DCCs against access-token conditions.
#[derive(Debug, Clone)]
pub struct DccValidator {
    collaborators: Collaborators,
}

impl DccValidator {
    /// Create a validator over the given collaborators.
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Validate `dcc` against `conditions` to the depth of `access`.
    ///
    /// Returns the ordered, never-empty result list. A technical decode
    /// failure yields exactly one entry.
    ///
    /// # Errors
    ///
    /// Returns a [`DccError`] only for malformed conditions: a timestamp a
    /// running stage needs that does not parse, or an unknown acceptable
    /// type symbol.
    pub fn validate(
        &self,
        dcc: &str,
        conditions: &AccessTokenConditions,
        access: AccessTokenType,
    ) -> Result<Vec<ValidationResult>, DccError> {
        let c = &self.collaborators;
        let mut results = ResultCollector::new();

        let decoded = match decode(c.codec.as_ref(), c.schema.as_ref(), dcc) {
            Ok(decoded) => decoded,
            Err(failure) => {
                tracing::info!(
                    access = %access,
                    step = %failure.step(),
                    "dcc technical decode failed"
                );
                results.technical_failure(failure.diagnostic());
                return Ok(results.finish());
            }
        };
        results.push(ValidationResult::passed(
            ResultIdentifier::TechnicalVerification,
            "OK",
        ));

        if access == AccessTokenType::Structure {
            check_structure_hash(dcc, conditions, &mut results);
        }

        let credential = &decoded.credential;
        check_expiry(credential, conditions, &mut results)?;
        check_acceptable_type(credential, conditions, &mut results)?;

        if access > AccessTokenType::Structure {
            check_identity(credential, conditions, &mut results);
            check_signature(
                &decoded,
                conditions,
                c.certificates.as_ref(),
                c.verifier.as_ref(),
                &mut results,
            )?;
        }

        if access == AccessTokenType::Full {
            let ctx = RuleContext {
                rules: c.rules.as_ref(),
                value_sets: c.value_sets.as_ref(),
                engine: c.engine.as_ref(),
            };
            evaluate_rules(&decoded, conditions, ctx, &mut results)?;
        }

        let results = results.finish();
        tracing::info!(
            access = %access,
            certificate_type = %credential.certificate_type(),
            results = results.len(),
            failures = results.iter().filter(|r| !r.is_ok()).count(),
            "dcc validated"
        );
        Ok(results)
    }
}
