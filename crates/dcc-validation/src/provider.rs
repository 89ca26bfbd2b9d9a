//! Lookup seams for the data the pipeline reads but never owns.
//!
//! Every call returns a point-in-time snapshot. Providers may be refreshed
//! in the background between two calls; an empty snapshot is a valid
//! answer and never fails a validation.

use std::collections::BTreeMap;

use dcc_core::SignerCertificate;

use crate::rules::Rule;

/// Signer certificates by key identifier.
pub trait CertificateProvider: Send + Sync {
    /// Candidates published under the base64 key identifier, in the order
    /// they should be tried. Empty when the kid is unknown.
    fn certificates_for_kid(&self, kid: &str) -> Vec<SignerCertificate>;
}

/// Business rules by country.
pub trait RulesProvider: Send + Sync {
    /// Rules of `country`, empty when none are defined.
    fn rules_for_country(&self, country: &str) -> Vec<Rule>;
}

/// Value sets used by rule conditions.
pub trait ValueSetProvider: Send + Sync {
    /// Value-set identifier to member codes.
    fn value_sets(&self) -> BTreeMap<String, Vec<String>>;
}
