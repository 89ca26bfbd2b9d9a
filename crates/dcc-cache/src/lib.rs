//! # dcc-cache: Snapshot Caches for DCC Validation
//!
//! In-memory caches for the data the validation pipeline looks up:
//!
//! - [`SignerInformationCache`]: signer certificates by base64 kid,
//!   implementing [`CertificateProvider`](dcc_validation::CertificateProvider).
//! - [`RulesCache`]: business rules by country, implementing
//!   [`RulesProvider`](dcc_validation::RulesProvider).
//! - [`ValueSetCache`]: value sets, implementing
//!   [`ValueSetProvider`](dcc_validation::ValueSetProvider).
//!
//! Each cache holds an immutable snapshot behind an `Arc` and swaps it
//! whole. Refreshes are driven by the host (a timer task, a cron job) via
//! `refresh_with`, gated per cache by a [`RefreshGate`] configured from
//! [`CacheConfig`].
//!
//! Fetching from a gateway is not part of this crate. Loaders are closures
//! supplied by the host.

pub mod config;
pub mod error;
pub mod refresh;
pub mod rules;
pub mod signers;
pub mod snapshot;
pub mod value_sets;

pub use config::{CacheConfig, DownloadSchedule};
pub use error::CacheError;
pub use refresh::{GateTicket, RefreshGate, RefreshOutcome};
pub use rules::RulesCache;
pub use signers::SignerInformationCache;
pub use snapshot::Snapshot;
pub use value_sets::ValueSetCache;

/// The three caches built from one configuration.
#[derive(Debug)]
pub struct Caches {
    /// Signer certificates.
    pub signers: SignerInformationCache,
    /// Business rules.
    pub rules: RulesCache,
    /// Value sets.
    pub value_sets: ValueSetCache,
}

impl Caches {
    /// Empty caches with the configured schedules.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            signers: SignerInformationCache::new(config.signer_download),
            rules: RulesCache::new(config.business_rules_download),
            value_sets: ValueSetCache::new(config.value_sets_download),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_use_their_own_schedule() {
        let config = CacheConfig {
            signer_download: DownloadSchedule::new(10, 20),
            ..Default::default()
        };
        let caches = Caches::new(&config);
        assert!(caches.signers.certificates_for_kid("x").is_empty());
        assert!(caches.rules.countries().is_empty());
        assert!(caches.value_sets.value_sets().is_empty());
    }
}
