//! # Signer Information Cache
//!
//! Signer certificates grouped by base64 key identifier. Within a kid the
//! order of the loaded list is kept, because the signature stage tries
//! candidates in that order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dcc_core::SignerCertificate;
use dcc_crypto::decode_base64;
use dcc_validation::CertificateProvider;
use serde::Deserialize;

use crate::config::DownloadSchedule;
use crate::error::CacheError;
use crate::refresh::{RefreshGate, RefreshOutcome};
use crate::snapshot::Snapshot;

type SignersByKid = BTreeMap<String, Vec<SignerCertificate>>;

/// One entry of a signer-list document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignerEntry {
    kid: String,
    public_key: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    not_after: Option<DateTime<Utc>>,
}

/// Snapshot cache of signer certificates.
#[derive(Debug)]
pub struct SignerInformationCache {
    snapshot: Snapshot<SignersByKid>,
    gate: RefreshGate,
}

impl SignerInformationCache {
    /// An empty cache refreshed on `schedule`.
    pub fn new(schedule: DownloadSchedule) -> Self {
        Self {
            snapshot: Snapshot::default(),
            gate: RefreshGate::new("signer_information", schedule),
        }
    }

    /// Replace the whole snapshot.
    pub fn replace(&self, certificates: Vec<SignerCertificate>) {
        let grouped = group_by_kid(certificates);
        tracing::debug!(kids = grouped.len(), "signer snapshot replaced");
        self.snapshot.store(grouped);
    }

    /// Parse a signer-list document and replace the snapshot with it.
    ///
    /// The document is a JSON array of
    /// `{"kid", "publicKey" (base64), "subject"?, "notAfter"?}` entries.
    pub fn load_json(&self, json: &str) -> Result<usize, CacheError> {
        let certificates = parse_signer_list(json)?;
        let count = certificates.len();
        self.replace(certificates);
        Ok(count)
    }

    /// Candidates for a base64 kid, in load order.
    pub fn certificates_for_kid(&self, kid: &str) -> Vec<SignerCertificate> {
        self.snapshot.load().get(kid).cloned().unwrap_or_default()
    }

    /// Number of distinct kids.
    pub fn kid_count(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Refresh from `loader` if due.
    pub fn refresh_with(
        &self,
        now: DateTime<Utc>,
        loader: impl FnOnce() -> Result<Vec<SignerCertificate>, CacheError>,
    ) -> Result<RefreshOutcome, CacheError> {
        self.gate.run(now, loader, |certificates| self.replace(certificates))
    }
}

impl CertificateProvider for SignerInformationCache {
    fn certificates_for_kid(&self, kid: &str) -> Vec<SignerCertificate> {
        SignerInformationCache::certificates_for_kid(self, kid)
    }
}

fn group_by_kid(certificates: Vec<SignerCertificate>) -> SignersByKid {
    let mut grouped = SignersByKid::new();
    for certificate in certificates {
        grouped
            .entry(certificate.kid.clone())
            .or_default()
            .push(certificate);
    }
    grouped
}

/// Parse a signer-list document.
pub fn parse_signer_list(json: &str) -> Result<Vec<SignerCertificate>, CacheError> {
    let entries: Vec<SignerEntry> = serde_json::from_str(json)?;
    entries
        .into_iter()
        .map(|entry| {
            let public_key =
                decode_base64(&entry.public_key).map_err(|source| CacheError::InvalidSigner {
                    kid: entry.kid.clone(),
                    source,
                })?;
            Ok(SignerCertificate {
                kid: entry.kid,
                public_key,
                subject: entry.subject,
                not_after: entry.not_after,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cert(kid: &str, key: u8) -> SignerCertificate {
        SignerCertificate {
            kid: kid.to_string(),
            public_key: vec![key; 32],
            subject: None,
            not_after: None,
        }
    }

    #[test]
    fn lookup_keeps_load_order_within_kid() {
        let cache = SignerInformationCache::new(DownloadSchedule::default());
        cache.replace(vec![cert("a", 1), cert("b", 2), cert("a", 3)]);
        let found = cache.certificates_for_kid("a");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].public_key[0], 1);
        assert_eq!(found[1].public_key[0], 3);
        assert!(cache.certificates_for_kid("zz").is_empty());
        assert_eq!(cache.kid_count(), 2);
    }

    #[test]
    fn replace_drops_previous_snapshot() {
        let cache = SignerInformationCache::new(DownloadSchedule::default());
        cache.replace(vec![cert("a", 1)]);
        cache.replace(vec![cert("b", 2)]);
        assert!(cache.certificates_for_kid("a").is_empty());
    }

    #[test]
    fn load_json_decodes_keys() {
        let cache = SignerInformationCache::new(DownloadSchedule::default());
        let n = cache
            .load_json(
                r#"[{"kid":"JTzRetJ6fxs=","publicKey":"AQID","subject":"CN=DSC DE 1",
                     "notAfter":"2023-01-01T00:00:00Z"}]"#,
            )
            .unwrap();
        assert_eq!(n, 1);
        let found = cache.certificates_for_kid("JTzRetJ6fxs=");
        assert_eq!(found[0].public_key, vec![1, 2, 3]);
        assert_eq!(found[0].subject.as_deref(), Some("CN=DSC DE 1"));
        assert!(found[0].not_after.is_some());
    }

    #[test]
    fn load_json_rejects_bad_key() {
        let cache = SignerInformationCache::new(DownloadSchedule::default());
        let err = cache
            .load_json(r#"[{"kid":"k1","publicKey":"***"}]"#)
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidSigner { kid, .. } if kid == "k1"));
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let t0 = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let cache = SignerInformationCache::new(DownloadSchedule::new(60, 600));
        assert_eq!(
            cache.refresh_with(t0, || Ok(vec![cert("a", 1)])).unwrap(),
            RefreshOutcome::Refreshed
        );
        assert!(cache
            .refresh_with(t0 + Duration::seconds(61), || Err(CacheError::Load(
                "gateway unavailable".into()
            )))
            .is_err());
        assert_eq!(cache.certificates_for_kid("a").len(), 1);
    }
}
