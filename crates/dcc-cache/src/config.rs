//! # Cache Configuration
//!
//! Download schedules for the three snapshot caches. Loaded from YAML, with
//! defaults for absent keys and environment overrides on top:
//!
//! ```yaml
//! business_rules_download: { time_interval_secs: 300, lock_limit_secs: 3600 }
//! value_sets_download:     { time_interval_secs: 300, lock_limit_secs: 3600 }
//! signer_download:         { time_interval_secs: 300, lock_limit_secs: 3600 }
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `DCC_RULES_INTERVAL_SECS` | `business_rules_download.time_interval_secs` |
//! | `DCC_RULES_LOCK_LIMIT_SECS` | `business_rules_download.lock_limit_secs` |
//! | `DCC_VALUE_SETS_INTERVAL_SECS` | `value_sets_download.time_interval_secs` |
//! | `DCC_VALUE_SETS_LOCK_LIMIT_SECS` | `value_sets_download.lock_limit_secs` |
//! | `DCC_SIGNER_INTERVAL_SECS` | `signer_download.time_interval_secs` |
//! | `DCC_SIGNER_LOCK_LIMIT_SECS` | `signer_download.lock_limit_secs` |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Default seconds between two refreshes.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default seconds after which a held refresh lock counts as stale.
pub const DEFAULT_LOCK_LIMIT_SECS: u64 = 3600;

/// When one cache refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSchedule {
    /// Minimum seconds between two successful refreshes.
    pub time_interval_secs: u64,
    /// Seconds after which a refresh still holding the lock may be taken
    /// over.
    pub lock_limit_secs: u64,
}

impl Default for DownloadSchedule {
    fn default() -> Self {
        Self {
            time_interval_secs: DEFAULT_INTERVAL_SECS,
            lock_limit_secs: DEFAULT_LOCK_LIMIT_SECS,
        }
    }
}

impl DownloadSchedule {
    /// Create a schedule.
    pub fn new(time_interval_secs: u64, lock_limit_secs: u64) -> Self {
        Self {
            time_interval_secs,
            lock_limit_secs,
        }
    }

    /// The refresh interval.
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_i64(self.time_interval_secs))
    }

    /// The lock limit.
    pub fn lock_limit(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_i64(self.lock_limit_secs))
    }

    fn validate(&self, name: &str) -> Result<(), CacheError> {
        if self.time_interval_secs == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "{name}.time_interval_secs must be > 0"
            )));
        }
        if self.lock_limit_secs == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "{name}.lock_limit_secs must be > 0"
            )));
        }
        Ok(())
    }
}

// chrono::Duration::seconds panics beyond i64::MAX / 1000.
fn saturating_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000)
}

/// Download schedules of all caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Business-rule cache.
    pub business_rules_download: DownloadSchedule,
    /// Value-set cache.
    pub value_sets_download: DownloadSchedule,
    /// Signer-certificate cache.
    pub signer_download: DownloadSchedule,
}

impl CacheConfig {
    /// Parse a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CacheError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), "cache configuration loaded");
        Ok(config)
    }

    /// Apply `DCC_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), CacheError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, keyed by the `DCC_*` variable names.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] for a value that is not an
    /// unsigned integer, or if the result fails validation.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), CacheError> {
        let targets: [(&str, &mut u64); 6] = [
            (
                "DCC_RULES_INTERVAL_SECS",
                &mut self.business_rules_download.time_interval_secs,
            ),
            (
                "DCC_RULES_LOCK_LIMIT_SECS",
                &mut self.business_rules_download.lock_limit_secs,
            ),
            (
                "DCC_VALUE_SETS_INTERVAL_SECS",
                &mut self.value_sets_download.time_interval_secs,
            ),
            (
                "DCC_VALUE_SETS_LOCK_LIMIT_SECS",
                &mut self.value_sets_download.lock_limit_secs,
            ),
            (
                "DCC_SIGNER_INTERVAL_SECS",
                &mut self.signer_download.time_interval_secs,
            ),
            (
                "DCC_SIGNER_LOCK_LIMIT_SECS",
                &mut self.signer_download.lock_limit_secs,
            ),
        ];
        for (var, field) in targets {
            if let Some(raw) = lookup(var) {
                *field = raw.trim().parse().map_err(|_| {
                    CacheError::InvalidConfig(format!("{var} must be an unsigned integer, got {raw:?}"))
                })?;
                tracing::debug!(var, value = *field, "cache configuration override");
            }
        }
        self.validate()
    }

    /// Reject zero intervals and lock limits.
    pub fn validate(&self) -> Result<(), CacheError> {
        self.business_rules_download
            .validate("business_rules_download")?;
        self.value_sets_download.validate("value_sets_download")?;
        self.signer_download.validate("signer_download")
    }
}
