//! Cache and configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading snapshots or configuration.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A snapshot document is not valid JSON for its type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration document is not valid YAML for its type.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A signer entry carries an undecodable key.
    #[error("invalid signer entry for kid {kid}: {source}")]
    InvalidSigner {
        /// Key identifier of the entry.
        kid: String,
        /// Underlying decode error.
        source: dcc_crypto::CryptoError,
    },

    /// A refresh loader failed.
    #[error("snapshot loader failed: {0}")]
    Load(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_display() {
        let err = CacheError::InvalidConfig("signer_download.time_interval_secs must be > 0".into());
        assert!(err.to_string().contains("signer_download"));
    }

    #[test]
    fn io_error_names_path() {
        let err = CacheError::Io {
            path: PathBuf::from("/etc/dcc/cache.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/dcc/cache.yaml"));
    }
}
