//! # dcc-crypto: Signature Verification for DCC Validation
//!
//! This crate provides the cryptographic seam the validation core uses:
//!
//! - **[`SignatureVerifier`]**: verifies a decoded COSE envelope against one
//!   candidate [`SignerCertificate`](dcc_core::SignerCertificate). The
//!   validation core tries candidates in provider order and stops at the
//!   first success.
//! - **Ed25519** reference verifier and key pair, used by the fixture
//!   collaborators and by deployments whose trust list publishes raw EdDSA
//!   keys.
//! - **Key-identifier encoding**: standard base64 with padding, the lookup
//!   key of every certificate and rule provider.
//!
//! ## Crate Policy
//!
//! - Depends only on `dcc-core` internally.
//! - No mocking of cryptographic operations in tests. Tests use real
//!   Ed25519 keys.

pub mod ed25519;
pub mod error;
pub mod kid;
pub mod verifier;

pub use ed25519::{Ed25519KeyPair, Ed25519SignatureVerifier, COSE_ALG_EDDSA};
pub use error::CryptoError;
pub use kid::{decode_base64, encode_kid};
pub use verifier::SignatureVerifier;
