//! # Technical Codec Chain
//!
//! The reversible encodings that turn a signed envelope into the printable
//! credential string are undone by an external codec. The validation core
//! only sequences the steps and maps each failure to its diagnostic; it
//! never inspects Base45, zlib, COSE or CBOR bytes itself.

use dcc_core::{CoseEnvelope, DecodedCredential};
use thiserror::Error;

/// A codec step rejected its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("codec rejected input: {reason}")]
pub struct CodecError {
    /// Collaborator-supplied reason, for logs only.
    pub reason: String,
}

impl CodecError {
    /// Create a codec error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A credential string with its context prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedCredential<'a> {
    /// The recognised context prefix, e.g. `HC1:`.
    pub context_prefix: String,
    /// The remaining Base45 text.
    pub body: &'a str,
}

/// The codec chain, one method per step, in pipeline order.
///
/// Implementations must be `Send + Sync` so that one instance can serve
/// concurrent validation calls behind an `Arc`.
pub trait DccCodec: Send + Sync {
    /// Recognise and remove the context prefix. `None` when the input
    /// carries no known prefix.
    fn strip_prefix<'a>(&self, raw: &'a str) -> Option<StrippedCredential<'a>>;

    /// Base45-decode the body.
    fn base45_decode(&self, body: &str) -> Result<Vec<u8>, CodecError>;

    /// Inflate the compressed envelope.
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decode the COSE_Sign1 structure.
    fn decode_cose(&self, cose: &[u8]) -> Result<CoseEnvelope, CodecError>;

    /// Decode the CWT payload into claims and health certificate.
    fn decode_cbor(&self, payload: &[u8]) -> Result<DecodedCredential, CodecError>;
}

/// Structural validation of the CWT payload against the DCC schema.
pub trait SchemaValidator: Send + Sync {
    /// Whether `payload` is well-formed.
    fn is_valid(&self, payload: &[u8]) -> bool;
}
