//! # Decode Stage
//!
//! Runs the technical chain prefix, Base45, decompress, COSE, key id,
//! schema, payload in that order. The first failing step ends the whole
//! validation call with a single `TechnicalVerification / FAILED` result
//! whose details are the step's fixed diagnostic.
//!
//! ## Invariant
//!
//! The diagnostics returned by [`DecodeFailure::diagnostic()`] are consumed
//! verbatim by downstream services and must not change, including their
//! inconsistent capitalisation.

use dcc_core::{CoseEnvelope, DecodedCredential};
use dcc_crypto::encode_kid;

use crate::codec::{CodecError, DccCodec, SchemaValidator};

/// A step of the technical decode chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeStep {
    /// Context prefix recognition.
    Prefix,
    /// Base45 decoding.
    Base45,
    /// Decompression.
    Decompress,
    /// COSE_Sign1 decoding.
    Cose,
    /// Key-identifier extraction from the COSE headers.
    KeyId,
    /// Schema validation of the payload.
    Schema,
    /// CBOR payload decoding.
    Cbor,
}

impl DecodeStep {
    /// All steps in execution order.
    pub const ALL: [DecodeStep; 7] = [
        Self::Prefix,
        Self::Base45,
        Self::Decompress,
        Self::Cose,
        Self::KeyId,
        Self::Schema,
        Self::Cbor,
    ];

    /// Returns the step name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prefix => "prefix",
            Self::Base45 => "base45",
            Self::Decompress => "decompress",
            Self::Cose => "cose",
            Self::KeyId => "kid",
            Self::Schema => "schema",
            Self::Cbor => "cbor",
        }
    }
}

impl std::fmt::Display for DecodeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the decode stage stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No recognised context prefix.
    MissingPrefix,
    /// Base45 text rejected.
    Base45(CodecError),
    /// Compressed data rejected.
    Decompress(CodecError),
    /// COSE structure rejected.
    Cose(CodecError),
    /// No key identifier in the envelope headers.
    MissingKid,
    /// Payload does not satisfy the schema.
    SchemaInvalid,
    /// CBOR payload rejected.
    Cbor(CodecError),
}

impl DecodeFailure {
    /// The step that failed.
    pub fn step(&self) -> DecodeStep {
        match self {
            Self::MissingPrefix => DecodeStep::Prefix,
            Self::Base45(_) => DecodeStep::Base45,
            Self::Decompress(_) => DecodeStep::Decompress,
            Self::Cose(_) => DecodeStep::Cose,
            Self::MissingKid => DecodeStep::KeyId,
            Self::SchemaInvalid => DecodeStep::Schema,
            Self::Cbor(_) => DecodeStep::Cbor,
        }
    }

    /// The result details reported for this failure.
    pub fn diagnostic(&self) -> &'static str {
        match self {
            Self::MissingPrefix => "No HC1: prefix",
            Self::Base45(_) => "Wrong Base45 coding",
            Self::Decompress(_) => "Can not decompress data",
            Self::Cose(_) => "Can not decode cose",
            Self::MissingKid => "Can not extract kid",
            Self::SchemaInvalid => "schema invalid",
            Self::Cbor(_) => "can not decode cbor",
        }
    }
}

impl std::fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.diagnostic())
    }
}

impl std::error::Error for DecodeFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Base45(e) | Self::Decompress(e) | Self::Cose(e) | Self::Cbor(e) => Some(e),
            Self::MissingPrefix | Self::MissingKid | Self::SchemaInvalid => None,
        }
    }
}

/// Everything the later stages need from a successfully decoded credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDcc {
    /// The recognised context prefix.
    pub context_prefix: String,
    /// The signed envelope.
    pub envelope: CoseEnvelope,
    /// Raw key identifier, non-empty.
    pub kid: Vec<u8>,
    /// Claims and health certificate.
    pub credential: DecodedCredential,
}

impl DecodedDcc {
    /// The key identifier in the base64 form providers are keyed by.
    pub fn kid_base64(&self) -> String {
        encode_kid(&self.kid)
    }
}

/// Run the technical decode chain over `raw`.
pub fn decode(
    codec: &dyn DccCodec,
    schema: &dyn SchemaValidator,
    raw: &str,
) -> Result<DecodedDcc, DecodeFailure> {
    let stripped = codec
        .strip_prefix(raw)
        .ok_or(DecodeFailure::MissingPrefix)?;
    tracing::debug!(prefix = %stripped.context_prefix, "context prefix recognised");

    let compressed = codec
        .base45_decode(stripped.body)
        .map_err(DecodeFailure::Base45)?;
    let cose = codec
        .decompress(&compressed)
        .map_err(DecodeFailure::Decompress)?;
    let envelope = codec.decode_cose(&cose).map_err(DecodeFailure::Cose)?;

    let kid = envelope
        .key_id()
        .map(<[u8]>::to_vec)
        .ok_or(DecodeFailure::MissingKid)?;
    tracing::debug!(kid = %encode_kid(&kid), "envelope decoded");

    if !schema.is_valid(&envelope.payload) {
        return Err(DecodeFailure::SchemaInvalid);
    }

    let credential = codec
        .decode_cbor(&envelope.payload)
        .map_err(DecodeFailure::Cbor)?;
    tracing::debug!(
        certificate_type = %credential.certificate_type(),
        issuer = %credential.issuing_country,
        "payload decoded"
    );

    Ok(DecodedDcc {
        context_prefix: stripped.context_prefix,
        envelope,
        kid,
        credential,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_vaccination, FixtureCodec, FixtureDccBuilder, FixtureSchema};
    use dcc_crypto::Ed25519KeyPair;

    fn signed_dcc() -> String {
        let kp = Ed25519KeyPair::from_seed(&[3u8; 32]);
        FixtureDccBuilder::new(sample_vaccination())
            .kid(vec![9, 9, 9, 9])
            .sign(&kp)
    }

    #[test]
    fn decode_succeeds_on_fixture_credential() {
        let dcc = signed_dcc();
        let decoded = decode(&FixtureCodec::new(), &FixtureSchema::accepting(), &dcc).unwrap();
        assert_eq!(decoded.context_prefix, "HC1:");
        assert_eq!(decoded.kid, vec![9, 9, 9, 9]);
        assert_eq!(decoded.kid_base64(), "CQkJCQ==");
        assert_eq!(decoded.credential.issuing_country, "DE");
    }

    #[test]
    fn missing_prefix_fails_first() {
        let err = decode(&FixtureCodec::new(), &FixtureSchema::accepting(), "no prefix here").unwrap_err();
        assert_eq!(err, DecodeFailure::MissingPrefix);
        assert_eq!(err.diagnostic(), "No HC1: prefix");
    }

    #[test]
    fn each_injected_step_maps_to_its_diagnostic() {
        let dcc = signed_dcc();
        let expected = [
            (DecodeStep::Prefix, "No HC1: prefix"),
            (DecodeStep::Base45, "Wrong Base45 coding"),
            (DecodeStep::Decompress, "Can not decompress data"),
            (DecodeStep::Cose, "Can not decode cose"),
            (DecodeStep::Schema, "schema invalid"),
            (DecodeStep::Cbor, "can not decode cbor"),
        ];
        for (step, diagnostic) in expected {
            let codec = FixtureCodec::failing_at(step);
            let schema = FixtureSchema::failing_if(step == DecodeStep::Schema);
            let err = decode(&codec, &schema, &dcc).unwrap_err();
            assert_eq!(err.step(), step);
            assert_eq!(err.diagnostic(), diagnostic);
            assert_eq!(err.to_string(), diagnostic);
        }
    }

    #[test]
    fn empty_kid_is_missing_kid() {
        let kp = Ed25519KeyPair::from_seed(&[3u8; 32]);
        let dcc = FixtureDccBuilder::new(sample_vaccination())
            .kid(Vec::new())
            .sign(&kp);
        let err = decode(&FixtureCodec::new(), &FixtureSchema::accepting(), &dcc).unwrap_err();
        assert_eq!(err, DecodeFailure::MissingKid);
        assert_eq!(err.diagnostic(), "Can not extract kid");
    }

    #[test]
    fn codec_reason_is_kept_as_source() {
        use std::error::Error;
        let err = DecodeFailure::Cose(CodecError::new("bad tag"));
        assert!(err.source().unwrap().to_string().contains("bad tag"));
        assert!(DecodeFailure::SchemaInvalid.source().is_none());
    }

    #[test]
    fn steps_are_listed_in_execution_order() {
        assert_eq!(DecodeStep::ALL.first(), Some(&DecodeStep::Prefix));
        assert_eq!(DecodeStep::ALL.last(), Some(&DecodeStep::Cbor));
    }
}
