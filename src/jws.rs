//! Parsing of the JWS that carries a SafetyNet response.
//!
//! The compact serialisation (`header.payload.signature`) is handed to [`compact_jwt`].
//! The JSON serialisations, general and flattened, are reduced to the compact form
//! first, which is only possible when they carry exactly one signature. Nothing in this
//! module establishes trust.

use crate::error::{AttestationError, AttestationResult};
use compact_jwt::traits::JwsVerifiable;
use compact_jwt::{JwaAlg, JwsCompact};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
struct JsonSignature {
    protected: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonSerialisation {
    General {
        payload: String,
        signatures: Vec<JsonSignature>,
    },
    Flattened {
        payload: String,
        protected: String,
        signature: String,
    },
}

impl JsonSerialisation {
    fn into_compact(self) -> AttestationResult<String> {
        let (payload, sig) = match self {
            JsonSerialisation::General {
                payload,
                signatures,
            } => {
                let [sig]: [JsonSignature; 1] = signatures.try_into().map_err(
                    |sigs: Vec<JsonSignature>| {
                        AttestationError::malformed_signature(format!(
                            "expected exactly 1 signature, found {}",
                            sigs.len()
                        ))
                    },
                )?;
                (payload, sig)
            }
            JsonSerialisation::Flattened {
                payload,
                protected,
                signature,
            } => (
                payload,
                JsonSignature {
                    protected,
                    signature,
                },
            ),
        };

        // A '.' inside any member would shift the compact sections.
        if [&sig.protected, &payload, &sig.signature]
            .iter()
            .any(|part| part.contains('.'))
        {
            return Err(AttestationError::malformed_signature(
                "json jws member is not base64url",
            ));
        }

        Ok(format!("{}.{}.{}", sig.protected, payload, sig.signature))
    }
}

/// The signature algorithms a SafetyNet response may use. The attestation certificate
/// carries either an RSA or a P-256 key.
pub fn is_supported_alg(alg: JwaAlg) -> bool {
    matches!(alg, JwaAlg::RS256 | JwaAlg::ES256)
}

/// Parse a signed response in any JWS serialisation.
///
/// The result is unverified: its payload must not be read until the signature has been
/// checked against a trusted certificate.
pub fn parse_signed_response(input: &[u8]) -> AttestationResult<JwsCompact> {
    let input = std::str::from_utf8(input).map_err(|e| {
        AttestationError::malformed_signature("response is not valid utf-8").with_cause(e)
    })?;
    let input = input.trim();

    let compact = if input.starts_with('{') {
        let json: JsonSerialisation = serde_json::from_str(input).map_err(|e| {
            AttestationError::malformed_signature("response is not a json jws").with_cause(e)
        })?;
        json.into_compact()?
    } else {
        input.to_string()
    };

    let jws = JwsCompact::from_str(&compact).map_err(|e| {
        AttestationError::malformed_signature(format!("response is not a valid jws: {}", e))
            .with_cause(e)
    })?;

    if !is_supported_alg(jws.alg()) {
        return Err(AttestationError::malformed_signature(format!(
            "unsupported signature algorithm {:?}",
            jws.alg()
        )));
    }

    Ok(jws)
}
