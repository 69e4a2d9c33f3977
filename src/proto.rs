//! Types consumed and produced by attestation verification.

use crate::constants::{ATT_STMT_RESPONSE, ATT_STMT_VER};
use crate::error::{AttestationError, AttestationResult};
use base64urlsafedata::Base64UrlSafeData;
use openssl::x509;
use serde::{Deserialize, Serialize};

/// The transaction data an attestation must be bound to. Both values come from the
/// registration ceremony and must be passed exactly as received.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatorContext<'a> {
    /// The raw authenticatorData bytes.
    pub auth_data_bytes: &'a [u8],
    /// The SHA-256 hash of the serialised client data.
    pub client_data_hash: &'a [u8],
}

impl<'a> AuthenticatorContext<'a> {
    /// Build a context from the raw authenticator data and client data hash.
    pub fn new(auth_data_bytes: &'a [u8], client_data_hash: &'a [u8]) -> Self {
        AuthenticatorContext {
            auth_data_bytes,
            client_data_hash,
        }
    }
}

/// The typed content of an `android-safetynet` attStmt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyNetStatement {
    /// The version of Google Play Services responsible for the response.
    pub ver: String,
    /// The raw SafetyNet response, a JWS.
    pub response: Vec<u8>,
}

impl TryFrom<&serde_cbor_2::Value> for SafetyNetStatement {
    type Error = AttestationError;

    fn try_from(att_stmt: &serde_cbor_2::Value) -> AttestationResult<Self> {
        let att_stmt_map = cbor_try_map!(att_stmt).map_err(|found| {
            AttestationError::malformed_statement(format!(
                "attStmt must be a map, found {}",
                found
            ))
        })?;

        let ver = {
            let ver = att_stmt_map
                .get(&serde_cbor_2::Value::Text(ATT_STMT_VER.to_string()))
                .ok_or_else(|| AttestationError::malformed_statement("missing ver"))?;

            let ver = cbor_try_string!(ver).map_err(|found| {
                AttestationError::malformed_statement(format!(
                    "invalid ver, is of invalid type {}",
                    found
                ))
            })?;

            if ver.is_empty() {
                return Err(AttestationError::malformed_statement("invalid ver, is empty"));
            }
            ver.clone()
        };

        let response = {
            let response = att_stmt_map
                .get(&serde_cbor_2::Value::Text(ATT_STMT_RESPONSE.to_string()))
                .ok_or_else(|| AttestationError::malformed_statement("missing response"))?;

            cbor_try_bytes!(response)
                .map_err(|found| {
                    AttestationError::malformed_statement(format!(
                        "invalid response, is of invalid type {}",
                        found
                    ))
                })?
                .clone()
        };

        Ok(SafetyNetStatement { ver, response })
    }
}

/// The decoded payload of a verified SafetyNet response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyNetResponse {
    /// The nonce the device was asked to attest to.
    pub nonce: Base64UrlSafeData,
    /// Milliseconds since the epoch at which the response was generated.
    pub timestamp_ms: u64,
    /// The package name of the calling app.
    #[serde(default)]
    pub apk_package_name: String,
    /// SHA-256 of the calling app's APK.
    #[serde(default)]
    pub apk_digest_sha256: Option<Base64UrlSafeData>,
    /// SHA-256 digests of the certificates used to sign the calling app.
    #[serde(default)]
    pub apk_certificate_digest_sha256: Vec<Base64UrlSafeData>,
    /// The stricter verdict: the device passed compatibility testing.
    pub cts_profile_match: bool,
    /// The laxer verdict: the device has not been tampered with.
    pub basic_integrity: bool,
    /// How the verdict was reached, such as `BASIC` or `HARDWARE_BACKED`.
    #[serde(default)]
    pub evaluation_type: Option<String>,
    /// Suggestions for recovering a device that failed a check.
    #[serde(default)]
    pub advice: Option<String>,
}

/// Information about the attested device, for callers that want to apply their own policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyNetMetadata {
    /// The version reported in the attestation statement.
    pub ver: String,
    /// The response timestamp in milliseconds since the epoch.
    pub timestamp_ms: u64,
    /// The package name of the calling app.
    pub apk_package_name: String,
    /// SHA-256 of the calling app's APK, if reported.
    pub apk_digest_sha256: Option<Base64UrlSafeData>,
    /// SHA-256 digests of the app signing certificates.
    pub apk_certificate_digest_sha256: Vec<Base64UrlSafeData>,
    /// Always true for a verified attestation.
    pub cts_profile_match: bool,
    /// Reported, not enforced.
    pub basic_integrity: bool,
    /// How the verdict was reached, if reported.
    pub evaluation_type: Option<String>,
}

impl SafetyNetMetadata {
    pub(crate) fn new(ver: String, response: SafetyNetResponse) -> Self {
        let SafetyNetResponse {
            nonce: _,
            timestamp_ms,
            apk_package_name,
            apk_digest_sha256,
            apk_certificate_digest_sha256,
            cts_profile_match,
            basic_integrity,
            evaluation_type,
            advice: _,
        } = response;

        SafetyNetMetadata {
            ver,
            timestamp_ms,
            apk_package_name,
            apk_digest_sha256,
            apk_certificate_digest_sha256,
            cts_profile_match,
            basic_integrity,
            evaluation_type,
        }
    }
}

/// The type of attestation an authenticator provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationType {
    /// Attested by a vendor certificate chain.
    Basic,
}

/// A successful attestation verification. Callers that only need a yes or no answer
/// may discard it.
#[derive(Debug, Clone)]
pub struct VerifiedAttestation {
    /// The attestation type.
    pub attestation_type: AttestationType,
    /// The validated chain, leaf first and ending at the trust root.
    pub trust_path: Vec<x509::X509>,
    /// What the device reported about itself.
    pub metadata: SafetyNetMetadata,
}

impl VerifiedAttestation {
    /// The certificate that signed the attestation.
    pub fn leaf(&self) -> Option<&x509::X509Ref> {
        self.trust_path.first().map(|c| &**c)
    }
}
