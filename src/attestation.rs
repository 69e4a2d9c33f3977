//! Android SafetyNet attestation verification.
//!
//! <https://www.w3.org/TR/webauthn/#sctn-android-safetynet-attestation>
//!
//! A verification runs four stages in order, and the first failure ends it:
//!
//! 1. extract `ver` and `response` from the attestation statement,
//! 2. parse the response JWS and validate its x5c chain against the [`TrustAnchor`],
//! 3. verify the JWS signature with the leaf key and decode the payload,
//! 4. check the payload nonce against the registration, then the device integrity verdict.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::clock::{unix_millis, Clock, SystemClock};
use crate::constants::{ANDROID_SAFETYNET_FORMAT, DEFAULT_TIMESTAMP_SKEW_MS};
use crate::crypto::{safetynet_nonce, verify_jws_with_certificate};
use crate::error::{AttestationError, AttestationResult, ErrorKind};
use crate::jws::parse_signed_response;
use crate::proto::{
    AttestationType, AuthenticatorContext, SafetyNetMetadata, SafetyNetResponse,
    SafetyNetStatement, VerifiedAttestation,
};
use crate::registry::{AttestationFormat, AttestationFormatVerifier};
use crate::trust::{validate_trust_path, TrustAnchor};
use compact_jwt::{JwsCompact, JwtError};
use openssl::x509;

/// Configuration of a [`SafetyNetVerifier`]. Immutable once the verifier is built.
#[derive(Debug, Clone)]
pub struct SafetyNetConfig {
    anchor: TrustAnchor,
    clock: Arc<dyn Clock>,
    danger_ignore_timestamp: bool,
    timestamp_skew: Duration,
}

impl Default for SafetyNetConfig {
    fn default() -> Self {
        SafetyNetConfig::new(TrustAnchor::android())
    }
}

impl SafetyNetConfig {
    /// A configuration trusting `anchor`, using the wall clock.
    pub fn new(anchor: TrustAnchor) -> Self {
        SafetyNetConfig {
            anchor,
            clock: Arc::new(SystemClock),
            danger_ignore_timestamp: false,
            timestamp_skew: Duration::from_millis(DEFAULT_TIMESTAMP_SKEW_MS),
        }
    }

    /// Replace the time source. This exists for deterministic testing, production
    /// deployments should keep the default wall clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Do not reject responses whose timestamp lies in the future. The certificate
    /// validity window is still enforced.
    pub fn danger_ignore_timestamp(mut self, ignore: bool) -> Self {
        self.danger_ignore_timestamp = ignore;
        self
    }

    /// How far past the current time a response timestamp may be.
    pub fn with_timestamp_skew(mut self, skew: Duration) -> Self {
        self.timestamp_skew = skew;
        self
    }
}

/// Verifies `android-safetynet` attestation statements.
///
/// A verifier holds no mutable state, so one instance may serve any number of
/// concurrent registrations.
#[derive(Debug, Clone, Default)]
pub struct SafetyNetVerifier {
    config: SafetyNetConfig,
}

impl SafetyNetVerifier {
    /// Build a verifier from its configuration.
    pub fn new(config: SafetyNetConfig) -> Self {
        SafetyNetVerifier { config }
    }

    /// Verify an attestation statement for the registration described by `ctx`.
    pub fn verify(
        &self,
        att_stmt: &serde_cbor_2::Value,
        ctx: &AuthenticatorContext<'_>,
    ) -> AttestationResult<VerifiedAttestation> {
        // Every time dependent check in this call uses this one reading.
        let now = self.config.clock.now();

        let statement = SafetyNetStatement::try_from(att_stmt).map_err(|e| {
            error!(detail = %e.detail(), "android-safetynet attStmt rejected");
            e
        })?;

        verify_android_safetynet_attestation(&self.config, &statement, ctx, now)
    }
}

impl AttestationFormatVerifier for SafetyNetVerifier {
    fn format(&self) -> AttestationFormat {
        AttestationFormat::AndroidSafetyNet
    }

    fn verify(
        &self,
        att_stmt: &serde_cbor_2::Value,
        ctx: &AuthenticatorContext<'_>,
    ) -> AttestationResult<VerifiedAttestation> {
        SafetyNetVerifier::verify(self, att_stmt, ctx)
    }
}

/// Run stages 2 to 4 against an extracted statement at time `now`.
pub(crate) fn verify_android_safetynet_attestation(
    config: &SafetyNetConfig,
    statement: &SafetyNetStatement,
    ctx: &AuthenticatorContext<'_>,
    now: SystemTime,
) -> AttestationResult<VerifiedAttestation> {
    trace!(ver = %statement.ver, response = %String::from_utf8_lossy(&statement.response));

    let malformed = |e: AttestationError| {
        error!(detail = %e.detail(), "{} response is not a valid jws", ANDROID_SAFETYNET_FORMAT);
        e
    };

    let jws = parse_signed_response(&statement.response).map_err(malformed)?;

    let fullchain = jws
        .get_x5c_chain()
        .map_err(|e| {
            error!(?e, "safetynet x5c chain could not be decoded");
            AttestationError::untrusted_certificate(format!("invalid x5c chain: {}", e))
                .with_cause(e)
        })?
        .ok_or_else(|| {
            error!("safetynet response carries no x5c chain");
            AttestationError::untrusted_certificate("no x5c chain in response header")
        })?;

    // Verify that the attestation certificate is issued to the pinned hostname, and
    // is valid now.
    let trust_path = validate_trust_path(&config.anchor, &fullchain, now)?;
    let leaf = trust_path.first().ok_or_else(|| {
        AttestationError::untrusted_certificate("validated chain has no leaf certificate")
    })?;
    debug!(leaf = ?leaf.subject_name(), "safetynet certificate chain trusted");

    let response = verify_signed_payload(leaf, &jws)?;

    check_nonce(&response, ctx)?;
    check_integrity(&response)?;
    if !config.danger_ignore_timestamp {
        check_timestamp(&response, now, config.timestamp_skew)?;
    }

    debug!(
        apk_package_name = %response.apk_package_name,
        basic_integrity = response.basic_integrity,
        "android-safetynet attestation verified"
    );

    // If successful, return attestation type Basic with the attestation trust path set
    // to the validated chain.
    Ok(VerifiedAttestation {
        attestation_type: AttestationType::Basic,
        trust_path,
        metadata: SafetyNetMetadata::new(statement.ver.clone(), response),
    })
}

/// Verify the response signature with `leaf`, then decode the payload it covers.
pub(crate) fn verify_signed_payload(
    leaf: &x509::X509Ref,
    jws: &JwsCompact,
) -> AttestationResult<SafetyNetResponse> {
    let released = verify_jws_with_certificate(leaf, jws).map_err(|e| {
        error!(?e, "safetynet response signature does not verify");
        match e {
            // Only reported once the signature has verified.
            JwtError::InvalidBase64 => {
                AttestationError::malformed_payload("payload is not valid base64url")
            }
            _ => AttestationError::signature_invalid(
                "signature does not verify with the attestation certificate",
            ),
        }
        .with_cause(e)
    })?;

    released.from_json().map_err(|e| {
        error!(?e, "safetynet payload could not be decoded");
        AttestationError::malformed_payload(format!("invalid payload: {}", e)).with_cause(e)
    })
}

/// The payload nonce must be exactly `SHA-256(authenticatorData || clientDataHash)`.
pub(crate) fn check_nonce(
    response: &SafetyNetResponse,
    ctx: &AuthenticatorContext<'_>,
) -> AttestationResult<()> {
    let expected = safetynet_nonce(ctx.auth_data_bytes, ctx.client_data_hash);

    if response.nonce.0.as_slice() != expected.as_slice() {
        error!("safetynet nonce does not match this registration");
        return Err(AttestationError::new(
            ErrorKind::NonceMismatch,
            "nonce does not match authenticatorData and clientDataHash",
        ));
    }
    Ok(())
}

/// Only `ctsProfileMatch` gates. `basicIntegrity` is reported in the metadata.
pub(crate) fn check_integrity(response: &SafetyNetResponse) -> AttestationResult<()> {
    if !response.cts_profile_match {
        error!(
            basic_integrity = response.basic_integrity,
            "device does not match CTS profile"
        );
        return Err(AttestationError::new(
            ErrorKind::IntegrityPolicyViolation,
            "does not match CTS profile",
        ));
    }
    Ok(())
}

pub(crate) fn check_timestamp(
    response: &SafetyNetResponse,
    now: SystemTime,
    skew: Duration,
) -> AttestationResult<()> {
    let limit = unix_millis(now) + skew.as_millis();
    if u128::from(response.timestamp_ms) > limit {
        error!(
            timestamp_ms = response.timestamp_ms,
            "safetynet response timestamp is in the future"
        );
        return Err(AttestationError::new(
            ErrorKind::TimestampInvalid,
            format!(
                "response timestamp {} is later than {}",
                response.timestamp_ms, limit
            ),
        ));
    }
    Ok(())
}
