//! Dispatch of attestation statements to the verifier for their format.
//!
//! The set of supported formats is whatever the caller registers when building an
//! [`AttestationFormatRegistry`]. Nothing is registered implicitly.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{AttestationError, AttestationResult, ErrorKind};
use crate::proto::{AuthenticatorContext, VerifiedAttestation};

/// The attestation statement format identifiers defined by Webauthn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttestationFormat {
    /// Packed attestation
    Packed,
    /// TPM attestation (like Micrsoft)
    Tpm,
    /// Android hardware attestation
    AndroidKey,
    /// Older Android Safety Net
    AndroidSafetyNet,
    /// Old U2F attestation type
    FIDOU2F,
    /// Apple touchID/faceID
    AppleAnonymous,
    /// No attestation
    None,
}

impl AttestationFormat {
    /// The identifier used in the `fmt` field of an attestation object.
    pub fn as_str(self) -> &'static str {
        match self {
            AttestationFormat::Packed => "packed",
            AttestationFormat::Tpm => "tpm",
            AttestationFormat::AndroidKey => "android-key",
            AttestationFormat::AndroidSafetyNet => "android-safetynet",
            AttestationFormat::FIDOU2F => "fido-u2f",
            AttestationFormat::AppleAnonymous => "apple",
            AttestationFormat::None => "none",
        }
    }
}

impl TryFrom<&str> for AttestationFormat {
    type Error = AttestationError;

    fn try_from(a: &str) -> AttestationResult<AttestationFormat> {
        match a {
            "packed" => Ok(AttestationFormat::Packed),
            "tpm" => Ok(AttestationFormat::Tpm),
            "android-key" => Ok(AttestationFormat::AndroidKey),
            "android-safetynet" => Ok(AttestationFormat::AndroidSafetyNet),
            "fido-u2f" => Ok(AttestationFormat::FIDOU2F),
            "apple" => Ok(AttestationFormat::AppleAnonymous),
            "none" => Ok(AttestationFormat::None),
            _ => Err(AttestationError::new(
                ErrorKind::FormatNotSupported,
                format!("unknown attestation format {:?}", a),
            )),
        }
    }
}

/// A verifier for one attestation statement format.
pub trait AttestationFormatVerifier: std::fmt::Debug + Send + Sync {
    /// The format this verifier handles.
    fn format(&self) -> AttestationFormat;

    /// Verify `att_stmt` against the registration described by `ctx`.
    fn verify(
        &self,
        att_stmt: &serde_cbor_2::Value,
        ctx: &AuthenticatorContext<'_>,
    ) -> AttestationResult<VerifiedAttestation>;
}

/// The formats a relying party accepts, and their verifiers.
#[derive(Debug, Clone, Default)]
pub struct AttestationFormatRegistry {
    verifiers: BTreeMap<AttestationFormat, Arc<dyn AttestationFormatVerifier>>,
}

/// Builder for an [`AttestationFormatRegistry`].
#[derive(Debug, Default)]
pub struct AttestationFormatRegistryBuilder {
    verifiers: BTreeMap<AttestationFormat, Arc<dyn AttestationFormatVerifier>>,
}

impl AttestationFormatRegistryBuilder {
    /// Register `verifier` for its format, replacing any earlier verifier of that format.
    pub fn register<V>(mut self, verifier: V) -> Self
    where
        V: AttestationFormatVerifier + 'static,
    {
        let fmt = verifier.format();
        if self.verifiers.insert(fmt, Arc::new(verifier)).is_some() {
            warn!(attestation_format = fmt.as_str(), "attestation format verifier replaced");
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> AttestationFormatRegistry {
        AttestationFormatRegistry {
            verifiers: self.verifiers,
        }
    }
}

impl AttestationFormatRegistry {
    /// Start building a registry with no formats.
    pub fn builder() -> AttestationFormatRegistryBuilder {
        AttestationFormatRegistryBuilder::default()
    }

    /// The registered formats, in a stable order.
    pub fn formats(&self) -> impl Iterator<Item = AttestationFormat> + '_ {
        self.verifiers.keys().copied()
    }

    /// The verifier registered for `fmt`.
    pub fn get(&self, fmt: AttestationFormat) -> Option<&dyn AttestationFormatVerifier> {
        self.verifiers.get(&fmt).map(|v| v.as_ref())
    }

    /// Verify an attestation statement with the verifier registered for `fmt`.
    pub fn verify(
        &self,
        fmt: &str,
        att_stmt: &serde_cbor_2::Value,
        ctx: &AuthenticatorContext<'_>,
    ) -> AttestationResult<VerifiedAttestation> {
        let format = AttestationFormat::try_from(fmt)?;
        let verifier = self.get(format).ok_or_else(|| {
            AttestationError::new(
                ErrorKind::FormatNotSupported,
                format!("no verifier registered for {}", format.as_str()),
            )
        })?;

        debug!(attestation_format = format.as_str(), "dispatching attestation statement");
        verifier.verify(att_stmt, ctx)
    }
}
