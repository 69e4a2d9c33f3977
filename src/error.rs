//! Possible errors that may occur during attestation verification.

use std::fmt;

/// The boxed underlying cause carried by an [`AttestationError`].
pub type ErrorCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A wrapper type for attestation results.
pub type AttestationResult<T> = core::result::Result<T, AttestationError>;

/// The stable classification of an attestation failure. Callers should match on this
/// rather than on the diagnostic text of the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required attestation statement field was missing or of the wrong type.
    MalformedStatement,
    /// The signed response could not be parsed, or did not carry exactly one signature.
    MalformedSignature,
    /// The embedded certificate chain failed identity, time or root validation.
    UntrustedCertificate,
    /// The signature over the response did not verify with the leaf certificate key.
    SignatureInvalid,
    /// The verified payload could not be decoded.
    MalformedPayload,
    /// The payload nonce does not match the registration transaction.
    NonceMismatch,
    /// The device did not pass the integrity policy.
    IntegrityPolicyViolation,
    /// The payload timestamp lies in the future relative to the verification clock.
    TimestampInvalid,
    /// No verifier is registered for the requested attestation format.
    FormatNotSupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::MalformedStatement => "malformed attestation statement",
            ErrorKind::MalformedSignature => "malformed signed response",
            ErrorKind::UntrustedCertificate => "untrusted attestation certificate",
            ErrorKind::SignatureInvalid => "invalid response signature",
            ErrorKind::MalformedPayload => "malformed response payload",
            ErrorKind::NonceMismatch => "nonce mismatch",
            ErrorKind::IntegrityPolicyViolation => "device integrity policy violation",
            ErrorKind::TimestampInvalid => "invalid response timestamp",
            ErrorKind::FormatNotSupported => "attestation format not supported",
        };
        f.write_str(s)
    }
}

/// An attestation verification failure.
///
/// The `detail` text is for diagnostics only and is not a stable interface.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct AttestationError {
    kind: ErrorKind,
    detail: String,
    #[source]
    source: Option<ErrorCause>,
}

impl AttestationError {
    /// Create a new error of `kind` with a diagnostic message.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        AttestationError {
            kind,
            detail: detail.into(),
            source: None,
        }
    }

    /// Attach the underlying library error that caused this failure.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(cause));
        self
    }

    /// The stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Free-form diagnostic detail.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The wrapped underlying error, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub(crate) fn malformed_statement(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedStatement, detail)
    }

    pub(crate) fn malformed_signature(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedSignature, detail)
    }

    pub(crate) fn untrusted_certificate(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UntrustedCertificate, detail)
    }

    pub(crate) fn signature_invalid(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureInvalid, detail)
    }

    pub(crate) fn malformed_payload(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedPayload, detail)
    }
}

impl PartialEq<ErrorKind> for AttestationError {
    fn eq(&self, other: &ErrorKind) -> bool {
        self.kind == *other
    }
}
