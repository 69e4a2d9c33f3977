//! Identifiers and defaults shared by the SafetyNet verifier.

/// The attestation statement format identifier for Android SafetyNet.
pub const ANDROID_SAFETYNET_FORMAT: &str = "android-safetynet";

/// The hostname the SafetyNet attestation certificate must be issued to.
pub const ANDROID_SAFETYNET_HOSTNAME: &str = "attest.android.com";

// attStmt field names
pub(crate) const ATT_STMT_VER: &str = "ver";
pub(crate) const ATT_STMT_RESPONSE: &str = "response";

/// How far into the future a response timestamp may lie before it is rejected.
pub const DEFAULT_TIMESTAMP_SKEW_MS: u64 = 60_000;
