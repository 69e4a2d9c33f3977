//! Webauthn-rs SafetyNet - Android SafetyNet attestation verification
//!
//! During credential registration an Android authenticator may present an
//! `android-safetynet` attestation statement. This library decides whether that
//! statement was produced by a genuine, CTS compliant device, and whether it is bound
//! to the registration in progress.
//!
//! Build a [`SafetyNetVerifier`] from a [`SafetyNetConfig`], and either call it
//! directly or register it in an [`AttestationFormatRegistry`] alongside other
//! formats.
//!
//! ```no_run
//! use webauthn_rs_safetynet::{
//!     AttestationFormatRegistry, AuthenticatorContext, SafetyNetConfig, SafetyNetVerifier,
//!     TrustAnchor,
//! };
//!
//! # fn example(att_stmt: &serde_cbor_2::Value, auth_data: &[u8], client_data_hash: &[u8]) {
//! let registry = AttestationFormatRegistry::builder()
//!     .register(SafetyNetVerifier::new(SafetyNetConfig::new(TrustAnchor::android())))
//!     .build();
//!
//! let ctx = AuthenticatorContext::new(auth_data, client_data_hash);
//! match registry.verify("android-safetynet", att_stmt, &ctx) {
//!     Ok(verified) => println!("trusted: {:?}", verified.metadata),
//!     Err(e) => println!("rejected: {} ({:?})", e, e.kind()),
//! }
//! # }
//! ```

#![deny(warnings)]
#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
// #![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

pub mod attestation;
pub mod clock;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod jws;
pub mod proto;
pub mod registry;
pub mod trust;

#[cfg(test)]
mod testing;

pub use crate::attestation::{SafetyNetConfig, SafetyNetVerifier};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::error::{AttestationError, AttestationResult, ErrorKind};
pub use crate::proto::{
    AttestationType, AuthenticatorContext, SafetyNetMetadata, SafetyNetResponse,
    SafetyNetStatement, VerifiedAttestation,
};
pub use crate::registry::{
    AttestationFormat, AttestationFormatRegistry, AttestationFormatRegistryBuilder,
    AttestationFormatVerifier,
};
pub use crate::trust::{SerialisableTrustAnchor, TrustAnchor, TrustRoots};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_verifiers_are_shareable() {
        assert_send_sync::<SafetyNetVerifier>();
        assert_send_sync::<AttestationFormatRegistry>();
        assert_send_sync::<TrustAnchor>();
        assert_send_sync::<AttestationError>();
    }
}
