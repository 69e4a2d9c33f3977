//! The trust anchor a SafetyNet certificate chain must validate against, and the chain
//! validation itself.

use crate::clock::unix_secs;
use crate::constants::ANDROID_SAFETYNET_HOSTNAME;
use crate::error::{AttestationError, AttestationResult};
use base64urlsafedata::Base64UrlSafeData;
use openssl::error::ErrorStack as OpenSSLErrorStack;
use openssl::stack;
use openssl::x509::{self, store, verify, X509PurposeId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::SystemTime;

/// Where trusted root certificates come from.
#[derive(Debug, Clone)]
pub enum TrustRoots {
    /// The platform trust store, as configured for OpenSSL.
    System,
    /// Only these certificates are trusted.
    Pinned(Vec<x509::X509>),
}

/// The identity and roots a SafetyNet attestation certificate must chain to.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    hostname: String,
    roots: TrustRoots,
}

impl TrustAnchor {
    /// The production anchor: certificates issued to `attest.android.com`, chaining to
    /// the system trust store.
    pub fn android() -> Self {
        TrustAnchor {
            hostname: ANDROID_SAFETYNET_HOSTNAME.to_string(),
            roots: TrustRoots::System,
        }
    }

    /// An anchor pinned to `hostname` and the supplied root certificates.
    pub fn pinned(hostname: impl Into<String>, roots: Vec<x509::X509>) -> Self {
        TrustAnchor {
            hostname: hostname.into(),
            roots: TrustRoots::Pinned(roots),
        }
    }

    /// The hostname the leaf certificate must be issued to.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The trusted roots.
    pub fn roots(&self) -> &TrustRoots {
        &self.roots
    }

    fn store_builder(&self) -> Result<store::X509StoreBuilder, OpenSSLErrorStack> {
        let mut ca_store = store::X509StoreBuilder::new()?;

        match &self.roots {
            TrustRoots::System => ca_store.set_default_paths()?,
            TrustRoots::Pinned(roots) => {
                for ca_crt in roots.iter() {
                    ca_store.add_cert(ca_crt.clone())?;
                }
            }
        }

        Ok(ca_store)
    }

    // The leaf must be issued to the pinned host for TLS server use, as an HTTPS
    // certificate for that host would be.
    fn verify_param(&self, now: SystemTime) -> AttestationResult<verify::X509VerifyParam> {
        let openssl_err = |e: OpenSSLErrorStack| {
            AttestationError::untrusted_certificate("unable to set verification parameters")
                .with_cause(e)
        };

        let time = unix_secs(now).try_into().map_err(|e| {
            AttestationError::untrusted_certificate(format!(
                "verification time {:?} is out of range",
                now
            ))
            .with_cause(e)
        })?;

        let mut param = verify::X509VerifyParam::new().map_err(openssl_err)?;
        param.set_host(&self.hostname).map_err(openssl_err)?;
        param
            .set_purpose(X509PurposeId::SSL_SERVER)
            .map_err(openssl_err)?;
        param.set_time(time);
        Ok(param)
    }
}

impl Default for TrustAnchor {
    fn default() -> Self {
        Self::android()
    }
}

/// The serialised form of a [`TrustAnchor`]. Absent roots mean the system trust store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialisableTrustAnchor {
    hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    roots: Option<Vec<Base64UrlSafeData>>,
}

impl TryFrom<SerialisableTrustAnchor> for TrustAnchor {
    type Error = OpenSSLErrorStack;

    fn try_from(data: SerialisableTrustAnchor) -> Result<Self, Self::Error> {
        let roots = match data.roots {
            None => TrustRoots::System,
            Some(ders) => TrustRoots::Pinned(
                ders.iter()
                    .map(|der| x509::X509::from_der(der.as_ref()))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(TrustAnchor {
            hostname: data.hostname,
            roots,
        })
    }
}

impl TryFrom<&TrustAnchor> for SerialisableTrustAnchor {
    type Error = OpenSSLErrorStack;

    fn try_from(anchor: &TrustAnchor) -> Result<Self, Self::Error> {
        let roots = match &anchor.roots {
            TrustRoots::System => None,
            TrustRoots::Pinned(roots) => Some(
                roots
                    .iter()
                    .map(|crt| crt.to_der().map(Base64UrlSafeData))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };

        Ok(SerialisableTrustAnchor {
            hostname: anchor.hostname.clone(),
            roots,
        })
    }
}

impl Serialize for TrustAnchor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SerialisableTrustAnchor::try_from(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TrustAnchor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = SerialisableTrustAnchor::deserialize(deserializer)?;
        TrustAnchor::try_from(data).map_err(serde::de::Error::custom)
    }
}

/// Validate the x5c chain of a signed response against `anchor` at time `now`. The
/// first certificate of `fullchain` is the leaf, the rest are offered as untrusted
/// intermediates.
///
/// On success, returns the validated chain from the leaf to the trust root. The first
/// element is the leaf certificate.
pub fn validate_trust_path(
    anchor: &TrustAnchor,
    fullchain: &[x509::X509],
    now: SystemTime,
) -> AttestationResult<Vec<x509::X509>> {
    for crt in fullchain.iter() {
        debug!(subject = ?crt.subject_name(), "x5c certificate");
    }

    let (leaf, chain) = fullchain
        .split_first()
        .ok_or_else(|| AttestationError::untrusted_certificate("no certificates in x5c"))?;

    let openssl_err = |e: OpenSSLErrorStack| {
        error!(?e, "openssl error during chain validation");
        AttestationError::untrusted_certificate("unable to validate certificate chain")
            .with_cause(e)
    };

    // Convert the chain to a stackref so that openssl can use it.
    let mut chain_stack = stack::Stack::new().map_err(openssl_err)?;
    for crt in chain.iter() {
        chain_stack.push(crt.clone()).map_err(openssl_err)?;
    }

    let ca_store = {
        let mut ca_store = anchor.store_builder().map_err(openssl_err)?;
        let param = anchor.verify_param(now)?;
        ca_store.set_param(&param).map_err(openssl_err)?;
        ca_store.build()
    };

    let mut ca_ctx = x509::X509StoreContext::new().map_err(openssl_err)?;

    let res: Result<Vec<x509::X509>, x509::X509VerifyResult> = ca_ctx
        .init(&ca_store, leaf, &chain_stack, |ca_ctx_ref| {
            ca_ctx_ref.verify_cert().map(|verified| {
                let res = ca_ctx_ref.error();
                if verified && res == x509::X509VerifyResult::OK {
                    Ok(ca_ctx_ref
                        .chain()
                        .map(|chain| chain.iter().map(|crt| crt.to_owned()).collect())
                        .unwrap_or_default())
                } else {
                    debug!(
                        "ca_ctx_ref verify cert - error depth={}, sn={:?}",
                        ca_ctx_ref.error_depth(),
                        ca_ctx_ref.current_cert().map(|crt| crt.subject_name())
                    );
                    Err(res)
                }
            })
        })
        .map_err(openssl_err)?;

    match res {
        Ok(validated) if !validated.is_empty() => Ok(validated),
        Ok(_) => Err(AttestationError::untrusted_certificate(
            "certificate chain validated but is empty",
        )),
        Err(res) => {
            error!(%res, hostname = %anchor.hostname, "certificate chain not trusted");
            Err(
                AttestationError::untrusted_certificate(format!("chain not trusted: {}", res))
                    .with_cause(res),
            )
        }
    }
}
