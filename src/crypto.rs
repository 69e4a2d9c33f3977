//! Cryptographic operation wrappers for attestation verification. This module exists to
//! allow ease of auditing, and currently uses OpenSSL as the primitive provider.

use compact_jwt::crypto::JwsX509Verifier;
use compact_jwt::traits::JwsVerifiable;
use compact_jwt::{JwaAlg, Jws, JwsCompact, JwsEs256Verifier, JwsVerifier, JwtError};
use openssl::{nid, x509};

/// The nonce a SafetyNet response must carry for this registration:
/// `SHA-256(authenticatorData || clientDataHash)`.
pub fn safetynet_nonce(auth_data_bytes: &[u8], client_data_hash: &[u8]) -> [u8; 32] {
    let mut hasher = openssl::sha::Sha256::new();
    hasher.update(auth_data_bytes);
    hasher.update(client_data_hash);
    hasher.finish()
}

/// Verify the signature of `jws` with the public key of `leaf`, and release the payload
/// it covers. The key type and curve of `leaf` must suit the algorithm of `jws`.
pub fn verify_jws_with_certificate(
    leaf: &x509::X509Ref,
    jws: &JwsCompact,
) -> Result<Jws, JwtError> {
    let openssl_err = |e: openssl::error::ErrorStack| {
        debug!(?e, "openssl error preparing signature verification");
        JwtError::OpenSSLError
    };

    match jws.alg() {
        JwaAlg::RS256 => JwsX509Verifier::from_x509(leaf.to_owned())?.verify(jws),
        JwaAlg::ES256 => {
            let pkey = leaf.public_key().map_err(openssl_err)?;
            let curve = pkey
                .ec_key()
                .ok()
                .and_then(|ec_key| ec_key.group().curve_name());
            if curve != Some(nid::Nid::X9_62_PRIME256V1) {
                debug!(key_type = ?pkey.id(), ?curve, "certificate key is not a P-256 key");
                return Err(JwtError::ValidatorAlgMismatch);
            }

            let der = pkey.public_key_to_der().map_err(openssl_err)?;
            JwsEs256Verifier::from_es256_der(&der)?.verify(jws)
        }
        alg => {
            debug!(?alg, "algorithm cannot be verified with a certificate");
            Err(JwtError::ValidatorAlgMismatch)
        }
    }
}
