//! Test fixtures: a throwaway PKI and a SafetyNet "service" that signs responses with it.
#![allow(clippy::unwrap_used)]

use crate::clock::FixedClock;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::{RsaPssSaltlen, Signer};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509NameBuilder, X509Ref, X509};
use serde_json::json;

pub(crate) const NOT_BEFORE: i64 = 1_600_000_000;
pub(crate) const NOT_AFTER: i64 = 1_900_000_000;
pub(crate) const NOW: u64 = 1_700_000_000;

pub(crate) fn clock() -> FixedClock {
    FixedClock::from_unix(NOW)
}

pub(crate) struct KeyedCert {
    pub key: PKey<Private>,
    pub cert: X509,
}

/// The extended key usage a leaf certificate is issued with.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Eku {
    ServerAuth,
    ClientAuth,
}

fn ec_key_on(curve: Nid) -> PKey<Private> {
    let group = EcGroup::from_curve_name(curve).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn ec_key() -> PKey<Private> {
    ec_key_on(Nid::X9_62_PRIME256V1)
}

fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

#[allow(clippy::too_many_arguments)]
fn build_cert(
    key: &PKey<Private>,
    cn: &str,
    issuer: Option<&KeyedCert>,
    is_ca: bool,
    dns: Option<&str>,
    eku: Option<Eku>,
    validity: (i64, i64),
    serial: u32,
) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("C", "AU").unwrap();
    name.append_entry_by_text("O", "Webauthn RS SafetyNet Test").unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    // Yes, 2 actually means 3 here ...
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(serial)
        .and_then(|s| s.to_asn1_integer())
        .unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder
        .set_issuer_name(issuer.map(|i| i.cert.subject_name()).unwrap_or(&*name))
        .unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(validity.0 as _).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(validity.1 as _).unwrap())
        .unwrap();

    if is_ca {
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .key_cert_sign()
                    .crl_sign()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    } else {
        builder
            .append_extension(BasicConstraints::new().build().unwrap())
            .unwrap();
        builder
            .append_extension(
                KeyUsage::new()
                    .critical()
                    .digital_signature()
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    if let Some(eku) = eku {
        let mut usage = ExtendedKeyUsage::new();
        match eku {
            Eku::ServerAuth => usage.server_auth(),
            Eku::ClientAuth => usage.client_auth(),
        };
        builder.append_extension(usage.build().unwrap()).unwrap();
    }

    let issuer_cert: Option<&X509Ref> = issuer.map(|i| &*i.cert);
    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(issuer_cert, None))
        .unwrap();
    builder.append_extension(ski).unwrap();

    if issuer.is_some() {
        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .issuer(false)
            .build(&builder.x509v3_context(issuer_cert, None))
            .unwrap();
        builder.append_extension(aki).unwrap();
    }

    if let Some(dns) = dns {
        let san = SubjectAlternativeName::new()
            .dns(dns)
            .build(&builder.x509v3_context(issuer_cert, None))
            .unwrap();
        builder.append_extension(san).unwrap();
    }

    let signing_key = issuer.map(|i| &i.key).unwrap_or(key);
    builder.sign(signing_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// A root, an intermediate, and leaves issued under them.
pub(crate) struct Pki {
    pub root: KeyedCert,
    pub intermediate: KeyedCert,
}

impl Pki {
    pub fn new() -> Self {
        Self::with_validity((NOT_BEFORE, NOT_AFTER))
    }

    pub fn with_validity(validity: (i64, i64)) -> Self {
        let root_key = ec_key();
        let root_cert = build_cert(
            &root_key,
            "SafetyNet Test Root",
            None,
            true,
            None,
            None,
            validity,
            1,
        );
        let root = KeyedCert {
            key: root_key,
            cert: root_cert,
        };

        let int_key = ec_key();
        let int_cert = build_cert(
            &int_key,
            "SafetyNet Test Intermediate",
            Some(&root),
            true,
            None,
            None,
            validity,
            2,
        );
        let intermediate = KeyedCert {
            key: int_key,
            cert: int_cert,
        };

        Pki { root, intermediate }
    }

    /// An RSA leaf for `hostname`, valid over the default window.
    pub fn leaf(&self, hostname: &str) -> KeyedCert {
        self.leaf_with_validity(hostname, (NOT_BEFORE, NOT_AFTER))
    }

    pub fn leaf_with_validity(&self, hostname: &str, validity: (i64, i64)) -> KeyedCert {
        self.issue(rsa_key(), hostname, None, validity, 3)
    }

    /// An RSA leaf for `hostname` restricted to one extended key usage.
    pub fn leaf_with_eku(&self, hostname: &str, eku: Eku) -> KeyedCert {
        self.issue(rsa_key(), hostname, Some(eku), (NOT_BEFORE, NOT_AFTER), 5)
    }

    /// An EC P-256 leaf for `hostname`.
    pub fn ec_leaf(&self, hostname: &str) -> KeyedCert {
        self.ec_leaf_on(hostname, Nid::X9_62_PRIME256V1)
    }

    /// An EC leaf for `hostname` on `curve`.
    pub fn ec_leaf_on(&self, hostname: &str, curve: Nid) -> KeyedCert {
        self.issue(ec_key_on(curve), hostname, None, (NOT_BEFORE, NOT_AFTER), 4)
    }

    fn issue(
        &self,
        key: PKey<Private>,
        hostname: &str,
        eku: Option<Eku>,
        validity: (i64, i64),
        serial: u32,
    ) -> KeyedCert {
        let cert = build_cert(
            &key,
            hostname,
            Some(&self.intermediate),
            false,
            Some(hostname),
            eku,
            validity,
            serial,
        );
        KeyedCert { key, cert }
    }
}

/// Produce a raw JWS signature over `data` for the JWS algorithm name `alg`.
pub(crate) fn sign_jws(key: &PKey<Private>, alg: &str, data: &[u8]) -> Vec<u8> {
    let md = match &alg[2..] {
        "384" => MessageDigest::sha384(),
        "512" => MessageDigest::sha512(),
        _ => MessageDigest::sha256(),
    };
    let mut signer = Signer::new(md, key).unwrap();
    if alg.starts_with("PS") {
        signer.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
        signer
            .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
            .unwrap();
        signer.set_rsa_mgf1_md(md).unwrap();
    }
    signer.update(data).unwrap();
    let sig = signer.sign_to_vec().unwrap();

    if !alg.starts_with("ES") {
        return sig;
    }

    let coord_len = match &alg[2..] {
        "384" => 48,
        "512" => 66,
        _ => 32,
    };
    let sig = openssl::ecdsa::EcdsaSig::from_der(&sig).unwrap();
    let mut raw = sig.r().to_vec_padded(coord_len).unwrap();
    raw.extend(sig.s().to_vec_padded(coord_len).unwrap());
    raw
}

fn b64url(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// A compact JWS over `payload`, signed by `signer`, advertising `chain` in x5c.
pub(crate) fn compact_jws(
    signer: &PKey<Private>,
    alg: &str,
    chain: &[&X509Ref],
    payload: &serde_json::Value,
) -> Vec<u8> {
    let x5c: Vec<String> = chain
        .iter()
        .map(|c| base64::encode(c.to_der().unwrap()))
        .collect();
    let header = json!({ "alg": alg, "x5c": x5c });
    let header = b64url(header.to_string().as_bytes());
    let payload = b64url(payload.to_string().as_bytes());
    let signing_input = format!("{}.{}", header, payload);
    let sig = sign_jws(signer, alg, signing_input.as_bytes());
    format!("{}.{}", signing_input, b64url(&sig)).into_bytes()
}

/// A SafetyNet payload as the service would produce it for `nonce`.
pub(crate) fn payload(nonce: &[u8], cts_profile_match: bool) -> serde_json::Value {
    json!({
        "nonce": base64::encode(nonce),
        "timestampMs": NOW * 1000 - 5_000,
        "apkPackageName": "com.google.android.gms",
        "apkDigestSha256": base64::encode([0x11u8; 32]),
        "ctsProfileMatch": cts_profile_match,
        "apkCertificateDigestSha256": [base64::encode([0x22u8; 32])],
        "basicIntegrity": true,
        "evaluationType": "BASIC"
    })
}

/// An attStmt map as produced by an authenticator.
pub(crate) fn att_stmt(ver: &str, response: Vec<u8>) -> serde_cbor_2::Value {
    use serde_cbor_2::Value;
    let mut map = std::collections::BTreeMap::new();
    map.insert(Value::Text("ver".to_string()), Value::Text(ver.to_string()));
    map.insert(Value::Text("response".to_string()), Value::Bytes(response));
    Value::Map(map)
}
