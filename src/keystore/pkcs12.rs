//! # PKCS#12 Encoder
//!
//! Turns the PEM certificate and PEM RSA private key written by the service CA
//! into a password protected PKCS#12 keystore, and reads such keystores back.
//!
//! The keystore holds exactly one key entry: the private key and the leaf
//! certificate. No CA chain is included. Salts and IVs come from OpenSSL's
//! CSPRNG, so two encodings of the same input never produce the same bytes;
//! only decodability with the same passphrase is guaranteed.

use crate::keystore::KeystoreError;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Ref, X509};
use serde::Serialize;

/// Build a PKCS#12 keystore from a PEM certificate and a PEM RSA private key
///
/// # Errors
///
/// - [`KeystoreError::CertificateParse`] if `cert_pem` has no PEM block or the
///   block is not a DER X.509 certificate
/// - [`KeystoreError::KeyParse`] if `key_pem` has no PEM block or the block is
///   not an RSA private key (PKCS#1, or PKCS#8 wrapping RSA)
/// - [`KeystoreError::Encode`] if the keystore cannot be assembled, e.g. when
///   the key does not belong to the certificate
pub fn encode_pkcs12(
    cert_pem: &[u8],
    key_pem: &[u8],
    passphrase: &str,
) -> Result<Vec<u8>, KeystoreError> {
    let certificate = parse_certificate(cert_pem)?;
    let private_key = parse_private_key(key_pem)?;

    let keystore = Pkcs12::builder()
        .pkey(&private_key)
        .cert(&certificate)
        .build2(passphrase)
        .map_err(KeystoreError::Encode)?;

    keystore.to_der().map_err(KeystoreError::Encode)
}

fn parse_certificate(cert_pem: &[u8]) -> Result<X509, KeystoreError> {
    if cert_pem.iter().all(u8::is_ascii_whitespace) {
        return Err(KeystoreError::CertificateParse(
            "no PEM data found".to_string(),
        ));
    }
    X509::from_pem(cert_pem).map_err(|e| KeystoreError::CertificateParse(e.to_string()))
}

fn parse_private_key(key_pem: &[u8]) -> Result<PKey<Private>, KeystoreError> {
    if key_pem.iter().all(u8::is_ascii_whitespace) {
        return Err(KeystoreError::KeyParse("no PEM data found".to_string()));
    }
    let rsa = Rsa::private_key_from_pem(key_pem)
        .map_err(|e| KeystoreError::KeyParse(e.to_string()))?;
    PKey::from_rsa(rsa).map_err(|e| KeystoreError::KeyParse(e.to_string()))
}

/// What a decoded keystore contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystoreContents {
    /// Subject common name of the leaf certificate, if it has one
    pub subject_common_name: Option<String>,
    /// Leaf certificate serial number in decimal
    pub serial_number: String,
    /// Whether a private key entry is present
    pub has_private_key: bool,
    /// Number of additional CA certificates
    pub ca_certificates: usize,
}

/// Decode a PKCS#12 keystore with its passphrase and describe its contents
///
/// # Errors
///
/// [`KeystoreError::Decode`] if the bytes are not a PKCS#12 structure, the
/// passphrase is wrong, or the keystore has no certificate.
pub fn inspect_pkcs12(keystore: &[u8], passphrase: &str) -> Result<KeystoreContents, KeystoreError> {
    let parsed = Pkcs12::from_der(keystore)
        .and_then(|p12| p12.parse2(passphrase))
        .map_err(|e| KeystoreError::Decode(e.to_string()))?;

    let certificate = parsed
        .cert
        .ok_or_else(|| KeystoreError::Decode("keystore holds no certificate".to_string()))?;

    Ok(KeystoreContents {
        subject_common_name: common_name(&certificate),
        serial_number: serial_number(&certificate)?,
        has_private_key: parsed.pkey.is_some(),
        ca_certificates: parsed.ca.map_or(0, |ca| ca.len()),
    })
}

fn common_name(certificate: &X509Ref) -> Option<String> {
    certificate
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().to_string().ok())
}

fn serial_number(certificate: &X509Ref) -> Result<String, KeystoreError> {
    certificate
        .serial_number()
        .to_bn()
        .and_then(|bn| bn.to_dec_str())
        .map(|serial| serial.to_string())
        .map_err(|e| KeystoreError::Decode(e.to_string()))
}
