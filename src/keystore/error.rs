//! # Keystore Errors

use thiserror::Error;

/// Errors raised while generating passwords or building/reading PKCS#12 keystores
///
/// None of these are retried internally. Parse errors mean the input material in
/// the secret is missing or malformed and no keystore must be written.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// `tls.crt` is missing, is not PEM, or does not hold an X.509 certificate
    #[error("failed to parse certificate: {0}")]
    CertificateParse(String),

    /// `tls.key` is missing, is not PEM, or does not hold an RSA private key
    #[error("failed to parse private key: {0}")]
    KeyParse(String),

    /// The cryptographic random source could not produce bytes
    #[error("random source unavailable: {0}")]
    RandomSource(String),

    /// Certificate and key parsed but the PKCS#12 structure could not be built
    #[error("failed to assemble PKCS#12 keystore: {0}")]
    Encode(#[source] openssl::error::ErrorStack),

    /// Keystore bytes could not be decoded (corrupt data or wrong passphrase)
    #[error("failed to decode PKCS#12 keystore: {0}")]
    Decode(String),
}

impl KeystoreError {
    /// Short machine-friendly label, used for metrics and structured logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CertificateParse(_) => "certificate_parse",
            Self::KeyParse(_) => "key_parse",
            Self::RandomSource(_) => "random_source",
            Self::Encode(_) => "encode",
            Self::Decode(_) => "decode",
        }
    }
}
