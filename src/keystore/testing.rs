//! Certificate fixtures shared by unit tests, integration tests and the CLI tests.

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};

/// Self-signed certificate and PKCS#1 RSA key, both PEM encoded, shaped like
/// the material the service CA writes into `tls.crt` / `tls.key`.
///
/// # Errors
///
/// Returns the OpenSSL error stack if key generation or signing fails.
pub fn self_signed_pair(common_name: &str, serial: u32) -> Result<(Vec<u8>, Vec<u8>), ErrorStack> {
    let rsa = Rsa::generate(2048)?;
    let key_pem = rsa.private_key_to_pem()?;
    let pkey = PKey::from_rsa(rsa)?;

    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_text("CN", common_name)?;
    let name = name.build();

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    let serial = BigNum::from_u32(serial)?.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;
    builder.set_subject_name(&name)?;
    builder.set_issuer_name(&name)?;
    builder.set_pubkey(&pkey)?;
    builder.set_not_before(&*Asn1Time::days_from_now(0)?)?;
    builder.set_not_after(&*Asn1Time::days_from_now(365)?)?;
    builder.sign(&pkey, MessageDigest::sha256())?;

    Ok((builder.build().to_pem()?, key_pem))
}
