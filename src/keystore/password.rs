//! # Password Generator
//!
//! Produces the passphrase protecting a generated keystore: 16 bytes from a
//! cryptographically secure source, base-32 encoded without padding. The
//! result is 26 characters from `A-Z2-7`, safe for file names, URLs and
//! environment variables.

use crate::constants::PASSWORD_ENTROPY_BYTES;
use crate::keystore::KeystoreError;
use data_encoding::BASE32_NOPAD;
use zeroize::Zeroizing;

/// Source of cryptographically secure random bytes
///
/// Implementations must either fill the whole buffer or return an error.
/// They must never hand back a partially filled or predictable buffer.
pub trait EntropySource: Send + Sync {
    /// Fill `buf` completely with random bytes
    fn fill(&self, buf: &mut [u8]) -> Result<(), KeystoreError>;
}

/// OpenSSL's CSPRNG (`RAND_bytes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), KeystoreError> {
        openssl::rand::rand_bytes(buf).map_err(|e| KeystoreError::RandomSource(e.to_string()))
    }
}

/// Generate a keystore password from the system CSPRNG
pub fn generate_password() -> Result<String, KeystoreError> {
    generate_password_with(&SystemEntropy)
}

/// Generate a keystore password from the given entropy source
pub fn generate_password_with(source: &dyn EntropySource) -> Result<String, KeystoreError> {
    let mut entropy = Zeroizing::new([0u8; PASSWORD_ENTROPY_BYTES]);
    source.fill(entropy.as_mut_slice())?;
    Ok(BASE32_NOPAD.encode(entropy.as_slice()))
}
