//! # Keystore
//!
//! Password generation and PKCS#12 encoding for serving-cert secrets.
//!
//! Everything here is synchronous and free of Kubernetes types; the reconciler
//! feeds it raw secret field bytes.

mod error;
mod password;
mod pkcs12;

#[doc(hidden)]
pub mod testing;

pub use error::KeystoreError;
pub use password::{generate_password, generate_password_with, EntropySource, SystemEntropy};
pub use pkcs12::{encode_pkcs12, inspect_pkcs12, KeystoreContents};
