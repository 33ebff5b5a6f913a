//! # Keystore Decision
//!
//! Pure mapping from (desired flag, current secret data) to the action to take.

use crate::constants::{TLS_PKCS12_KEY, TLS_PKCS12_PASSWORD_KEY};
use k8s_openapi::api::core::v1::Secret;

/// What the synchronizer should do to a serving-cert secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreAction {
    /// Generate a password, encode the keystore, write both fields
    Create,
    /// Delete both keystore fields
    Remove,
    /// Secret already matches the annotation
    NoOp,
}

/// Presence of the derived keystore fields in a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreState {
    /// Both `tls.p12` and `tls-pkcs12-password` hold data
    Present,
    /// Neither field holds data
    Absent,
    /// Exactly one field holds data (hand-edited secret)
    Partial,
}

/// Inspect which keystore fields a secret currently carries
#[must_use]
pub fn keystore_state(secret: &Secret) -> KeystoreState {
    let has = |key: &str| {
        secret
            .data
            .as_ref()
            .and_then(|data| data.get(key))
            .is_some_and(|value| !value.0.is_empty())
    };

    match (has(TLS_PKCS12_KEY), has(TLS_PKCS12_PASSWORD_KEY)) {
        (true, true) => KeystoreState::Present,
        (false, false) => KeystoreState::Absent,
        _ => KeystoreState::Partial,
    }
}

/// Decide how to bring `secret` in line with the requested keystore state
///
/// A partial keystore is never left alone: it is rebuilt when a keystore is
/// wanted and cleared otherwise, so the two fields always travel together.
#[must_use]
pub fn decide(create_pkcs12: bool, secret: &Secret) -> KeystoreAction {
    match (create_pkcs12, keystore_state(secret)) {
        (true, KeystoreState::Present) | (false, KeystoreState::Absent) => KeystoreAction::NoOp,
        (true, KeystoreState::Absent | KeystoreState::Partial) => KeystoreAction::Create,
        (false, KeystoreState::Present | KeystoreState::Partial) => KeystoreAction::Remove,
    }
}
