//! # Synchronizer Integration Tests
//!
//! Drives `Synchronizer` against an in-memory cluster through the public API.
//!
//! These tests verify:
//! - Create / remove / no-op decisions and what gets written
//! - Idempotence (a second run never writes)
//! - `tls.p12` and `tls-pkcs12-password` always travel together
//! - Failures leave the stored secret untouched

mod common;

use common::*;
use serving_cert_keystore_controller::constants::{
    TLS_CERT_KEY, TLS_PKCS12_KEY, TLS_PKCS12_PASSWORD_KEY, TLS_PRIVATE_KEY_KEY,
};
use serving_cert_keystore_controller::controller::reconciler::{
    NoOpReason, ReconcilerError, SyncOutcome, Synchronizer,
};
use serving_cert_keystore_controller::keystore::{inspect_pkcs12, EntropySource, KeystoreError};
use std::sync::Arc;

const NS: &str = "default";

fn synchronizer(store: &Arc<InMemoryStore>) -> Synchronizer {
    let store: Arc<InMemoryStore> = Arc::clone(store);
    Synchronizer::new(store)
}

fn stored_password(store: &InMemoryStore, secret: &str) -> String {
    String::from_utf8(field(&store.secret(NS, secret), TLS_PKCS12_PASSWORD_KEY).unwrap()).unwrap()
}

#[tokio::test]
async fn test_opted_in_service_gets_a_decodable_keystore() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1001));

    let outcome = synchronizer(&store).synchronize(NS, "svc-a").await.unwrap();

    assert_eq!(outcome, SyncOutcome::KeystoreCreated);
    assert_eq!(store.update_count(), 1);

    let secret = store.secret(NS, "svc-a-tls");
    assert!(keystore_present(&secret));
    let password = stored_password(&store, "svc-a-tls");
    assert_eq!(password.len(), 26);
    assert!(password
        .chars()
        .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));

    let contents = inspect_pkcs12(&field(&secret, TLS_PKCS12_KEY).unwrap(), &password).unwrap();
    assert_eq!(contents.subject_common_name.as_deref(), Some("svc-a.default.svc"));
    assert_eq!(contents.serial_number, "1001");
    assert!(contents.has_private_key);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));
    let sync = synchronizer(&store);

    sync.synchronize(NS, "svc-a").await.unwrap();
    let first = store.secret(NS, "svc-a-tls");

    let outcome = sync.synchronize(NS, "svc-a").await.unwrap();

    assert_eq!(outcome, SyncOutcome::NoOp(NoOpReason::AlreadyInSync));
    assert_eq!(store.update_count(), 1);
    assert_eq!(store.secret(NS, "svc-a-tls"), first);
}

#[tokio::test]
async fn test_turning_the_flag_off_removes_the_keystore() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));
    let sync = synchronizer(&store);
    sync.synchronize(NS, "svc-a").await.unwrap();
    let original = store.secret(NS, "svc-a-tls");

    store.set_create_flag(NS, "svc-a", "false");
    let outcome = sync.synchronize(NS, "svc-a").await.unwrap();

    assert_eq!(outcome, SyncOutcome::KeystoreRemoved);
    let secret = store.secret(NS, "svc-a-tls");
    assert!(!keystore_present(&secret));
    assert_eq!(field(&secret, TLS_CERT_KEY), field(&original, TLS_CERT_KEY));
    assert_eq!(
        field(&secret, TLS_PRIVATE_KEY_KEY),
        field(&original, TLS_PRIVATE_KEY_KEY)
    );

    // Nothing left to remove
    assert_eq!(
        sync.synchronize(NS, "svc-a").await.unwrap(),
        SyncOutcome::NoOp(NoOpReason::AlreadyInSync)
    );
    assert_eq!(store.update_count(), 2);
}

#[tokio::test]
async fn test_turning_the_flag_back_on_issues_a_new_password() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));
    let sync = synchronizer(&store);

    sync.synchronize(NS, "svc-a").await.unwrap();
    let first_password = stored_password(&store, "svc-a-tls");

    store.set_create_flag(NS, "svc-a", "false");
    sync.synchronize(NS, "svc-a").await.unwrap();
    store.set_create_flag(NS, "svc-a", "true");
    assert_eq!(
        sync.synchronize(NS, "svc-a").await.unwrap(),
        SyncOutcome::KeystoreCreated
    );

    assert_ne!(stored_password(&store, "svc-a-tls"), first_password);
}

#[tokio::test]
async fn test_keystore_fields_stay_paired_across_flag_changes() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "false"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));
    let sync = synchronizer(&store);

    for flag in ["true", "true", "false", "1", "garbage", "T", "0", "TRUE", "False"] {
        store.set_create_flag(NS, "svc-a", flag);
        sync.synchronize(NS, "svc-a").await.unwrap();

        let expected = matches!(flag, "true" | "1" | "T" | "TRUE");
        assert_eq!(
            keystore_present(&store.secret(NS, "svc-a-tls")),
            expected,
            "flag {flag:?}"
        );
    }
}

#[tokio::test]
async fn test_half_keystore_is_repaired() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    let (cert, key) = self_signed_pair("svc-a.default.svc", 1);
    store.put_secret(secret(
        NS,
        "svc-a-tls",
        &[
            (TLS_CERT_KEY, &cert),
            (TLS_PRIVATE_KEY_KEY, &key),
            (TLS_PKCS12_PASSWORD_KEY, b"ORPHANEDPASSWORD"),
        ],
    ));

    let outcome = synchronizer(&store).synchronize(NS, "svc-a").await.unwrap();

    assert_eq!(outcome, SyncOutcome::KeystoreCreated);
    let secret = store.secret(NS, "svc-a-tls");
    assert!(keystore_present(&secret));
    let password = stored_password(&store, "svc-a-tls");
    assert_ne!(password, "ORPHANEDPASSWORD");
    inspect_pkcs12(&field(&secret, TLS_PKCS12_KEY).unwrap(), &password).unwrap();
}

#[tokio::test]
async fn test_unannotated_service_is_ignored() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(service(NS, "svc-b", &[("app", "web")]));

    let outcome = synchronizer(&store).synchronize(NS, "svc-b").await.unwrap();

    assert_eq!(outcome, SyncOutcome::NoOp(NoOpReason::NotOptedIn));
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_deleted_service_is_ignored() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.remove_service(NS, "svc-a");

    let outcome = synchronizer(&store).synchronize(NS, "svc-a").await.unwrap();

    assert_eq!(outcome, SyncOutcome::NoOp(NoOpReason::ServiceNotFound));
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_missing_secret_is_an_error() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));

    let err = synchronizer(&store).synchronize(NS, "svc-a").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcilerError::SecretNotFound { ref name, .. } if name == "svc-a-tls"
    ));
}

#[tokio::test]
async fn test_unparseable_flag_means_false() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "yes"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));

    let outcome = synchronizer(&store).synchronize(NS, "svc-a").await.unwrap();

    assert_eq!(outcome, SyncOutcome::NoOp(NoOpReason::AlreadyInSync));
    assert!(!keystore_present(&store.secret(NS, "svc-a-tls")));
}

#[tokio::test]
async fn test_malformed_certificate_leaves_secret_untouched() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    let (_, key) = self_signed_pair("svc-a.default.svc", 1);
    store.put_secret(secret(
        NS,
        "svc-a-tls",
        &[(TLS_CERT_KEY, b"not a certificate"), (TLS_PRIVATE_KEY_KEY, &key)],
    ));
    let before = store.secret(NS, "svc-a-tls");

    let err = synchronizer(&store).synchronize(NS, "svc-a").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcilerError::Keystore {
            source: KeystoreError::CertificateParse(_),
            ..
        }
    ));
    assert_eq!(store.update_count(), 0);
    assert_eq!(store.secret(NS, "svc-a-tls"), before);
}

#[tokio::test]
async fn test_failed_update_is_retried_from_scratch() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));
    let sync = synchronizer(&store);

    store.fail_updates(true);
    let err = sync.synchronize(NS, "svc-a").await.unwrap_err();
    assert_eq!(err.kind(), "secret_update");
    assert!(!keystore_present(&store.secret(NS, "svc-a-tls")));

    store.fail_updates(false);
    assert_eq!(
        sync.synchronize(NS, "svc-a").await.unwrap(),
        SyncOutcome::KeystoreCreated
    );
    assert!(keystore_present(&store.secret(NS, "svc-a-tls")));
}

struct BrokenEntropy;

impl EntropySource for BrokenEntropy {
    fn fill(&self, _buf: &mut [u8]) -> Result<(), KeystoreError> {
        Err(KeystoreError::RandomSource("entropy pool unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_random_source_failure_writes_nothing() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service(NS, "svc-a", "svc-a-tls", "true"));
    store.put_secret(serving_cert_secret(NS, "svc-a-tls", "svc-a.default.svc", 1));

    let err = synchronizer(&store)
        .with_entropy(Arc::new(BrokenEntropy))
        .synchronize(NS, "svc-a")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "random_source");
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_services_in_other_namespaces_are_independent() {
    let store = Arc::new(InMemoryStore::new());
    store.put_service(opted_in_service("team-a", "api", "api-tls", "true"));
    store.put_secret(serving_cert_secret("team-a", "api-tls", "api.team-a.svc", 1));
    store.put_service(opted_in_service("team-b", "api", "api-tls", "false"));
    store.put_secret(serving_cert_secret("team-b", "api-tls", "api.team-b.svc", 2));
    let sync = synchronizer(&store);

    sync.synchronize("team-a", "api").await.unwrap();
    sync.synchronize("team-b", "api").await.unwrap();

    assert!(keystore_present(&store.secret("team-a", "api-tls")));
    assert!(!keystore_present(&store.secret("team-b", "api-tls")));
}
