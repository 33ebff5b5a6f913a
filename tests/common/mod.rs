//! Common test utilities for integration tests
//!
//! Provides an in-memory `SecretStore`, Service/Secret builders and runtime
//! generated certificate fixtures.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use serving_cert_keystore_controller::constants::{
    SERVING_CERT_CREATE_PKCS12_ANNOTATION, SERVING_CERT_SECRET_ANNOTATION, TLS_CERT_KEY,
    TLS_PKCS12_KEY, TLS_PKCS12_PASSWORD_KEY, TLS_PRIVATE_KEY_KEY,
};
use serving_cert_keystore_controller::controller::client::SecretStore;
use serving_cert_keystore_controller::keystore::testing;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

type Key = (String, String);

/// In-memory cluster holding Services and Secrets
#[derive(Debug, Default)]
pub struct InMemoryStore {
    services: Mutex<HashMap<Key, Service>>,
    secrets: Mutex<HashMap<Key, Secret>>,
    updates: AtomicUsize,
    fail_updates: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_service(&self, service: Service) {
        let key = key_of(&service.metadata);
        self.services.lock().unwrap().insert(key, service);
    }

    pub fn remove_service(&self, namespace: &str, name: &str) {
        self.services
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn put_secret(&self, secret: Secret) {
        let key = key_of(&secret.metadata);
        self.secrets.lock().unwrap().insert(key, secret);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Secret {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .expect("secret should exist")
    }

    /// Number of successful `update_secret` calls
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make every following `update_secret` fail
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Change the create flag on a stored Service
    pub fn set_create_flag(&self, namespace: &str, name: &str, value: &str) {
        let mut services = self.services.lock().unwrap();
        let service = services
            .get_mut(&(namespace.to_string(), name.to_string()))
            .expect("service should exist");
        service
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(
                SERVING_CERT_CREATE_PKCS12_ANNOTATION.to_string(),
                value.to_string(),
            );
    }
}

#[async_trait]
impl SecretStore for InMemoryStore {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, kube::Error> {
        Ok(self
            .services
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn update_secret(&self, secret: &Secret) -> Result<(), kube::Error> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(kube::Error::Service(Box::new(std::io::Error::other(
                "injected update failure",
            ))));
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.put_secret(secret.clone());
        Ok(())
    }
}

fn key_of(metadata: &ObjectMeta) -> Key {
    (
        metadata.namespace.clone().expect("namespace"),
        metadata.name.clone().expect("name"),
    )
}

/// Service with the given annotations
pub fn service(namespace: &str, name: &str, annotations: &[(&str, &str)]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            ..ObjectMeta::default()
        },
        ..Service::default()
    }
}

/// Service opted in to keystore management for `secret`
pub fn opted_in_service(namespace: &str, name: &str, secret: &str, create: &str) -> Service {
    service(
        namespace,
        name,
        &[
            (SERVING_CERT_SECRET_ANNOTATION, secret),
            (SERVING_CERT_CREATE_PKCS12_ANNOTATION, create),
        ],
    )
}

/// Secret with the given data fields
pub fn secret(namespace: &str, name: &str, fields: &[(&str, &[u8])]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.to_vec())))
                .collect(),
        ),
        ..Secret::default()
    }
}

/// Serving-cert secret as the service CA writes it, with a fresh key pair
pub fn serving_cert_secret(namespace: &str, name: &str, common_name: &str, serial: u32) -> Secret {
    let (cert, key) = self_signed_pair(common_name, serial);
    secret(
        namespace,
        name,
        &[(TLS_CERT_KEY, &cert), (TLS_PRIVATE_KEY_KEY, &key)],
    )
}

/// Bytes of a secret field, if present
pub fn field(secret: &Secret, key: &str) -> Option<Vec<u8>> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| value.0.clone())
}

/// Whether both keystore fields are present, or both absent; panics on a half bundle
pub fn keystore_present(secret: &Secret) -> bool {
    let p12 = field(secret, TLS_PKCS12_KEY).is_some_and(|v| !v.is_empty());
    let password = field(secret, TLS_PKCS12_PASSWORD_KEY).is_some_and(|v| !v.is_empty());
    assert_eq!(
        p12, password,
        "tls.p12 and tls-pkcs12-password must be present together"
    );
    p12
}

/// Self-signed certificate and PKCS#1 RSA key, PEM encoded
pub fn self_signed_pair(common_name: &str, serial: u32) -> (Vec<u8>, Vec<u8>) {
    testing::self_signed_pair(common_name, serial).unwrap()
}
