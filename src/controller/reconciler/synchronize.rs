//! # Keystore Synchronizer
//!
//! Brings a Service's serving-cert secret in line with its
//! `serving-cert-create-pkcs12` annotation:
//!
//! 1. Fetch the Service (gone ⇒ nothing to do)
//! 2. Read the secret name annotation (absent ⇒ Service not opted in)
//! 3. Read the create flag (lenient, defaults to `false`)
//! 4. Fetch the secret (absent ⇒ error, the service CA should have created it)
//! 5. Create, remove or leave the keystore fields, then persist
//!
//! No state survives between calls. Every call recomputes the decision from
//! the current Service and Secret, so re-running after a partial failure is safe.
//! Callers must not run two synchronizations for the same Service concurrently.

use super::annotations::ServingCertAnnotations;
use super::decision::{decide, KeystoreAction};
use super::ReconcilerError;
use crate::constants::{TLS_CERT_KEY, TLS_PKCS12_KEY, TLS_PKCS12_PASSWORD_KEY, TLS_PRIVATE_KEY_KEY};
use crate::controller::client::SecretStore;
use crate::keystore::{
    encode_pkcs12, generate_password_with, EntropySource, KeystoreError, SystemEntropy,
};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// `tls.p12` and `tls-pkcs12-password` were written
    KeystoreCreated,
    /// `tls.p12` and `tls-pkcs12-password` were deleted
    KeystoreRemoved,
    /// Nothing was written
    NoOp(NoOpReason),
}

impl SyncOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeystoreCreated => "created",
            Self::KeystoreRemoved => "removed",
            Self::NoOp(NoOpReason::ServiceNotFound) => "service-not-found",
            Self::NoOp(NoOpReason::NotOptedIn) => "not-opted-in",
            Self::NoOp(NoOpReason::AlreadyInSync) => "in-sync",
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a synchronization did not touch the secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// The Service was deleted before we got to it
    ServiceNotFound,
    /// The Service has no serving-cert secret annotation
    NotOptedIn,
    /// The keystore fields already match the create flag
    AlreadyInSync,
}

/// Decision-and-transform logic for one Service at a time
pub struct Synchronizer {
    store: Arc<dyn SecretStore>,
    entropy: Arc<dyn EntropySource>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer").finish_non_exhaustive()
    }
}

impl Synchronizer {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            entropy: Arc::new(SystemEntropy),
        }
    }

    /// Replace the random source used for keystore passwords
    #[must_use]
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Synchronize the keystore for Service `namespace/name`
    ///
    /// # Errors
    ///
    /// Any error leaves the secret untouched in the cluster. Retrying is the
    /// caller's job.
    pub async fn synchronize(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SyncOutcome, ReconcilerError> {
        let Some(service) = self
            .store
            .get_service(namespace, name)
            .await
            .map_err(|source| ReconcilerError::ServiceFetch {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            })?
        else {
            debug!(resource.namespace = namespace, resource.name = name, "Service not found, skipping");
            return Ok(SyncOutcome::NoOp(NoOpReason::ServiceNotFound));
        };

        let annotations = ServingCertAnnotations::from_service(&service);
        let Some(secret_name) = annotations.secret_name else {
            debug!(resource.namespace = namespace, resource.name = name, "Service has no serving-cert secret annotation");
            return Ok(SyncOutcome::NoOp(NoOpReason::NotOptedIn));
        };

        info!(
            resource.namespace = namespace,
            resource.name = name,
            secret.name = secret_name.as_str(),
            create_pkcs12 = annotations.create_pkcs12,
            "Synchronizing serving-cert keystore"
        );

        let mut secret = match self.store.get_secret(namespace, &secret_name).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                return Err(ReconcilerError::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: secret_name,
                })
            }
            Err(source) => {
                return Err(ReconcilerError::SecretFetch {
                    namespace: namespace.to_string(),
                    name: secret_name,
                    source,
                })
            }
        };

        match decide(annotations.create_pkcs12, &secret) {
            KeystoreAction::Create => {
                self.create_keystore(&mut secret)
                    .map_err(|source| ReconcilerError::Keystore {
                        namespace: namespace.to_string(),
                        name: secret_name.clone(),
                        source,
                    })?;
                self.persist(namespace, &secret_name, &secret).await?;
                info!(
                    resource.namespace = namespace,
                    secret.name = secret_name.as_str(),
                    "Keystore created"
                );
                Ok(SyncOutcome::KeystoreCreated)
            }
            KeystoreAction::Remove => {
                remove_keystore(&mut secret);
                self.persist(namespace, &secret_name, &secret).await?;
                info!(
                    resource.namespace = namespace,
                    secret.name = secret_name.as_str(),
                    "Keystore removed"
                );
                Ok(SyncOutcome::KeystoreRemoved)
            }
            KeystoreAction::NoOp => {
                debug!(
                    resource.namespace = namespace,
                    secret.name = secret_name.as_str(),
                    "Keystore already in desired state"
                );
                Ok(SyncOutcome::NoOp(NoOpReason::AlreadyInSync))
            }
        }
    }

    /// Write a fresh password and keystore into the secret's data
    ///
    /// Nothing is written unless both the password and the keystore were produced.
    fn create_keystore(&self, secret: &mut Secret) -> Result<(), KeystoreError> {
        let password = generate_password_with(self.entropy.as_ref())?;

        let keystore = encode_pkcs12(
            field(secret, TLS_CERT_KEY),
            field(secret, TLS_PRIVATE_KEY_KEY),
            &password,
        )?;

        let data = secret.data.get_or_insert_with(BTreeMap::new);
        data.insert(TLS_PKCS12_KEY.to_string(), ByteString(keystore));
        data.insert(
            TLS_PKCS12_PASSWORD_KEY.to_string(),
            ByteString(password.into_bytes()),
        );
        Ok(())
    }

    async fn persist(
        &self,
        namespace: &str,
        secret_name: &str,
        secret: &Secret,
    ) -> Result<(), ReconcilerError> {
        self.store
            .update_secret(secret)
            .await
            .map_err(|source| ReconcilerError::SecretUpdate {
                namespace: namespace.to_string(),
                name: secret_name.to_string(),
                source,
            })
    }
}

/// Bytes of a secret field, empty when the field is missing
fn field<'a>(secret: &'a Secret, key: &str) -> &'a [u8] {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|value| value.0.as_slice())
        .unwrap_or_default()
}

/// Drop both keystore fields from the secret's data
fn remove_keystore(secret: &mut Secret) {
    if let Some(data) = secret.data.as_mut() {
        data.remove(TLS_PKCS12_KEY);
        data.remove(TLS_PKCS12_PASSWORD_KEY);
    }
}
