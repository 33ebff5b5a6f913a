//! # Cluster Client
//!
//! The three cluster operations the synchronizer needs, behind a trait so the
//! decision logic can run against an in-memory store in tests.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::{Api, PostParams};
use kube::Client;

#[cfg(test)]
use mockall::automock;

/// Read/update access to Services and their serving-cert Secrets
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a Service; `Ok(None)` when it does not exist
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, kube::Error>;

    /// Fetch a Secret; `Ok(None)` when it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error>;

    /// Replace a Secret with the given object
    ///
    /// The object carries the `resourceVersion` it was read with, so a concurrent
    /// writer makes this fail with a 409 conflict rather than being overwritten.
    async fn update_secret(&self, secret: &Secret) -> Result<(), kube::Error>;
}

/// [`SecretStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, kube::Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn update_secret(&self, secret: &Secret) -> Result<(), kube::Error> {
        let namespace = secret.metadata.namespace.as_deref().unwrap_or("default");
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let params = PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        };
        api.replace(name, &params, secret).await?;
        Ok(())
    }
}
