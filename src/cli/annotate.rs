//! # Enable / Disable Commands
//!
//! Merge-patch the opt-in annotations on a Service. The controller picks the
//! change up from its Service watch.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Service;
use kube::{
    api::{Api, Patch, PatchParams},
    Client,
};
use serde_json::{json, Value};
use serving_cert_keystore_controller::constants::{
    SERVING_CERT_CREATE_PKCS12_ANNOTATION, SERVING_CERT_SECRET_ANNOTATION,
};

/// Set the secret name and turn the keystore flag on
pub async fn enable_command(client: Client, service: &str, ns: &str, secret: &str) -> Result<()> {
    patch_annotations(client, service, ns, enable_patch(secret)).await?;

    println!("✅ Keystore enabled for Service '{ns}/{service}'");
    println!("   {SERVING_CERT_SECRET_ANNOTATION}={secret}");
    println!("   {SERVING_CERT_CREATE_PKCS12_ANNOTATION}=true");
    Ok(())
}

/// Turn the keystore flag off; the controller then removes the keystore
pub async fn disable_command(client: Client, service: &str, ns: &str) -> Result<()> {
    patch_annotations(client, service, ns, disable_patch()).await?;

    println!("✅ Keystore disabled for Service '{ns}/{service}'");
    println!("   {SERVING_CERT_CREATE_PKCS12_ANNOTATION}=false");
    Ok(())
}

async fn patch_annotations(client: Client, service: &str, ns: &str, patch: Value) -> Result<()> {
    let api: Api<Service> = Api::namespaced(client, ns);
    api.patch(service, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to annotate Service '{ns}/{service}'"))?;
    Ok(())
}

fn enable_patch(secret: &str) -> Value {
    json!({
        "metadata": {
            "annotations": {
                SERVING_CERT_SECRET_ANNOTATION: secret,
                SERVING_CERT_CREATE_PKCS12_ANNOTATION: "true"
            }
        }
    })
}

fn disable_patch() -> Value {
    json!({
        "metadata": {
            "annotations": {
                SERVING_CERT_CREATE_PKCS12_ANNOTATION: "false"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_patch_sets_both_annotations() {
        let patch = enable_patch("svc-a-tls");
        let annotations = &patch["metadata"]["annotations"];
        assert_eq!(annotations[SERVING_CERT_SECRET_ANNOTATION], "svc-a-tls");
        assert_eq!(annotations[SERVING_CERT_CREATE_PKCS12_ANNOTATION], "true");
    }

    #[test]
    fn test_disable_patch_keeps_secret_name() {
        let patch = disable_patch();
        let annotations = patch["metadata"]["annotations"]
            .as_object()
            .unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[SERVING_CERT_CREATE_PKCS12_ANNOTATION], "false");
    }
}
