//! # Secret to Service Mapping
//!
//! Maps a changed serving-cert secret back to the Service(s) that own it so the
//! controller re-evaluates them. Without this a user deleting `tls.p12` by hand
//! would only be repaired on the next Service change.

use crate::constants::ORIGINATING_SERVICE_NAME_ANNOTATION;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube_runtime::reflector::ObjectRef;

/// Services to enqueue when `secret` changes
///
/// Looks at the service CA's originating-service annotation and at owner
/// references of kind `Service`. Duplicates are dropped, order is preserved.
#[must_use]
pub fn services_for_secret(secret: &Secret) -> Vec<ObjectRef<Service>> {
    let Some(namespace) = secret.metadata.namespace.as_deref() else {
        return Vec::new();
    };

    let annotated = secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ORIGINATING_SERVICE_NAME_ANNOTATION))
        .filter(|name| !name.is_empty())
        .map(String::as_str);

    let owners = secret
        .metadata
        .owner_references
        .iter()
        .flatten()
        .filter(|owner| owner.kind == "Service" && owner.api_version == "v1")
        .map(|owner| owner.name.as_str());

    let mut names: Vec<&str> = Vec::new();
    for name in annotated.into_iter().chain(owners) {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    names
        .into_iter()
        .map(|name| ObjectRef::new(name).within(namespace))
        .collect()
}
