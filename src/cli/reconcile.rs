//! # Reconcile Command
//!
//! Runs one synchronization for a Service from the operator's machine, using
//! the same code path as the controller.

use anyhow::{Context, Result};
use kube::Client;
use serving_cert_keystore_controller::constants::DEFAULT_FIELD_MANAGER;
use serving_cert_keystore_controller::controller::client::KubeSecretStore;
use serving_cert_keystore_controller::controller::reconciler::{NoOpReason, SyncOutcome, Synchronizer};
use std::sync::Arc;

/// Synchronize the keystore of `ns/service` once and print the outcome
///
/// Do not run this against a Service the controller is reconciling at the same
/// moment; a conflicting write fails with a 409 and can simply be retried.
pub async fn reconcile_command(client: Client, service: &str, ns: &str) -> Result<()> {
    println!("🔄 Synchronizing keystore for Service '{ns}/{service}'...");

    let store = Arc::new(KubeSecretStore::new(
        client,
        format!("{DEFAULT_FIELD_MANAGER}-cli"),
    ));
    let outcome = Synchronizer::new(store)
        .synchronize(ns, service)
        .await
        .with_context(|| format!("Failed to synchronize keystore for Service '{ns}/{service}'"))?;

    println!("{}", describe_outcome(outcome));
    Ok(())
}

fn describe_outcome(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::KeystoreCreated => "✅ Keystore created",
        SyncOutcome::KeystoreRemoved => "✅ Keystore removed",
        SyncOutcome::NoOp(NoOpReason::AlreadyInSync) => "✅ Keystore already in sync",
        SyncOutcome::NoOp(NoOpReason::NotOptedIn) => {
            "ℹ️  Service has no serving-cert secret annotation, nothing to do"
        }
        SyncOutcome::NoOp(NoOpReason::ServiceNotFound) => "⚠️  Service not found",
    }
}
