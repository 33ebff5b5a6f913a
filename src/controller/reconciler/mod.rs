//! # Reconciler
//!
//! Keeps the PKCS#12 keystore in a Service's serving-cert secret in line with
//! the Service's annotations.
//!
//! - `annotations`: reading the opt-in annotations from a Service
//! - `decision`: create / remove / no-op from flag and secret contents
//! - `synchronize`: fetch, decide, transform and persist for one Service
//!
//! [`reconcile`] is the entry point handed to the kube-runtime `Controller`.

pub mod annotations;
pub mod decision;
pub mod synchronize;

pub use synchronize::{NoOpReason, SyncOutcome, Synchronizer};

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::client::SecretStore;
use crate::keystore::KeystoreError;
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Service;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to get service {namespace}/{name}: {source}")]
    ServiceFetch {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("serving-cert secret {namespace}/{name} does not exist yet")]
    SecretNotFound { namespace: String, name: String },

    #[error("failed to get secret {namespace}/{name}: {source}")]
    SecretFetch {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to build keystore for secret {namespace}/{name}: {source}")]
    Keystore {
        namespace: String,
        name: String,
        #[source]
        source: KeystoreError,
    },

    #[error("failed to update secret {namespace}/{name}: {source}")]
    SecretUpdate {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl ReconcilerError {
    /// Short label used for metrics and log fields
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceFetch { .. } => "service_fetch",
            Self::SecretNotFound { .. } => "secret_not_found",
            Self::SecretFetch { .. } => "secret_fetch",
            Self::Keystore { source, .. } => source.kind(),
            Self::SecretUpdate { .. } => "secret_update",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

/// Shared context for every reconciliation
pub struct Reconciler {
    pub synchronizer: Synchronizer,
    pub config: ControllerConfig,
    // Backoff state per failing resource (identified by namespace/name),
    // removed again on the next successful sync
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("synchronizer", &self.synchronizer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn SecretStore>, config: ControllerConfig) -> Self {
        Self::with_synchronizer(Synchronizer::new(store), config)
    }

    pub fn with_synchronizer(synchronizer: Synchronizer, config: ControllerConfig) -> Self {
        Self {
            synchronizer,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Forget accumulated backoff for `key` after a successful sync
    fn clear_backoff(&self, key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                if let Some(state) = states.remove(key) {
                    debug!(
                        resource.key = key,
                        error_count = state.error_count,
                        "Clearing backoff after successful sync"
                    );
                }
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }

    /// Current error count for `key`, zero when unknown
    #[must_use]
    pub fn error_count(&self, key: &str) -> u32 {
        self.backoff_states
            .lock()
            .ok()
            .and_then(|states| states.get(key).map(|s| s.error_count))
            .unwrap_or(0)
    }
}

/// Resource key used for per-resource state
#[must_use]
pub fn resource_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Reconcile one Service
///
/// Runs a single synchronization. Success waits for the next change to the
/// Service or its secret; failures go to the error policy.
///
/// # Errors
///
/// Returns the synchronizer's error unchanged.
pub async fn reconcile(obj: Arc<Service>, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let name = obj.metadata.name.as_deref().unwrap_or_default();
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let span = tracing::info_span!(
        "controller.reconcile",
        resource.namespace = namespace,
        resource.name = name
    );

    async move {
        metrics::increment_reconciliations();
        let start = std::time::Instant::now();

        let result = ctx.synchronizer.synchronize(namespace, name).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        let outcome = result?;
        metrics::record_outcome(outcome.as_str());
        match outcome {
            SyncOutcome::KeystoreCreated => metrics::increment_keystores_created(),
            SyncOutcome::KeystoreRemoved => metrics::increment_keystores_removed(),
            SyncOutcome::NoOp(_) => {}
        }

        ctx.clear_backoff(&resource_key(namespace, name));
        info!(outcome = %outcome, "Reconciliation complete");

        Ok(Action::await_change())
    }
    .instrument(span)
    .await
}
