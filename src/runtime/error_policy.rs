//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//!
//! Reconcile failures are retried per resource by [`handle_reconciliation_error`].
//! The controller stream also reports them, but only watcher failures are
//! classified and slowed down here: sleeping on a reconcile failure would stall
//! every other Service, since kube-runtime only makes progress while the
//! stream is polled.

use crate::controller::reconciler::{resource_key, BackoffState, Reconciler, ReconcilerError};
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Service;
use kube_runtime::controller::{self, Action};
use kube_runtime::watcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Error type yielded by the Service controller stream
pub type ControllerStreamError = controller::Error<ReconcilerError, watcher::Error>;

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one broken Service does not slow
/// down retries for the others.
pub fn handle_reconciliation_error(
    obj: Arc<Service>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error.kind = error.kind()
    );
    let _error_guard = error_span.enter();

    error!(error = %error, "Reconciliation failed");
    metrics::increment_reconciliation_errors(error.kind());

    let key = resource_key(namespace, name);
    let (backoff_seconds, error_count) = next_backoff(&ctx, &key);

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        backoff_seconds,
        error_count,
        next_retry = next_trigger_time.to_rfc3339(),
        "Retrying with Fibonacci backoff"
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Advance the backoff for `key`, returning the delay and the error count
fn next_backoff(ctx: &Reconciler, key: &str) -> (u64, u32) {
    match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(key.to_string()).or_insert_with(|| {
                BackoffState::new(ctx.config.backoff_min_secs, ctx.config.backoff_max_secs)
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!(
                "Failed to lock backoff_states: {}, using maximum backoff",
                e
            );
            (ctx.config.backoff_max_secs, 0)
        }
    }
}

/// Kind of watch stream failure, decided from the error text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    TooManyRequests,
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify an error's debug rendering
    ///
    /// 404 is checked before 401 because a plain-text 404 body produces a
    /// serde error that also mentions `WatchFailed`.
    #[must_use]
    pub fn classify(error_string: &str) -> Self {
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        let is_401 = error_string.contains("401") || error_string.contains("Unauthorized");
        let is_410 = error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone");
        let is_429 = error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests");

        if is_401 && !is_not_found {
            Self::Unauthorized
        } else if is_410 {
            Self::Expired
        } else if is_429 {
            Self::TooManyRequests
        } else if is_not_found {
            Self::NotFound
        } else {
            Self::Other
        }
    }
}

/// Handle an error yielded by the controller stream
///
/// Reconcile failures and vanished objects pass straight through; their retry
/// is already scheduled by the error policy. Watcher failures are classified
/// and may delay the stream.
///
/// Returns `Some(())` when the event should be forwarded downstream, `None` to
/// drop it.
pub async fn handle_controller_stream_error(
    error: &ControllerStreamError,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> Option<()> {
    match error {
        controller::Error::ReconcilerFailed(err, object) => {
            debug!(
                resource = %object,
                error.kind = err.kind(),
                "Reconcile failed, retry scheduled by error policy"
            );
            Some(())
        }
        controller::Error::ObjectNotFound(object) => {
            debug!(resource = %object, "Object left the cache before it was reconciled");
            Some(())
        }
        controller::Error::QueueError(err) => {
            handle_watch_stream_error(
                &format!("{err:?}"),
                backoff,
                max_backoff_ms,
                watch_restart_delay,
            )
            .await
        }
        controller::Error::RunnerError(err) => {
            error!("Controller runner error: {:?}", err);
            None
        }
    }
}

/// Classify a watcher failure and back off accordingly
///
/// Returns `Some(())` when the event should be forwarded downstream, `None` to
/// drop it. The watcher recovers by itself in both cases.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match WatchErrorKind::classify(error_string) {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
            );
            error!("Verify the controller ServiceAccount can still list/watch services and secrets:");
            error!(
                "  kubectl auth can-i watch services --as=system:serviceaccount:<namespace>:serving-cert-keystore-controller"
            );
            error!(
                "  kubectl auth can-i update secrets --as=system:serviceaccount:<namespace>:serving-cert-keystore-controller"
            );
            warn!(
                "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "Watch resource version expired, watch will restart");
            None
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
            None
        }
        WatchErrorKind::NotFound => {
            warn!("Watched object not found (404): {}", error_string);
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Watch stream error: {}", error_string);
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
    }
}
