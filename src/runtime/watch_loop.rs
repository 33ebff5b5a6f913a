//! # Watch Loop
//!
//! Controller watch loop that monitors Services (and, optionally, their
//! serving-cert Secrets) and triggers reconciliation when changes are detected.
//!
//! kube-runtime never runs two reconciliations for the same object at once and
//! coalesces events that arrive while one is in flight, so each Service is
//! synchronized by at most one worker at a time.

use crate::config::ControllerConfig;
use crate::controller::mapper::services_for_secret;
use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::runtime::error_policy::{handle_controller_stream_error, handle_reconciliation_error};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Secret, Service};
use kube::api::Api;
use kube::Client;
use kube_runtime::{controller, watcher, Controller};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Initial delay for 429 backoff on the watch stream (milliseconds)
const WATCH_BACKOFF_START_MS: u64 = 500;

/// Services API scoped to the configured namespace
pub fn services_api(client: Client, config: &ControllerConfig) -> Api<Service> {
    match config.watch_namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Secrets API scoped to the configured namespace
pub fn secrets_api(client: Client, config: &ControllerConfig) -> Api<Secret> {
    match config.watch_namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Run the controller watch loop
///
/// Marks the server ready, then restarts the controller stream whenever it
/// ends until a shutdown signal arrives. Readiness is withdrawn on shutdown.
///
/// # Errors
///
/// Currently never fails; the `Result` leaves room for startup checks.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let config = reconciler.config.clone();
    let max_backoff_ms = config.backoff_max_secs.saturating_mul(1000);
    let backoff_duration_ms = Arc::new(AtomicU64::new(WATCH_BACKOFF_START_MS));

    let shutdown_requested = Arc::new(AtomicBool::new(false));

    server_state.set_ready(true);
    info!("Controller starting, marked server as ready");

    let shutdown_flag = Arc::clone(&shutdown_requested);
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_flag.store(true, Ordering::Relaxed);
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if shutdown_requested.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop",
            namespace = config.watch_namespace.as_deref().unwrap_or("*"),
            watch_secrets = config.watch_secrets
        );
        let _watch_guard = watch_span.enter();

        info!("Starting controller watch loop...");

        let mut service_controller = Controller::new(
            services_api(client.clone(), &config),
            watcher::Config::default().any_semantic(),
        )
        .with_config(
            controller::Config::default().concurrency(config.max_concurrent_reconciliations),
        );

        if config.watch_secrets {
            service_controller = service_controller.watches(
                secrets_api(client.clone(), &config),
                watcher::Config::default(),
                |secret| services_for_secret(&secret),
            );
        }

        let backoff = Arc::clone(&backoff_duration_ms);
        let restart_delay = config.watch_restart_delay_duration();
        service_controller
            .shutdown_on_signal()
            .run(reconcile, handle_reconciliation_error, Arc::clone(&reconciler))
            .filter_map(move |x| {
                let backoff = Arc::clone(&backoff);
                async move {
                    match &x {
                        Ok((object, _action)) => {
                            backoff.store(WATCH_BACKOFF_START_MS, Ordering::Relaxed);
                            debug!(resource = %object, "watch.event.success");
                            Some(x)
                        }
                        Err(e) => {
                            let forward = handle_controller_stream_error(
                                e,
                                &backoff,
                                max_backoff_ms,
                                restart_delay,
                            )
                            .await;
                            forward.map(|()| x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .await;

        if shutdown_requested.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay_after_end_duration();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Resolves on SIGINT or, on Unix, SIGTERM (sent by the kubelet)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
