//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::controller::client::KubeSecretStore;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_listening", &self.server_state.listening())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
///
/// # Errors
///
/// Fails when any of the steps above fails; the process should exit.
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before any rustls client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|existing| {
            anyhow::anyhow!("Failed to install rustls crypto provider, one is already set: {existing:?}")
        })?;

    let config = ControllerConfig::from_env();

    observability::logging::init_tracing(&config)?;

    info!("Starting Serving Cert Keystore Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(config = ?config, "Loaded controller configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());

    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_listening(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let store = Arc::new(KubeSecretStore::new(
        client.clone(),
        config.field_manager.clone(),
    ));
    let reconciler = Arc::new(Reconciler::new(store, config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to bind its port
async fn wait_for_server_listening(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    use crate::constants::{DEFAULT_SERVER_POLL_INTERVAL_MS, DEFAULT_SERVER_STARTUP_TIMEOUT_SECS};

    let startup_timeout = Duration::from_secs(DEFAULT_SERVER_STARTUP_TIMEOUT_SECS);
    let poll_interval = Duration::from_millis(DEFAULT_SERVER_POLL_INTERVAL_MS);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.listening() {
            info!("HTTP server is accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to bind within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}
