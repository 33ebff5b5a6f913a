//! # Serving Cert Keystore Controller
//!
//! Controller binary. See the library documentation for behaviour and the
//! README for deployment.

use anyhow::Result;
use serving_cert_keystore_controller::runtime::{initialization, watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;

    watch_loop::run_watch_loop(init.client, init.reconciler, init.server_state).await?;

    info!("Controller stopped");
    Ok(())
}
