//! # Logging
//!
//! Tracing subscriber setup. `RUST_LOG` wins when set, otherwise `LOG_LEVEL`
//! applies to this crate only.

use crate::config::ControllerConfig;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
#[must_use]
pub fn default_filter(log_level: &str) -> String {
    let level = match log_level.trim().to_ascii_lowercase().as_str() {
        level @ ("error" | "warn" | "info" | "debug" | "trace") => level.to_string(),
        _ => "info".to_string(),
    };
    format!("serving_cert_keystore_controller={level}")
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &ControllerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_logs() {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_uses_configured_level() {
        assert_eq!(default_filter("DEBUG"), "serving_cert_keystore_controller=debug");
        assert_eq!(default_filter("warn"), "serving_cert_keystore_controller=warn");
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        assert_eq!(default_filter("loud"), "serving_cert_keystore_controller=info");
    }
}
