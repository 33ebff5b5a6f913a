//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// HTTP port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Restrict the controller to one namespace; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Also trigger reconciliation when a serving-cert secret changes
    pub watch_secrets: bool,
    /// Maximum number of services reconciled at the same time
    pub max_concurrent_reconciliations: u16,
    /// First retry delay after a failed reconciliation (seconds)
    pub backoff_min_secs: u64,
    /// Upper bound for retry delays (seconds)
    pub backoff_max_secs: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after the stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Field manager recorded on secret updates
    pub field_manager: String,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE), used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            watch_namespace: None,
            watch_secrets: true,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            metrics_port: parsed_or(&lookup, "METRICS_PORT", defaults.metrics_port),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            watch_secrets: bool_or(&lookup, "WATCH_SECRETS", defaults.watch_secrets),
            max_concurrent_reconciliations: parsed_or(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            backoff_min_secs: parsed_or(&lookup, "BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: parsed_or(&lookup, "BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            watch_restart_delay_secs: parsed_or(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            watch_restart_delay_after_end_secs: parsed_or(
                &lookup,
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                defaults.watch_restart_delay_after_end_secs,
            ),
            field_manager: lookup("FIELD_MANAGER").unwrap_or(defaults.field_manager),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").unwrap_or(defaults.log_format),
        }
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }

    /// Whether logs should be emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

fn parsed_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn bool_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|v| {
            let v_lower = v.trim().to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}
