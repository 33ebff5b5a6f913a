//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Annotation keys and secret field names are part of the external contract
//! with the OpenShift service CA and with workloads that mount the secret, so
//! they must not change. The remaining values are defaults that can be
//! overridden via environment variables (see [`crate::config::ControllerConfig`]).

/// Annotation on a Service naming the secret that holds its serving certificate.
/// Set by users; the OpenShift service CA populates the named secret.
pub const SERVING_CERT_SECRET_ANNOTATION: &str =
    "service.alpha.openshift.io/serving-cert-secret-name";

/// Annotation on a Service requesting a PKCS#12 keystore next to the serving certificate
pub const SERVING_CERT_CREATE_PKCS12_ANNOTATION: &str =
    "ykoer.github.com/serving-cert-create-pkcs12";

/// Annotation the service CA puts on serving-cert secrets pointing back at the Service
pub const ORIGINATING_SERVICE_NAME_ANNOTATION: &str =
    "service.alpha.openshift.io/originating-service-name";

/// PEM certificate written by the service CA (input)
pub const TLS_CERT_KEY: &str = "tls.crt";

/// PEM RSA private key written by the service CA (input)
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// PKCS#12 keystore derived by this controller (output)
pub const TLS_PKCS12_KEY: &str = "tls.p12";

/// Keystore passphrase derived by this controller (output)
pub const TLS_PKCS12_PASSWORD_KEY: &str = "tls-pkcs12-password";

/// Number of random bytes behind each generated keystore password
pub const PASSWORD_ENTROPY_BYTES: usize = 16;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default field manager recorded on secret updates
pub const DEFAULT_FIELD_MANAGER: &str = "serving-cert-keystore-controller";

/// Default maximum number of services reconciled at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default minimum error backoff (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum error backoff (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
