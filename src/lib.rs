//! # Serving Cert Keystore Controller
//!
//! A Kubernetes controller that keeps a PKCS#12 keystore next to the PEM
//! certificate and key the OpenShift service CA writes into a Service's
//! serving-cert secret.
//!
//! A Service opts in with two annotations:
//!
//! ```yaml
//! metadata:
//!   annotations:
//!     service.alpha.openshift.io/serving-cert-secret-name: svc-a-tls
//!     ykoer.github.com/serving-cert-create-pkcs12: "true"
//! ```
//!
//! The controller then adds `tls.p12` and `tls-pkcs12-password` to `svc-a-tls`
//! and removes them again when the flag is turned off.
//!
//! ## Modules
//!
//! - `config`: environment-driven settings
//! - `constants`: annotation keys, secret field names and defaults
//! - `controller`: reconciler, cluster client, backoff and HTTP server
//! - `keystore`: password generation and PKCS#12 encoding
//! - `observability`: metrics and logging
//! - `runtime`: process startup and the watch loop

pub mod config;
pub mod constants;
pub mod controller;
pub mod keystore;
pub mod observability;
pub mod runtime;
