//! # Controller
//!
//! Core controller modules for the serving-cert keystore controller.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `client`: Service/Secret access behind the `SecretStore` trait
//! - `mapper`: Secret to owning Service mapping for secret watches
//! - `reconciler`: Core reconciliation logic
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod client;
pub mod mapper;
pub mod reconciler;
pub mod server;
