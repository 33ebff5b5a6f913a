//! # Runtime
//!
//! Process wiring around the reconciler.
//!
//! - `initialization`: crypto provider, logging, metrics, HTTP server, client
//! - `watch_loop`: the kube-runtime controller and its restart loop
//! - `error_policy`: retry scheduling and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
