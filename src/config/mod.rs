//! # Configuration
//!
//! Environment-driven settings for the controller process.

mod controller;

pub use controller::ControllerConfig;
