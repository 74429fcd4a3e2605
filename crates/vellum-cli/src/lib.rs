//! Command-line front end for the Vellum gateway
//!
//! The binary is a thin layer: it loads settings, installs logging, wires a
//! filesystem store and file-backed allowlist into the gateway, and renders
//! results.

pub mod config;
pub mod output;

pub use config::{Cli, Command, Settings};
