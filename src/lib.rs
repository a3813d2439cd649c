//! Crossforge - incremental cross-compilation build orchestrator
//!
//! This library drives a catalog of packages through fetch, patch,
//! configure, build and install against a mingw-w64 cross toolchain, in
//! dependency order, skipping every stage that already succeeded.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Catalog model, build state machine and orchestration
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
