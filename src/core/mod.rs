//! Core orchestration logic
//!
//! Catalog model, build context and the build state machine. Side effects
//! go through the seams in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`recipe`] - Catalog (catalog.toml) document
//! - [`catalog`] - Validated nodes
//! - [`template`] - Command templates over build context fields
//! - [`context`] - Per-bitness layout and environment
//! - [`settings`] - Settings (crossforge.toml)
//! - [`resolver`] - Dependency resolution
//! - [`stage`] - Stage markers
//! - [`vcs`] - Checkout divergence
//! - [`acquire`] - Source acquisition
//! - [`patch`] - Patch application
//! - [`pipeline`] - Configure, build and install
//! - [`orchestrator`] - Build orchestration

pub mod acquire;
pub mod catalog;
pub mod context;
pub mod orchestrator;
pub mod patch;
pub mod pipeline;
pub mod recipe;
pub mod resolver;
pub mod settings;
pub mod stage;
pub mod template;
pub mod vcs;
