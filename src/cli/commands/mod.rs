//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod list;
pub mod plan;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use crate::core::catalog::{Catalog, NodeId};
use crate::core::settings::Settings;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build products and dependencies
    Build {
        #[command(flatten)]
        selection: Selection,

        /// Reset the requested nodes and rebuild them from scratch
        #[arg(short, long)]
        force: bool,

        /// Do not build dependencies of the requested nodes
        #[arg(short, long)]
        skip_deps: bool,
    },

    /// List catalog nodes
    List(list::ListArgs),

    /// Print the build order without running anything
    Plan {
        #[command(flatten)]
        selection: Selection,

        /// Do not include dependencies of the requested nodes
        #[arg(short, long)]
        skip_deps: bool,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, paths: &Paths) -> Result<()> {
        match self {
            Self::Build {
                selection,
                force,
                skip_deps,
            } => {
                let options = build::BuildOptions {
                    selection,
                    force,
                    skip_deps,
                };
                build::execute(paths, options).await
            }
            Self::List(args) => list::execute(paths, &args),
            Self::Plan {
                selection,
                skip_deps,
            } => plan::execute(paths, &selection, skip_deps),
        }
    }
}

/// Nodes named on the command line
#[derive(Args, Debug, Clone, Default)]
pub struct Selection {
    /// Products to build, comma separated
    #[arg(short = 'p', long = "products", value_delimiter = ',')]
    pub products: Vec<String>,

    /// Dependencies to build, comma separated
    #[arg(short = 'd', long = "dependencies", value_delimiter = ',')]
    pub dependencies: Vec<String>,

    /// Build every product of `script.product_order`
    #[arg(short, long)]
    pub all: bool,
}

impl Selection {
    /// Resolve names to ids; `--all` or an empty selection means the product order
    ///
    /// Dependencies come first, then products, then the product order.
    pub fn roots(&self, catalog: &Catalog, settings: &Settings) -> Result<Vec<NodeId>> {
        let mut roots = Vec::new();
        for name in &self.dependencies {
            roots.push(catalog.dependency_id(name)?);
        }
        for name in &self.products {
            roots.push(catalog.product_id(name)?);
        }
        if self.all || roots.is_empty() {
            for name in &settings.script.product_order {
                let id = catalog
                    .product_id(name)
                    .context("script.product_order names a product the catalog lacks")?;
                roots.push(id);
            }
        }
        Ok(roots)
    }
}

/// Files the commands read
#[derive(Debug, Clone)]
pub struct Paths {
    pub settings: PathBuf,
    pub catalog: PathBuf,
}

impl Paths {
    /// Settings plus the directory relative paths in them resolve against
    pub fn load_settings(&self) -> Result<(Settings, PathBuf)> {
        let settings = Settings::load_or_create(&self.settings)?;
        let parent = self.settings.parent().unwrap_or_else(|| Path::new(""));
        let base = if parent.is_absolute() {
            parent.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to read current directory")?
                .join(parent)
        };
        Ok((settings, base))
    }

    /// Validated catalog
    pub fn load_catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.catalog)
            .with_context(|| format!("Failed to load catalog '{}'", self.catalog.display()))
    }
}
