//! List command implementation
//!
//! Implements `crossforge list` to show catalog products or dependencies.

use anyhow::Result;
use clap::{ArgGroup, Args};

use super::Paths;
use crate::cli::output::{format_nodes, ListFormat};

/// Arguments of `crossforge list`
#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("namespace").required(true).args(["products", "dependencies"])))]
#[command(group(ArgGroup::new("format").args(["markdown", "csv", "json"])))]
pub struct ListArgs {
    /// List products
    #[arg(short, long)]
    pub products: bool,

    /// List dependencies
    #[arg(short, long)]
    pub dependencies: bool,

    /// Markdown table
    #[arg(long)]
    pub markdown: bool,

    /// Names separated by ';'
    #[arg(long)]
    pub csv: bool,

    /// JSON array
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    fn format(&self) -> ListFormat {
        if self.markdown {
            ListFormat::Markdown
        } else if self.csv {
            ListFormat::Csv
        } else if self.json {
            ListFormat::Json
        } else {
            ListFormat::Table
        }
    }
}

/// Execute the list command
pub fn execute(paths: &Paths, args: &ListArgs) -> Result<()> {
    let catalog = paths.load_catalog()?;
    let output = if args.products {
        format_nodes(catalog.products(), args.format())?
    } else {
        format_nodes(catalog.dependencies(), args.format())?
    };
    println!("{output}");
    Ok(())
}
