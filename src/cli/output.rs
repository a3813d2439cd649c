//! Output formatting
//!
//! Log filtering per verbosity, error rendering, and the node listings of
//! `crossforge list`.

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::core::catalog::Node;

/// Terminal verbosity chosen on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        Self { quiet, verbose }
    }

    /// Default log level for this verbosity
    pub fn level(self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (_, 2..) => tracing::Level::TRACE,
            (_, 1) => tracing::Level::DEBUG,
            (true, 0) => tracing::Level::WARN,
            (false, 0) => tracing::Level::INFO,
        }
    }

    /// Filter honoring `RUST_LOG` first, then the verbosity flags
    pub fn filter(self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level().into())
            .from_env_lossy()
    }

    /// Install the global tracing subscriber
    pub fn install(self) {
        tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(self.verbose > 0)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Listing formats of `crossforge list`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// Aligned name/version columns
    #[default]
    Table,
    Markdown,
    /// Names separated by `;`
    Csv,
    Json,
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    fancy_name: Option<&'a str>,
    version: Option<&'a str>,
    depends_on: Vec<&'a str>,
}

impl<'a> From<&'a Node> for ListEntry<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            name: node.name(),
            fancy_name: node.info.fancy_name.as_deref(),
            version: node.info.version.as_deref(),
            depends_on: node.depends_on.iter().map(|d| d.name.as_str()).collect(),
        }
    }
}

/// Render nodes in `format`
pub fn format_nodes<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    format: ListFormat,
) -> serde_json::Result<String> {
    let entries: Vec<ListEntry<'_>> = nodes.into_iter().map(ListEntry::from).collect();
    let version = |e: &ListEntry<'_>| e.version.unwrap_or("-").to_string();

    Ok(match format {
        ListFormat::Json => serde_json::to_string_pretty(&entries)?,
        ListFormat::Csv => entries
            .iter()
            .map(|e| e.name)
            .collect::<Vec<_>>()
            .join(";"),
        ListFormat::Markdown => {
            let mut out = String::from("| Name | Version |\n| --- | --- |");
            for entry in &entries {
                out.push_str(&format!(
                    "\n| {} | {} |",
                    entry.fancy_name.unwrap_or(entry.name),
                    version(entry)
                ));
            }
            out
        }
        ListFormat::Table => {
            let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
            entries
                .iter()
                .map(|e| format!("{:<width$}  {}", e.name, version(e)))
                .collect::<Vec<_>>()
                .join("\n")
        }
    })
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}
