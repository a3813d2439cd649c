//! Plan command implementation
//!
//! Implements `crossforge plan`, printing the build order.

use anyhow::Result;

use super::{Paths, Selection};
use crate::core::resolver::DependencyGraph;

/// Execute the plan command
pub fn execute(paths: &Paths, selection: &Selection, skip_deps: bool) -> Result<()> {
    let (settings, _) = paths.load_settings()?;
    let catalog = paths.load_catalog()?;
    let roots = selection.roots(&catalog, &settings)?;

    let graph = DependencyGraph::from_catalog(&catalog);
    graph.validate()?;
    for (index, id) in graph.resolve_order(&roots, skip_deps)?.iter().enumerate() {
        println!("{:>3}. {} ({})", index + 1, id.name, id.kind.label());
    }
    Ok(())
}
