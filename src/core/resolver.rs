//! Dependency resolution
//!
//! Computes build order over the catalog's `depends_on` edges with a
//! post-order depth-first walk, detecting cycles on the way.

use std::collections::{BTreeMap, HashSet};

use crate::core::catalog::{Catalog, NodeId};
use crate::error::CatalogError;

#[derive(Debug, Default, Clone)]
struct GraphNode {
    dependencies: Vec<NodeId>,
    inherit_only: bool,
    skip_deps: bool,
}

/// Dependency graph over catalog nodes
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
}

struct Walk {
    visited: HashSet<NodeId>,
    temp_visited: HashSet<NodeId>,
    cycle_path: Vec<NodeId>,
    result: Vec<NodeId>,
    skip_deps: bool,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of a whole catalog
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut graph = Self::new();
        for node in catalog.dependencies().chain(catalog.products()) {
            graph.add_node(
                node.id.clone(),
                node.depends_on.clone(),
                node.inherit_only,
                node.skip_deps,
            );
        }
        graph
    }

    /// Add a node with its ordered dependencies
    pub fn add_node(
        &mut self,
        id: NodeId,
        dependencies: Vec<NodeId>,
        inherit_only: bool,
        skip_deps: bool,
    ) {
        self.nodes.insert(
            id,
            GraphNode {
                dependencies,
                inherit_only,
                skip_deps,
            },
        );
    }

    /// Order in which `requested` must be built
    ///
    /// Every dependency precedes its dependents and each node appears once.
    /// Dependency inheriters are expanded but never listed. With `skip_deps`
    /// only the requested nodes themselves are listed (an inheriter still
    /// expands to its direct children).
    pub fn resolve_order(
        &self,
        requested: &[NodeId],
        skip_deps: bool,
    ) -> Result<Vec<NodeId>, CatalogError> {
        let mut walk = Walk {
            visited: HashSet::new(),
            temp_visited: HashSet::new(),
            cycle_path: Vec::new(),
            result: Vec::new(),
            skip_deps,
        };

        for id in requested {
            self.visit(id, None, &mut walk)?;
        }

        Ok(walk.result)
    }

    /// Fail on the first cycle anywhere in the graph
    pub fn validate(&self) -> Result<(), CatalogError> {
        let all: Vec<NodeId> = self.nodes.keys().cloned().collect();
        self.resolve_order(&all, false).map(drop)
    }

    fn visit(
        &self,
        id: &NodeId,
        referrer: Option<&NodeId>,
        walk: &mut Walk,
    ) -> Result<(), CatalogError> {
        if walk.temp_visited.contains(id) {
            // Found a cycle: report it from its first occurrence on the path
            let start = walk
                .cycle_path
                .iter()
                .position(|n| n == id)
                .unwrap_or_default();
            let mut cycle: Vec<String> = walk.cycle_path[start..]
                .iter()
                .map(|n| n.name.clone())
                .collect();
            cycle.push(id.name.clone());
            return Err(CatalogError::CyclicDependency { cycle });
        }

        if walk.visited.contains(id) {
            return Ok(());
        }

        let node = self.nodes.get(id).ok_or_else(|| match referrer {
            Some(referrer) => CatalogError::MissingDependency {
                node: referrer.name.clone(),
                dependency: id.name.clone(),
            },
            None => CatalogError::UnknownNode {
                kind: id.kind.label(),
                name: id.name.clone(),
            },
        })?;

        walk.temp_visited.insert(id.clone());
        walk.cycle_path.push(id.clone());

        if node.inherit_only || !(walk.skip_deps || node.skip_deps) {
            for dep in &node.dependencies {
                self.visit(dep, Some(id), walk)?;
            }
        }

        walk.cycle_path.pop();
        walk.temp_visited.remove(id);
        walk.visited.insert(id.clone());
        if !node.inherit_only {
            walk.result.push(id.clone());
        }

        Ok(())
    }
}
