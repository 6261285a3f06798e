//! Canonical in-memory graph.
//!
//! The store is the single source of truth for which nodes exist. It is only
//! ever replaced wholesale; each replacement bumps a generation counter and
//! yields a [`GraphDiff`] that downstream state (layout, selection) consumes
//! to reconcile itself.

use crate::links::derive_links;
use crate::models::{Link, Node, NodeId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

// ============================================================================
// Types
// ============================================================================

/// Id-level difference between two consecutive store generations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphDiff {
    pub generation: u64,
    pub added: BTreeSet<NodeId>,
    pub removed: BTreeSet<NodeId>,
    pub retained: BTreeSet<NodeId>,
}

impl GraphDiff {
    pub fn is_structural(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub link_count: usize,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    links: Vec<Link>,
    generation: u64,
}

// ============================================================================
// Store Operations
// ============================================================================

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new node collection and re-derive links.
    ///
    /// If the input repeats an id, the last occurrence wins for lookups; the
    /// node order otherwise follows the input.
    pub fn replace(&mut self, nodes: Vec<Node>) -> GraphDiff {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.insert(node.id, i);
        }

        let mut diff = GraphDiff::default();
        for id in index.keys() {
            if self.index.contains_key(id) {
                diff.retained.insert(*id);
            } else {
                diff.added.insert(*id);
            }
        }
        for id in self.index.keys() {
            if !index.contains_key(id) {
                diff.removed.insert(*id);
            }
        }

        let links = derive_links(&nodes);

        self.nodes = nodes;
        self.index = index;
        self.links = links;
        self.generation += 1;
        diff.generation = self.generation;

        tracing::debug!(
            generation = self.generation,
            added = diff.added.len(),
            removed = diff.removed.len(),
            retained = diff.retained.len(),
            links = self.links.len(),
            "graph store replaced"
        );

        diff
    }

    pub fn find_by_id(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.nodes.len(),
            link_count: self.links.len(),
        }
    }
}
