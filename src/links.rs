//! Link derivation from declared adjacency.
//!
//! Each node declares the ids it is related to. The relationship is symmetric,
//! but the server may store it on one side or on both. Links are canonicalized
//! by only accepting a declaration from the lower id towards the higher id.

use crate::models::{Link, Node, NodeId};
use std::collections::HashSet;

/// Derive the undirected link set for `nodes`.
///
/// A declared target `t` of node `n` yields a link iff `t` is present in
/// `nodes` and `n.id < t`. Output order follows node order, then declaration
/// order. Declarations that only exist on the higher-id side are dropped, and
/// a target repeated within one node's list yields a repeated link.
pub fn derive_links(nodes: &[Node]) -> Vec<Link> {
    let present: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();

    let mut links = Vec::new();
    for node in nodes {
        for &target in &node.linked_nodes {
            if present.contains(&target) && node.id < target {
                links.push(Link::new(node.id, target));
            }
        }
    }
    links
}
