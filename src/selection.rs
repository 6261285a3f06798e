//! Selection and transient highlight state.
//!
//! Selection is exclusive: at most one node. Hover is tracked per id and never
//! touches the selection. The highlight set is recomputed from scratch on
//! every query so it cannot go stale after a reload.

use crate::models::{Link, Node, NodeId};
use crate::store::{GraphDiff, GraphStore};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    Idle,
    Selected(NodeId),
}

impl Selection {
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Selection::Idle => None,
            Selection::Selected(id) => Some(*id),
        }
    }
}

/// Entities emphasized because of hover (and optionally selection).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlight {
    pub links: Vec<Link>,
    /// Focus nodes plus the far endpoint of every highlighted link.
    pub nodes: BTreeSet<NodeId>,
}

/// Selected node plus its declared neighbours that still exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetail {
    pub node: Node,
    pub linked: Vec<LinkedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedNode {
    pub id: NodeId,
    pub title: String,
}

#[derive(Debug, Default)]
pub struct SelectionHighlight {
    selection: Selection,
    hovered: HashSet<NodeId>,
    highlight_selection: bool,
}

impl SelectionHighlight {
    pub fn new(highlight_selection: bool) -> Self {
        Self {
            highlight_selection,
            ..Default::default()
        }
    }

    /// Select `id`. An id absent from the store leaves the state `Idle`.
    pub fn select(&mut self, id: NodeId, store: &GraphStore) -> Selection {
        self.selection = if store.contains(id) {
            Selection::Selected(id)
        } else {
            tracing::debug!(id, "ignoring selection of unknown node");
            Selection::Idle
        };
        self.selection
    }

    pub fn deselect(&mut self) {
        self.selection = Selection::Idle;
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selection.id()
    }

    /// Start hovering `id`. Ids absent from the store are ignored.
    pub fn hover_enter(&mut self, id: NodeId, store: &GraphStore) -> bool {
        if !store.contains(id) {
            tracing::debug!(id, "ignoring hover of unknown node");
            return false;
        }
        self.hovered.insert(id)
    }

    pub fn hover_leave(&mut self, id: NodeId) {
        self.hovered.remove(&id);
    }

    pub fn is_hovered(&self, id: NodeId) -> bool {
        self.hovered.contains(&id)
    }

    /// Drop state that refers to ids removed by the last replacement.
    pub fn reconcile(&mut self, diff: &GraphDiff) {
        if let Selection::Selected(id) = self.selection {
            if diff.removed.contains(&id) {
                self.selection = Selection::Idle;
            }
        }
        self.hovered.retain(|id| !diff.removed.contains(id));
    }

    pub fn highlight(&self, links: &[Link]) -> Highlight {
        let mut focus: HashSet<NodeId> = self.hovered.clone();
        if self.highlight_selection {
            if let Some(id) = self.selected() {
                focus.insert(id);
            }
        }

        let mut highlight = Highlight::default();
        if focus.is_empty() {
            return highlight;
        }
        highlight.nodes.extend(focus.iter().copied());
        for link in links {
            if focus.contains(&link.source) || focus.contains(&link.target) {
                highlight.links.push(*link);
                highlight.nodes.insert(link.source);
                highlight.nodes.insert(link.target);
            }
        }
        highlight
    }

    pub fn detail(&self, store: &GraphStore) -> Option<NodeDetail> {
        let node = store.find_by_id(self.selected()?)?;
        let linked = node
            .linked_nodes
            .iter()
            .filter_map(|id| store.find_by_id(*id))
            .map(|n| LinkedNode {
                id: n.id,
                title: n.title.clone(),
            })
            .collect();
        Some(NodeDetail {
            node: node.clone(),
            linked,
        })
    }
}
