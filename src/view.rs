//! One graph view: the store plus the layout and selection state derived
//! from it.
//!
//! `GraphView` is the owned context object handed to the orchestrator and the
//! session server. Several views can coexist in one process.

use crate::config::ClientConfig;
use crate::layout::{LayoutController, ViewTransform, Viewport};
use crate::models::{Link, Node, NodeId};
use crate::selection::{Highlight, NodeDetail, Selection, SelectionHighlight};
use crate::simulation::ForceSimulation;
use crate::store::{GraphDiff, GraphStats, GraphStore};
use serde::Serialize;

pub struct GraphView {
    store: GraphStore,
    layout: LayoutController,
    selection: SelectionHighlight,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    #[serde(flatten)]
    pub node: Node,
    pub x: f64,
    pub y: f64,
    pub pinned: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub generation: u64,
    pub nodes: Vec<NodeView>,
    pub links: Vec<Link>,
    pub selection: Selection,
    pub highlight: Highlight,
    pub detail: Option<NodeDetail>,
    pub stats: GraphStats,
    pub viewport: Viewport,
    pub transform: ViewTransform,
    pub alpha: f64,
}

impl GraphView {
    pub fn new(layout: LayoutController, selection: SelectionHighlight) -> Self {
        Self {
            store: GraphStore::new(),
            layout,
            selection,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let layout = LayoutController::new(
            Box::new(ForceSimulation::new(config.seed)),
            config.layout.clone(),
            config.viewport,
            config.seed,
        );
        Self::new(layout, SelectionHighlight::new(config.highlight_selection))
    }

    /// Replace the graph and reconcile layout and selection in one step, so
    /// nothing observes nodes and links out of sync.
    pub fn apply_nodes(&mut self, nodes: Vec<Node>) -> GraphDiff {
        let diff = self.store.replace(nodes);
        self.layout
            .seed(self.store.nodes(), self.store.links(), &diff);
        self.selection.reconcile(&diff);
        diff
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn layout(&self) -> &LayoutController {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutController {
        &mut self.layout
    }

    pub fn selection(&self) -> &SelectionHighlight {
        &self.selection
    }

    pub fn select(&mut self, id: NodeId) -> Selection {
        self.selection.select(id, &self.store)
    }

    pub fn deselect(&mut self) {
        self.selection.deselect();
    }

    /// Select a node reached from the detail view and pan the camera to it.
    pub fn select_linked(&mut self, id: NodeId) -> Option<ViewTransform> {
        match self.select(id) {
            Selection::Selected(id) => self.layout.center_on(id),
            Selection::Idle => None,
        }
    }

    pub fn hover_enter(&mut self, id: NodeId) -> bool {
        self.selection.hover_enter(id, &self.store)
    }

    pub fn hover_leave(&mut self, id: NodeId) {
        self.selection.hover_leave(id);
    }

    pub fn highlight(&self) -> Highlight {
        self.selection.highlight(self.store.links())
    }

    pub fn detail(&self) -> Option<NodeDetail> {
        self.selection.detail(&self.store)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let selected = self.selection.selected();
        let nodes = self
            .store
            .nodes()
            .iter()
            .map(|n| {
                let pos = self.layout.position(n.id).unwrap_or_default();
                NodeView {
                    node: n.clone(),
                    x: pos.x,
                    y: pos.y,
                    pinned: self.layout.is_pinned(n.id),
                    selected: selected == Some(n.id),
                }
            })
            .collect();

        ViewSnapshot {
            generation: self.store.generation(),
            nodes,
            links: self.store.links().to_vec(),
            selection: self.selection.selection(),
            highlight: self.highlight(),
            detail: self.detail(),
            stats: self.store.stats(),
            viewport: self.layout.viewport(),
            transform: self.layout.transform(),
            alpha: self.layout.alpha(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Point;

    fn view() -> GraphView {
        GraphView::from_config(&ClientConfig::default())
    }

    #[test]
    fn test_apply_nodes_end_to_end_links() {
        let mut v = view();
        v.apply_nodes(vec![
            Node::new(1, "A", vec![2, 3]),
            Node::new(2, "B", vec![1]),
            Node::new(3, "C", vec![]),
        ]);
        assert_eq!(v.store().links(), &[Link::new(1, 2), Link::new(1, 3)]);
        for id in [1, 2, 3] {
            assert!(v.layout().position(id).is_some());
        }
    }

    #[test]
    fn test_apply_nodes_clears_stale_selection() {
        let mut v = view();
        v.apply_nodes(vec![Node::new(7, "A", vec![]), Node::new(8, "B", vec![])]);
        assert_eq!(v.select(7), Selection::Selected(7));

        v.apply_nodes(vec![Node::new(8, "B", vec![])]);
        assert_eq!(v.selection().selection(), Selection::Idle);
        assert!(v.layout().position(7).is_none());
        assert!(v.detail().is_none());
    }

    #[test]
    fn test_hover_of_missing_node_never_reaches_highlight() {
        let mut v = view();
        v.apply_nodes(vec![Node::new(1, "A", vec![2]), Node::new(2, "B", vec![])]);
        assert!(!v.hover_enter(99));

        v.apply_nodes(vec![Node::new(1, "A", vec![2]), Node::new(2, "B", vec![])]);
        assert!(!v.highlight().nodes.contains(&99));
        assert!(v.highlight().nodes.is_empty());
    }

    #[test]
    fn test_select_linked_centers_camera() {
        let mut v = view();
        v.apply_nodes(vec![Node::new(1, "A", vec![2]), Node::new(2, "B", vec![])]);
        v.layout_mut().pin(2, 80.0, 100.0);
        v.layout_mut().tick();

        let t = v.select_linked(2).unwrap();
        assert_eq!(v.selection().selected(), Some(2));
        assert_eq!((t.x, t.y), (480.0 - 80.0, 300.0 - 100.0));

        assert!(v.select_linked(55).is_none());
        assert_eq!(v.selection().selection(), Selection::Idle);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut v = view();
        v.apply_nodes(vec![Node::new(1, "A", vec![2]), Node::new(2, "B", vec![])]);
        v.select(1);
        v.hover_enter(2);
        v.layout_mut().drag_start(2);
        v.layout_mut().drag_move(2, 10.0, 20.0);
        v.layout_mut().tick();

        let snap = v.snapshot();
        assert_eq!(snap.generation, 1);
        assert_eq!(snap.stats.node_count, 2);
        assert_eq!(snap.stats.link_count, 1);
        assert_eq!(snap.selection, Selection::Selected(1));
        assert_eq!(snap.highlight.links, vec![Link::new(1, 2)]);
        assert_eq!(snap.detail.as_ref().map(|d| d.node.id), Some(1));

        let dragged = snap.nodes.iter().find(|n| n.node.id == 2).unwrap();
        assert!(dragged.pinned);
        assert_eq!(Point::new(dragged.x, dragged.y), Point::new(10.0, 20.0));
        assert!(snap.nodes.iter().find(|n| n.node.id == 1).unwrap().selected);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["nodes"][0]["title"], "A");
        assert_eq!(json["selection"]["state"], "selected");
    }
}
