//! Live layout state.
//!
//! The controller bridges the canonical graph into a [`ForceEngine`] and owns
//! the per-node position table. Rendering learns about positions only through
//! the tick callbacks registered with [`LayoutController::on_tick`].

use crate::models::{Link, Node, NodeId, Point};
use crate::simulation::{Force, ForceEngine, NodeLayout, PositionTable};
use crate::store::GraphDiff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;

pub type TickCallback = Box<dyn FnMut(&PositionTable) + Send>;

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParams {
    pub link_distance: f64,
    pub charge_strength: f64,
    pub collision_radius: f64,
    /// Alpha applied after a resize or a non-structural reload.
    pub reheat_alpha: f64,
    /// Alpha target held while at least one node is being dragged.
    pub drag_alpha_target: f64,
    /// New nodes are scattered within this distance of the center.
    pub spawn_radius: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            link_distance: 100.0,
            charge_strength: -300.0,
            collision_radius: 40.0,
            reheat_alpha: 0.3,
            drag_alpha_target: 0.3,
            spawn_radius: 50.0,
            min_zoom: 0.1,
            max_zoom: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Pan/zoom applied by the renderer: `screen = world * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, k: 1.0 }
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct LayoutController {
    engine: Box<dyn ForceEngine>,
    table: PositionTable,
    params: LayoutParams,
    viewport: Viewport,
    transform: ViewTransform,
    dragging: HashSet<NodeId>,
    callbacks: Vec<TickCallback>,
    rng: StdRng,
}

impl LayoutController {
    pub fn new(
        mut engine: Box<dyn ForceEngine>,
        params: LayoutParams,
        viewport: Viewport,
        seed: u64,
    ) -> Self {
        let center = viewport.center();
        engine.configure(Force::Link {
            distance: params.link_distance,
        });
        engine.configure(Force::Charge {
            strength: params.charge_strength,
        });
        engine.configure(Force::Center {
            x: center.x,
            y: center.y,
        });
        engine.configure(Force::Collision {
            radius: params.collision_radius,
        });

        Self {
            engine,
            table: PositionTable::new(),
            params,
            viewport,
            transform: ViewTransform::default(),
            dragging: HashSet::new(),
            callbacks: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Re-initialize the simulation after a store replacement.
    ///
    /// Retained ids keep position, velocity and pin. Added ids are scattered
    /// around the viewport center. Removed ids are dropped from the table.
    pub fn seed(&mut self, nodes: &[Node], links: &[Link], diff: &GraphDiff) {
        let was_dragging = !self.dragging.is_empty();
        for id in &diff.removed {
            self.table.remove(id);
            self.dragging.remove(id);
        }
        if was_dragging && self.dragging.is_empty() {
            self.engine.set_alpha_target(0.0);
        }

        let center = self.viewport.center();
        let r = self.params.spawn_radius;
        for node in nodes {
            if !self.table.contains_key(&node.id) {
                let x = center.x + self.rng.gen_range(-r..=r);
                let y = center.y + self.rng.gen_range(-r..=r);
                self.table.insert(node.id, NodeLayout::at(x, y));
            }
        }

        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        self.engine.set_graph(&ids, links);
        if diff.is_structural() {
            self.engine.set_alpha(1.0);
        } else {
            self.engine.set_alpha(self.params.reheat_alpha);
        }
    }

    /// Fix `id` at `(x, y)` until [`unpin`](Self::unpin). Returns false for
    /// ids the layout does not know.
    pub fn pin(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        match self.table.get_mut(&id) {
            Some(entry) => {
                entry.pin = Some(Point::new(x, y));
                true
            }
            None => false,
        }
    }

    pub fn unpin(&mut self, id: NodeId) -> bool {
        match self.table.get_mut(&id) {
            Some(entry) => {
                entry.pin = None;
                true
            }
            None => false,
        }
    }

    pub fn drag_start(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if self.dragging.is_empty() {
            self.engine.set_alpha_target(self.params.drag_alpha_target);
        }
        self.dragging.insert(id);
        self.pin(id, pos.x, pos.y)
    }

    pub fn drag_move(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        self.pin(id, x, y)
    }

    pub fn drag_end(&mut self, id: NodeId) -> bool {
        self.dragging.remove(&id);
        if self.dragging.is_empty() {
            self.engine.set_alpha_target(0.0);
        }
        self.unpin(id)
    }

    pub fn on_tick(&mut self, callback: TickCallback) {
        self.callbacks.push(callback);
    }

    /// Run one simulation step if the engine is still hot. Returns whether a
    /// step ran.
    pub fn tick(&mut self) -> bool {
        if !self.engine.is_hot() {
            return false;
        }
        self.engine.step(&mut self.table);
        for cb in self.callbacks.iter_mut() {
            cb(&self.table);
        }
        true
    }

    /// Move the centering target to the new viewport midpoint and reheat.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = Viewport { width, height };
        let center = self.viewport.center();
        self.engine.configure(Force::Center {
            x: center.x,
            y: center.y,
        });
        self.engine.set_alpha(self.params.reheat_alpha);
    }

    /// Pan so `id` sits in the middle of the viewport at the current zoom.
    pub fn center_on(&mut self, id: NodeId) -> Option<ViewTransform> {
        let pos = self.position(id)?;
        let center = self.viewport.center();
        let k = self.transform.k;
        self.transform = ViewTransform {
            x: center.x - pos.x * k,
            y: center.y - pos.y * k,
            k,
        };
        Some(self.transform)
    }

    pub fn zoom_to(&mut self, k: f64) -> ViewTransform {
        self.transform.k = k.clamp(self.params.min_zoom, self.params.max_zoom);
        self.transform
    }

    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.table.get(&id).map(|l| l.position())
    }

    pub fn positions(&self) -> &PositionTable {
        &self.table
    }

    pub fn is_pinned(&self, id: NodeId) -> bool {
        self.table.get(&id).map(|l| l.pin.is_some()).unwrap_or(false)
    }

    pub fn is_hot(&self) -> bool {
        self.engine.is_hot()
    }

    pub fn alpha(&self) -> f64 {
        self.engine.alpha()
    }

    pub fn engine(&self) -> &dyn ForceEngine {
        self.engine.as_ref()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }
}
