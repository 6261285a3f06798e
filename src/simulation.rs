//! Force-directed layout engine.
//!
//! [`ForceEngine`] is the seam between the layout controller and whatever
//! physics computes node coordinates. [`ForceSimulation`] is the built-in
//! engine: velocity Verlet with link springs, many-body repulsion, a
//! centering force and collision avoidance, cooled by an alpha schedule.
//!
//! The engine is the only writer of `x`/`y`/`vx`/`vy` in the position table.
//! The controller owns `pin`; a pinned node is held at its pin every step.

use crate::models::{Link, NodeId, Point};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

// ============================================================================
// Position Table
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeLayout {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// While set, the engine treats this as the node's position.
    pub pin: Option<Point>,
}

impl NodeLayout {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

pub type PositionTable = HashMap<NodeId, NodeLayout>;

// ============================================================================
// Forces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForceId {
    Link,
    Charge,
    Center,
    Collision,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Force {
    /// Spring towards a target link length.
    Link { distance: f64 },
    /// Pairwise many-body force; negative strength repels.
    Charge { strength: f64 },
    /// Translates the whole layout so its mean sits on this point.
    Center { x: f64, y: f64 },
    /// Keeps node circles of this radius from overlapping.
    Collision { radius: f64 },
}

impl Force {
    pub fn id(&self) -> ForceId {
        match self {
            Force::Link { .. } => ForceId::Link,
            Force::Charge { .. } => ForceId::Charge,
            Force::Center { .. } => ForceId::Center,
            Force::Collision { .. } => ForceId::Collision,
        }
    }
}

/// Physics collaborator driven by the layout controller.
pub trait ForceEngine: Send {
    /// Replace the simulated entity set.
    fn set_graph(&mut self, ids: &[NodeId], links: &[Link]);

    /// Install or replace the force with the same [`ForceId`].
    fn configure(&mut self, force: Force);

    fn force(&self, id: ForceId) -> Option<Force>;

    fn alpha(&self) -> f64;

    fn set_alpha(&mut self, alpha: f64);

    fn alpha_target(&self) -> f64;

    fn set_alpha_target(&mut self, target: f64);

    /// Whether another step would still move anything.
    fn is_hot(&self) -> bool;

    /// Advance one step, writing positions and velocities into `table`.
    fn step(&mut self, table: &mut PositionTable);
}

// ============================================================================
// Built-in Simulation
// ============================================================================

pub struct ForceSimulation {
    ids: Vec<NodeId>,
    links: Vec<(NodeId, NodeId)>,
    degree: HashMap<NodeId, usize>,
    forces: HashMap<ForceId, Force>,
    alpha: f64,
    alpha_min: f64,
    alpha_decay: f64,
    alpha_target: f64,
    velocity_decay: f64,
    rng: StdRng,
}

impl ForceSimulation {
    pub fn new(seed: u64) -> Self {
        let alpha_min = 0.001;
        Self {
            ids: Vec::new(),
            links: Vec::new(),
            degree: HashMap::new(),
            forces: HashMap::new(),
            alpha: 1.0,
            alpha_min,
            // Cools from 1 to alpha_min in ~300 steps.
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.4,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn jiggle(&mut self) -> f64 {
        (self.rng.gen::<f64>() - 0.5) * 1e-6
    }

    fn apply_link(&mut self, bodies: &mut [NodeLayout], slot: &HashMap<NodeId, usize>, distance: f64) {
        for i in 0..self.links.len() {
            let (s_id, t_id) = self.links[i];
            let (Some(&s), Some(&t)) = (slot.get(&s_id), slot.get(&t_id)) else {
                continue;
            };
            let s_deg = *self.degree.get(&s_id).unwrap_or(&1) as f64;
            let t_deg = *self.degree.get(&t_id).unwrap_or(&1) as f64;
            let strength = 1.0 / s_deg.min(t_deg).max(1.0);
            let bias = s_deg / (s_deg + t_deg);

            let mut dx = bodies[t].x + bodies[t].vx - bodies[s].x - bodies[s].vx;
            let mut dy = bodies[t].y + bodies[t].vy - bodies[s].y - bodies[s].vy;
            if dx == 0.0 {
                dx = self.jiggle();
            }
            if dy == 0.0 {
                dy = self.jiggle();
            }
            let len = (dx * dx + dy * dy).sqrt();
            let k = (len - distance) / len * self.alpha * strength;
            dx *= k;
            dy *= k;
            bodies[t].vx -= dx * bias;
            bodies[t].vy -= dy * bias;
            bodies[s].vx += dx * (1.0 - bias);
            bodies[s].vy += dy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self, bodies: &mut [NodeLayout], strength: f64) {
        let n = bodies.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dx = bodies[j].x - bodies[i].x;
                let mut dy = bodies[j].y - bodies[i].y;
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let l2 = (dx * dx + dy * dy).max(1.0);
                let w = strength * self.alpha / l2;
                bodies[i].vx += dx * w;
                bodies[i].vy += dy * w;
            }
        }
    }

    fn apply_center(bodies: &mut [NodeLayout], cx: f64, cy: f64) {
        if bodies.is_empty() {
            return;
        }
        let n = bodies.len() as f64;
        let mx = bodies.iter().map(|b| b.x).sum::<f64>() / n - cx;
        let my = bodies.iter().map(|b| b.y).sum::<f64>() / n - cy;
        for b in bodies.iter_mut() {
            b.x -= mx;
            b.y -= my;
        }
    }

    fn apply_collision(&mut self, bodies: &mut [NodeLayout], radius: f64) {
        let r = radius * 2.0;
        let n = bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = bodies[i].x + bodies[i].vx - bodies[j].x - bodies[j].vx;
                let mut dy = bodies[i].y + bodies[i].vy - bodies[j].y - bodies[j].vy;
                let l2 = dx * dx + dy * dy;
                if l2 >= r * r {
                    continue;
                }
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let len = (dx * dx + dy * dy).sqrt();
                let k = (r - len) / len * 0.5;
                bodies[i].vx += dx * k;
                bodies[i].vy += dy * k;
                bodies[j].vx -= dx * k;
                bodies[j].vy -= dy * k;
            }
        }
    }
}

impl Default for ForceSimulation {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ForceEngine for ForceSimulation {
    fn set_graph(&mut self, ids: &[NodeId], links: &[Link]) {
        self.ids = ids.to_vec();
        self.links = links.iter().map(|l| (l.source, l.target)).collect();
        self.degree.clear();
        for (s, t) in &self.links {
            *self.degree.entry(*s).or_insert(0) += 1;
            *self.degree.entry(*t).or_insert(0) += 1;
        }
    }

    fn configure(&mut self, force: Force) {
        self.forces.insert(force.id(), force);
    }

    fn force(&self, id: ForceId) -> Option<Force> {
        self.forces.get(&id).copied()
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    fn is_hot(&self) -> bool {
        self.alpha >= self.alpha_min || self.alpha_target >= self.alpha_min
    }

    fn step(&mut self, table: &mut PositionTable) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        let ids: Vec<NodeId> = self
            .ids
            .iter()
            .copied()
            .filter(|id| table.contains_key(id))
            .collect();
        let slot: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut bodies: Vec<NodeLayout> = ids.iter().map(|id| table[id]).collect();

        if let Some(Force::Link { distance }) = self.force(ForceId::Link) {
            self.apply_link(&mut bodies, &slot, distance);
        }
        if let Some(Force::Charge { strength }) = self.force(ForceId::Charge) {
            self.apply_charge(&mut bodies, strength);
        }
        if let Some(Force::Center { x, y }) = self.force(ForceId::Center) {
            Self::apply_center(&mut bodies, x, y);
        }
        if let Some(Force::Collision { radius }) = self.force(ForceId::Collision) {
            self.apply_collision(&mut bodies, radius);
        }

        let keep = 1.0 - self.velocity_decay;
        for b in bodies.iter_mut() {
            match b.pin {
                Some(p) => {
                    b.x = p.x;
                    b.y = p.y;
                    b.vx = 0.0;
                    b.vy = 0.0;
                }
                None => {
                    b.vx *= keep;
                    b.vy *= keep;
                    b.x += b.vx;
                    b.y += b.vy;
                }
            }
        }

        for (id, body) in ids.into_iter().zip(bodies) {
            table.insert(id, body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(NodeId, f64, f64)]) -> PositionTable {
        entries
            .iter()
            .map(|&(id, x, y)| (id, NodeLayout::at(x, y)))
            .collect()
    }

    fn distance(t: &PositionTable, a: NodeId, b: NodeId) -> f64 {
        let (pa, pb) = (t[&a], t[&b]);
        ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt()
    }

    #[test]
    fn test_alpha_cools_to_rest() {
        let mut sim = ForceSimulation::new(1);
        let mut t = table(&[(1, 0.0, 0.0)]);
        sim.set_graph(&[1], &[]);
        let mut steps = 0;
        while sim.is_hot() {
            sim.step(&mut t);
            steps += 1;
            assert!(steps < 1000);
        }
        assert!(steps > 250 && steps < 350, "took {} steps", steps);
    }

    #[test]
    fn test_alpha_target_keeps_simulation_hot() {
        let mut sim = ForceSimulation::new(1);
        sim.set_alpha(0.0);
        sim.set_alpha_target(0.3);
        assert!(sim.is_hot());
        let mut t = table(&[(1, 0.0, 0.0)]);
        sim.set_graph(&[1], &[]);
        for _ in 0..500 {
            sim.step(&mut t);
        }
        assert!((sim.alpha() - 0.3).abs() < 0.01);
    }

    #[test]
    fn test_link_pulls_towards_distance() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Link { distance: 100.0 });
        sim.set_graph(&[1, 2], &[Link::new(1, 2)]);
        let mut t = table(&[(1, 0.0, 0.0), (2, 400.0, 0.0)]);
        for _ in 0..300 {
            sim.step(&mut t);
        }
        assert!((distance(&t, 1, 2) - 100.0).abs() < 10.0);
    }

    #[test]
    fn test_charge_repels() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Charge { strength: -300.0 });
        sim.set_graph(&[1, 2], &[]);
        let mut t = table(&[(1, 0.0, 0.0), (2, 10.0, 0.0)]);
        sim.step(&mut t);
        assert!(distance(&t, 1, 2) > 10.0);
    }

    #[test]
    fn test_center_moves_mean() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Center { x: 500.0, y: 300.0 });
        sim.set_graph(&[1, 2], &[]);
        let mut t = table(&[(1, 0.0, 0.0), (2, 100.0, 0.0)]);
        sim.step(&mut t);
        let mx = (t[&1].x + t[&2].x) / 2.0;
        let my = (t[&1].y + t[&2].y) / 2.0;
        assert!((mx - 500.0).abs() < 1e-6);
        assert!((my - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_collision_separates_overlap() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Collision { radius: 40.0 });
        sim.set_graph(&[1, 2], &[]);
        let mut t = table(&[(1, 0.0, 0.0), (2, 20.0, 0.0)]);
        for _ in 0..50 {
            sim.step(&mut t);
        }
        assert!(distance(&t, 1, 2) > 70.0);
    }

    #[test]
    fn test_pinned_node_is_held() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Charge { strength: -300.0 });
        sim.configure(Force::Center { x: 0.0, y: 0.0 });
        sim.set_graph(&[1, 2], &[]);
        let mut t = table(&[(1, 0.0, 0.0), (2, 5.0, 5.0)]);
        t.get_mut(&1).unwrap().pin = Some(Point::new(250.0, -40.0));
        for _ in 0..20 {
            sim.step(&mut t);
        }
        assert_eq!(t[&1].position(), Point::new(250.0, -40.0));
        assert_eq!((t[&1].vx, t[&1].vy), (0.0, 0.0));
    }

    #[test]
    fn test_configure_replaces_same_force() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Center { x: 1.0, y: 1.0 });
        sim.configure(Force::Center { x: 2.0, y: 3.0 });
        assert_eq!(sim.force(ForceId::Center), Some(Force::Center { x: 2.0, y: 3.0 }));
        assert_eq!(sim.force(ForceId::Link), None);
    }

    #[test]
    fn test_ids_missing_from_table_are_skipped() {
        let mut sim = ForceSimulation::new(1);
        sim.configure(Force::Link { distance: 100.0 });
        sim.set_graph(&[1, 2], &[Link::new(1, 2)]);
        let mut t = table(&[(1, 0.0, 0.0)]);
        sim.step(&mut t);
        assert_eq!(t.len(), 1);
    }
}
