mod forces;
mod quadtree;

use eframe::egui::Vec2;
use tracing::debug;

use super::graph::{Edge, Node};
use forces::{
    CollisionParams, RepulsionParams, accumulate_collision_pairs, accumulate_repulsion_for_node,
};
use quadtree::QuadNode;

const BARNES_HUT_THETA: f32 = 0.72;
const REPULSION_SOFTENING: f32 = 36.0;
const HIERARCHY_LINK_STRENGTH: f32 = 0.7;
const KNOWLEDGE_LINK_DISTANCE: f32 = 150.0;
const KNOWLEDGE_LINK_STRENGTH: f32 = 0.08;
const COLLISION_MARGIN: f32 = 3.0;
const COLLISION_STRENGTH: f32 = 0.7;
const MAX_SPEED: f32 = 60.0;

const ALPHA_MIN: f32 = 0.001;
const ALPHA_DECAY: f32 = 0.0228;
pub(in crate::app) const REHEAT_ALPHA_TARGET: f32 = 0.3;
const RESIZE_ALPHA: f32 = 0.12;

/// User-tunable multipliers, exposed through the physics panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct ForceConfig {
    pub(in crate::app) repulsion_scale: f32,
    pub(in crate::app) link_scale: f32,
    pub(in crate::app) collision_scale: f32,
    pub(in crate::app) velocity_decay: f32,
    pub(in crate::app) center_strength: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            repulsion_scale: 1.0,
            link_scale: 1.0,
            collision_scale: 1.0,
            velocity_decay: 0.4,
            center_strength: 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum TickOutcome {
    /// Positions changed this tick.
    Moved,
    /// Alpha fell below the floor; the simulation has stopped.
    Cooled,
    Idle,
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    charges: Vec<f32>,
    pushes: Vec<Vec2>,
    link_counts: Vec<u32>,
}

pub(in crate::app) struct Simulation {
    alpha: f32,
    alpha_target: f32,
    alpha_min: f32,
    alpha_decay: f32,
    center: Vec2,
    pub(in crate::app) config: ForceConfig,
    scratch: PhysicsScratch,
    running: bool,
}

impl Simulation {
    pub(in crate::app) fn new(center: Vec2) -> Self {
        Self {
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_min: ALPHA_MIN,
            alpha_decay: ALPHA_DECAY,
            center,
            config: ForceConfig::default(),
            scratch: PhysicsScratch::default(),
            running: false,
        }
    }

    pub(in crate::app) fn alpha(&self) -> f32 {
        self.alpha
    }

    pub(in crate::app) fn is_running(&self) -> bool {
        self.running
    }

    pub(in crate::app) fn center(&self) -> Vec2 {
        self.center
    }

    /// Keeps the simulation warm while a node is dragged.
    pub(in crate::app) fn reheat(&mut self) {
        self.alpha_target = REHEAT_ALPHA_TARGET;
        self.running = true;
    }

    /// Lets alpha decay back to zero; the simulation stops on its own.
    pub(in crate::app) fn cool(&mut self) {
        self.alpha_target = 0.0;
    }

    pub(in crate::app) fn restart(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
        self.running = true;
    }

    pub(in crate::app) fn stop(&mut self) {
        self.running = false;
        self.alpha_target = 0.0;
    }

    /// Moves the centering target. A settled layout is nudged awake so it
    /// drifts towards the new centre instead of jumping.
    pub(in crate::app) fn set_center(&mut self, center: Vec2) {
        if (center - self.center).length_sq() <= 0.0001 {
            return;
        }
        self.center = center;
        if !self.running {
            self.alpha = self.alpha.max(RESIZE_ALPHA);
            self.running = true;
        }
    }

    /// Advances one step. `radii` is indexed like `nodes`.
    pub(in crate::app) fn tick(
        &mut self,
        nodes: &mut [Node],
        edges: &[Edge],
        radii: &[f32],
    ) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        if !nodes.is_empty() {
            self.apply_links(nodes, edges);
            self.apply_many_body(nodes, radii);
            self.integrate(nodes);
            self.apply_centering(nodes);
        }

        if self.alpha < self.alpha_min && self.alpha_target <= 0.0 {
            self.running = false;
            for node in nodes.iter_mut() {
                node.velocity = Vec2::ZERO;
            }
            debug!(node_count = nodes.len(), "layout settled");
            return TickOutcome::Cooled;
        }

        TickOutcome::Moved
    }

    fn apply_links(&mut self, nodes: &mut [Node], edges: &[Edge]) {
        let node_count = nodes.len();
        let counts = &mut self.scratch.link_counts;
        counts.clear();
        counts.resize(node_count, 0);
        for edge in edges {
            if edge.source < node_count && edge.target < node_count && edge.source != edge.target {
                counts[edge.source] += 1;
                counts[edge.target] += 1;
            }
        }

        let link_scale = self.config.link_scale.clamp(0.0, 3.0);
        for edge in edges {
            let (source, target) = (edge.source, edge.target);
            if source >= node_count || target >= node_count || source == target {
                continue;
            }

            let (distance, strength) = if edge.kind.is_knowledge() {
                (KNOWLEDGE_LINK_DISTANCE, KNOWLEDGE_LINK_STRENGTH)
            } else {
                (nodes[target].kind.parent_distance(), HIERARCHY_LINK_STRENGTH)
            };

            let mut delta = (nodes[target].pos + nodes[target].velocity)
                - (nodes[source].pos + nodes[source].velocity);
            let length = delta.length();
            if length <= 0.0001 {
                continue;
            }
            delta *= (length - distance) / length * self.alpha * strength * link_scale;

            // The endpoint with fewer links moves more.
            let bias = counts[source] as f32 / (counts[source] + counts[target]) as f32;
            nodes[target].velocity -= delta * bias;
            nodes[source].velocity += delta * (1.0 - bias);
        }
    }

    fn apply_many_body(&mut self, nodes: &mut [Node], radii: &[f32]) {
        let node_count = nodes.len();
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.charges.clear();
        scratch.pushes.clear();
        scratch.pushes.resize(node_count, Vec2::ZERO);
        let mut max_radius = 0.0_f32;
        for (index, node) in nodes.iter().enumerate() {
            scratch.positions.push(node.pos);
            scratch.charges.push(node.kind.charge());
            max_radius = max_radius.max(radii.get(index).copied().unwrap_or(0.0));
        }

        let Some(quadtree) = QuadNode::build(&scratch.positions, &scratch.charges) else {
            return;
        };

        let repulsion = RepulsionParams {
            alpha: self.alpha * self.config.repulsion_scale.clamp(0.0, 3.0),
            softening: REPULSION_SOFTENING,
            theta: BARNES_HUT_THETA,
        };
        for (index, node) in nodes.iter_mut().enumerate() {
            let mut force = Vec2::ZERO;
            accumulate_repulsion_for_node(
                &quadtree,
                index,
                &scratch.positions,
                &scratch.charges,
                repulsion,
                &mut force,
            );
            node.velocity += force;
        }

        if radii.len() < node_count {
            return;
        }
        let reach = (max_radius * 2.0) + COLLISION_MARGIN;
        accumulate_collision_pairs(
            &quadtree,
            &quadtree,
            true,
            &scratch.positions,
            radii,
            CollisionParams {
                strength: COLLISION_STRENGTH * self.config.collision_scale.clamp(0.0, 3.0),
                margin: COLLISION_MARGIN,
                max_distance_sq: reach * reach,
            },
            &mut scratch.pushes,
        );
        for (node, push) in nodes.iter_mut().zip(&scratch.pushes) {
            node.velocity += *push;
        }
    }

    fn integrate(&self, nodes: &mut [Node]) {
        let retain = 1.0 - self.config.velocity_decay.clamp(0.05, 0.95);
        for node in nodes.iter_mut() {
            if let Some(pin) = node.pin {
                node.pos = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }

            let mut velocity = node.velocity * retain;
            let speed_sq = velocity.length_sq();
            if speed_sq > MAX_SPEED * MAX_SPEED {
                velocity *= MAX_SPEED / speed_sq.sqrt();
            }
            if !velocity.x.is_finite() || !velocity.y.is_finite() {
                velocity = Vec2::ZERO;
            }
            node.velocity = velocity;
            node.pos += velocity;
        }
    }

    fn apply_centering(&self, nodes: &mut [Node]) {
        let mut centroid = Vec2::ZERO;
        for node in nodes.iter() {
            centroid += node.pos;
        }
        centroid /= nodes.len() as f32;

        let shift = (self.center - centroid) * self.config.center_strength.clamp(0.0, 1.0);
        if shift.length_sq() <= 0.000_001 {
            return;
        }
        for node in nodes.iter_mut().filter(|node| node.pin.is_none()) {
            node.pos += shift;
        }
    }
}
