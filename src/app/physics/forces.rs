use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

#[derive(Clone, Copy)]
pub(super) struct RepulsionParams {
    pub(super) alpha: f32,
    pub(super) softening: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) margin: f32,
    pub(super) max_distance_sq: f32,
}

fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn repulsion_between(point: Vec2, other: Vec2, charge: f32, softening: f32, fallback: Vec2) -> Vec2 {
    let delta = point - other;
    let distance_sq = delta.length_sq();
    let distance = distance_sq.sqrt();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        fallback
    };
    direction * (charge / (distance_sq + softening).sqrt())
}

pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    params: RepulsionParams,
    force: &mut Vec2,
) {
    if node.charge <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            *force += repulsion_between(
                point,
                positions[other],
                charges[other] * params.alpha,
                params.softening,
                fallback_direction(index, other),
            );
        }
        return;
    }

    let delta = point - node.center_of_charge;
    let distance = delta.length_sq().max(0.0001).sqrt();
    let can_approximate = !node.bounds.contains(point)
        && (node.bounds.side_length() / distance) < params.theta
        && node.population > 1;

    if can_approximate {
        *force += repulsion_between(
            point,
            node.center_of_charge,
            node.charge * params.alpha,
            params.softening,
            fallback_direction(index, node.population),
        );
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, charges, params, force);
    }
}

fn separate(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    forces: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance = delta.length();
    let min_distance = radii[from] + radii[to] + params.margin;
    if distance >= min_distance {
        return;
    }

    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        fallback_direction(from, to)
    };
    let push = direction * ((min_distance - distance) * params.strength * 0.5);
    forces[from] += push;
    forces[to] -= push;
}

/// Pushes apart every pair of nodes closer than their radii plus the margin.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    forces: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    separate(from, to, positions, radii, params, forces);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    separate(from, to, positions, radii, params, forces);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, positions, radii, params, forces);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, positions, radii, params, forces,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, positions, radii, params, forces);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, positions, radii, params, forces);
        }
    }
}
