//! Force terms applied once per tick.
//!
//! Velocity terms ([`Repulsion`], [`Centering`], [`AxisPull`]) add into each
//! body's velocity. [`Collision`] then looks at where every body is about to
//! land (`position + velocity`) and corrects velocities so overlapping
//! circles separate. A [`ForceField`] always runs collision last.

use std::fmt;

use glam::{DVec2, dvec2};
use rand::Rng;
use rand::rngs::StdRng;

use super::quadtree::QuadNode;
use crate::config::SimulationConfig;

/// Structure-of-arrays view of the node set for one tick.
pub struct Bodies<'a> {
    pub positions: &'a [DVec2],
    pub velocities: &'a mut [DVec2],
    pub radii: &'a [f64],
    pub pinned: &'a [bool],
}

impl Bodies<'_> {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub trait Force {
    fn apply(&self, bodies: &mut Bodies<'_>, alpha: f64, rng: &mut StdRng);
}

/// Ordered set of force terms with collision resolution pinned to the end.
#[derive(Default)]
pub struct ForceField {
    terms: Vec<Box<dyn Force + Send + Sync>>,
    collision: Option<Collision>,
}

impl ForceField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new()
            .with(Repulsion {
                strength: config.repulsion_strength,
                theta: config.repulsion_theta,
                distance_min: config.repulsion_distance_min,
            })
            .with(Centering {
                center: config.center,
                strength: config.centering_strength,
            })
            .with(AxisPull {
                target: config.center,
                strength: dvec2(config.axis_strength_x, config.axis_strength_y),
            })
            .with_collision(Collision {
                strength: config.collision_strength,
                padding: config.collision_padding,
                iterations: config.collision_iterations,
            })
    }

    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Force + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    pub fn with_collision(mut self, collision: Collision) -> Self {
        self.collision = Some(collision);
        self
    }

    pub fn collision(&self) -> Option<&Collision> {
        self.collision.as_ref()
    }

    pub fn apply(&self, bodies: &mut Bodies<'_>, alpha: f64, rng: &mut StdRng) {
        for term in &self.terms {
            term.apply(bodies, alpha, rng);
        }
        if let Some(collision) = &self.collision {
            collision.apply(bodies, alpha, rng);
        }
    }
}

impl fmt::Debug for ForceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceField")
            .field("terms", &self.terms.len())
            .field("collision", &self.collision)
            .finish()
    }
}

/// Inverse-square charge between every pair of nodes, approximated with
/// Barnes-Hut for far-away cells.
#[derive(Clone, Copy, Debug)]
pub struct Repulsion {
    pub strength: f64,
    pub theta: f64,
    pub distance_min: f64,
}

#[derive(Clone, Copy)]
struct RepulsionParams {
    strength: f64,
    theta_sq: f64,
    distance_min_sq: f64,
}

impl Force for Repulsion {
    fn apply(&self, bodies: &mut Bodies<'_>, alpha: f64, rng: &mut StdRng) {
        if bodies.len() < 2 || self.strength <= 0.0 {
            return;
        }
        let Some(tree) = QuadNode::build(bodies.positions, bodies.radii) else {
            return;
        };

        let params = RepulsionParams {
            strength: self.strength * alpha,
            theta_sq: self.theta * self.theta,
            distance_min_sq: self.distance_min * self.distance_min,
        };

        for index in 0..bodies.len() {
            if bodies.pinned[index] {
                continue;
            }
            let mut delta_v = DVec2::ZERO;
            accumulate_repulsion_for_node(&tree, index, bodies.positions, params, rng, &mut delta_v);
            bodies.velocities[index] += delta_v;
        }
    }
}

fn jiggle(rng: &mut StdRng) -> DVec2 {
    dvec2(
        (rng.random::<f64>() - 0.5) * 1e-6,
        (rng.random::<f64>() - 0.5) * 1e-6,
    )
}

fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[DVec2],
    params: RepulsionParams,
    rng: &mut StdRng,
    delta_v: &mut DVec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = point - positions[other_index];
            if delta == DVec2::ZERO {
                delta = jiggle(rng);
            }
            let distance_sq = delta.length_squared().max(params.distance_min_sq);
            *delta_v += delta * (params.strength / distance_sq);
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_squared();
    let side = node.cell.side_length();
    let can_approximate =
        !node.cell.contains(point) && (side * side) < (params.theta_sq * distance_sq);

    if can_approximate {
        let distance_sq = distance_sq.max(params.distance_min_sq);
        *delta_v += delta * (params.strength * node.mass / distance_sq);
        return;
    }

    for child in &node.children {
        accumulate_repulsion_for_node(child, index, positions, params, rng, delta_v);
    }
}

/// Shifts every free node by the offset of the free nodes' centroid from
/// `center`, scaled by `strength`. Independent of alpha.
#[derive(Clone, Copy, Debug)]
pub struct Centering {
    pub center: DVec2,
    pub strength: f64,
}

impl Force for Centering {
    fn apply(&self, bodies: &mut Bodies<'_>, _alpha: f64, _rng: &mut StdRng) {
        let mut sum = DVec2::ZERO;
        let mut count = 0usize;
        for (position, pinned) in bodies.positions.iter().zip(bodies.pinned) {
            if !pinned {
                sum += *position;
                count += 1;
            }
        }
        if count == 0 {
            return;
        }

        let shift = ((sum / count as f64) - self.center) * self.strength;
        for (velocity, pinned) in bodies.velocities.iter_mut().zip(bodies.pinned) {
            if !pinned {
                *velocity -= shift;
            }
        }
    }
}

/// Per-node spring toward `target`, with an independent strength per axis.
#[derive(Clone, Copy, Debug)]
pub struct AxisPull {
    pub target: DVec2,
    pub strength: DVec2,
}

impl Force for AxisPull {
    fn apply(&self, bodies: &mut Bodies<'_>, alpha: f64, _rng: &mut StdRng) {
        let scale = self.strength * alpha;
        for index in 0..bodies.len() {
            if bodies.pinned[index] {
                continue;
            }
            bodies.velocities[index] += (self.target - bodies.positions[index]) * scale;
        }
    }
}

/// Pushes apart pairs whose tentative positions sit closer than the sum of
/// their radii plus `padding`. Each pass removes `strength` of the overlap,
/// split between the pair by the other node's share of the squared radii,
/// so small circles yield to large ones. A pinned node never moves; its
/// partner takes the whole correction. Independent of alpha.
#[derive(Clone, Copy, Debug)]
pub struct Collision {
    pub strength: f64,
    pub padding: f64,
    pub iterations: usize,
}

/// Outcome of [`Collision::settle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SettleReport {
    pub sweeps: usize,
    /// Largest remaining `r_i + r_j - distance` over touching pairs with at
    /// least one free node; zero or negative when nothing overlaps.
    pub worst_overlap: f64,
}

impl Force for Collision {
    fn apply(&self, bodies: &mut Bodies<'_>, _alpha: f64, _rng: &mut StdRng) {
        let node_count = bodies.len();
        if node_count < 2 || self.strength <= 0.0 || self.iterations == 0 {
            return;
        }

        let mut tentative = tentative_positions(bodies);
        let Some(mut tree) = QuadNode::build(&tentative, bodies.radii) else {
            return;
        };
        let mut pairs = Vec::new();
        let mut corrections = vec![DVec2::ZERO; node_count];

        for iteration in 0..self.iterations {
            if iteration > 0 {
                tentative = tentative_positions(bodies);
                tree.refit(&tentative, bodies.radii);
            }
            tree.candidate_pairs(self.padding, &mut pairs);

            corrections.fill(DVec2::ZERO);
            for &(from, to) in &pairs {
                let Some((push_from, push_to)) = separation(
                    from,
                    to,
                    &tentative,
                    bodies.radii,
                    bodies.pinned,
                    self.padding,
                    self.strength,
                ) else {
                    continue;
                };
                corrections[from] += push_from;
                corrections[to] += push_to;
            }

            for (velocity, correction) in bodies.velocities.iter_mut().zip(&corrections) {
                *velocity += *correction;
            }
        }
    }
}

impl Collision {
    /// Moves free nodes directly, one pair at a time, until no two circles
    /// overlap by more than `tolerance` or `max_sweeps` passes have run.
    /// Pinned nodes stay put.
    ///
    /// Each resolved pair is pushed to `r_i + r_j + tolerance` so that
    /// neighbouring corrections rarely reopen it.
    pub fn settle(
        &self,
        positions: &mut [DVec2],
        radii: &[f64],
        pinned: &[bool],
        tolerance: f64,
        max_sweeps: usize,
    ) -> SettleReport {
        let mut report = SettleReport {
            sweeps: 0,
            worst_overlap: f64::NEG_INFINITY,
        };
        let Some(mut tree) = QuadNode::build(positions, radii) else {
            return report;
        };
        let mut pairs = Vec::new();

        loop {
            tree.refit(positions, radii);
            tree.candidate_pairs(tolerance, &mut pairs);
            report.worst_overlap = pairs
                .iter()
                .filter(|&&(from, to)| !(pinned[from] && pinned[to]))
                .map(|&(from, to)| radii[from] + radii[to] - positions[from].distance(positions[to]))
                .fold(f64::NEG_INFINITY, f64::max);
            if report.worst_overlap <= tolerance || report.sweeps >= max_sweeps {
                return report;
            }

            for &(from, to) in &pairs {
                let distance = positions[from].distance(positions[to]);
                if distance >= radii[from] + radii[to] {
                    continue;
                }
                if let Some((push_from, push_to)) =
                    separation(from, to, positions, radii, pinned, tolerance, 1.0)
                {
                    positions[from] += push_from;
                    positions[to] += push_to;
                }
            }
            report.sweeps += 1;
        }
    }
}

fn tentative_positions(bodies: &Bodies<'_>) -> Vec<DVec2> {
    bodies
        .positions
        .iter()
        .zip(bodies.velocities.iter())
        .map(|(position, velocity)| *position + *velocity)
        .collect()
}

fn separation_direction(from: usize, to: usize) -> DVec2 {
    let angle = ((from as f64) * 0.618_034 + (to as f64) * 0.414_214) * std::f64::consts::TAU;
    DVec2::from_angle(angle)
}

/// Displacements for a pair that sits closer than `r_from + r_to + padding`,
/// removing `strength` of the gap. `None` when the pair is clear or both
/// ends are pinned.
fn separation(
    from: usize,
    to: usize,
    positions: &[DVec2],
    radii: &[f64],
    pinned: &[bool],
    padding: f64,
    strength: f64,
) -> Option<(DVec2, DVec2)> {
    let (from_pinned, to_pinned) = (pinned[from], pinned[to]);
    if from_pinned && to_pinned {
        return None;
    }

    let min_distance = radii[from] + radii[to] + padding;
    let delta = positions[from] - positions[to];
    let distance_sq = delta.length_squared();
    if distance_sq >= min_distance * min_distance {
        return None;
    }

    let distance = distance_sq.sqrt();
    let direction = if distance > 1e-9 {
        delta / distance
    } else {
        separation_direction(from, to)
    };
    let push = (min_distance - distance) * strength;

    let (from_share, to_share) = if from_pinned {
        (0.0, 1.0)
    } else if to_pinned {
        (1.0, 0.0)
    } else {
        let from_weight = radii[from] * radii[from];
        let to_weight = radii[to] * radii[to];
        let total = from_weight + to_weight;
        if total > 0.0 {
            (to_weight / total, from_weight / total)
        } else {
            (0.5, 0.5)
        }
    };

    Some((direction * (push * from_share), -direction * (push * to_share)))
}
