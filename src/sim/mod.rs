mod forces;
mod node;
mod quadtree;

use std::collections::HashMap;

use glam::DVec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace, warn};

pub use forces::{AxisPull, Bodies, Centering, Collision, Force, ForceField, Repulsion, SettleReport};
pub use node::{Item, Node, NodePosition};

use crate::config::{SimulationConfig, unit_interval};
use crate::error::{InvalidOperation, ValidationError};
use crate::scale::MagnitudeScale;
use node::{build_nodes, validate_items};

const REMAINING_TICKS_LIMIT: usize = 1_000_000;

#[derive(Debug, Default)]
struct PhysicsScratch {
    positions: Vec<DVec2>,
    velocities: Vec<DVec2>,
    radii: Vec<f64>,
    pinned: Vec<bool>,
}

impl PhysicsScratch {
    fn load(&mut self, nodes: &[Node]) {
        self.positions.clear();
        self.velocities.clear();
        self.radii.clear();
        self.pinned.clear();
        for node in nodes {
            self.positions.push(node.position);
            self.velocities.push(node.velocity);
            self.radii.push(node.radius);
            self.pinned.push(node.pin.is_some());
        }
    }
}

/// The layout engine: owns the node set, the cooling schedule and the tick
/// loop.
///
/// `alpha` starts at `1.0` after every [`seed`](Self::seed) and moves toward
/// `alpha_target` by `alpha_decay` each tick. Once both sit below
/// `alpha_min` the engine is converged and [`tick`](Self::tick) stops doing
/// work until something raises the target again. The tick that converges
/// also runs [`Collision::settle`] so the frozen layout has no overlap
/// beyond `settle_tolerance`.
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    forces: ForceField,
    scale: MagnitudeScale,
    nodes: Vec<Node>,
    index_by_id: HashMap<String, usize>,
    alpha: f64,
    alpha_target: f64,
    heat_holds: usize,
    generation: u64,
    ticks: u64,
    rng: StdRng,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, ValidationError> {
        let forces = ForceField::from_config(&config);
        Self::with_forces(config, forces)
    }

    pub fn with_forces(
        config: SimulationConfig,
        forces: ForceField,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        let scale = MagnitudeScale::fit([], config.radius_range()?);

        Ok(Self {
            alpha: 0.0,
            alpha_target: config.alpha_target,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            forces,
            scale,
            nodes: Vec::new(),
            index_by_id: HashMap::new(),
            heat_holds: 0,
            generation: 0,
            ticks: 0,
            scratch: PhysicsScratch::default(),
        })
    }

    /// Replaces the whole node set. On error nothing changes.
    pub fn seed(&mut self, items: &[Item]) -> Result<(), ValidationError> {
        validate_items(items)?;

        let scale = MagnitudeScale::fit(
            items.iter().map(|item| item.magnitude),
            self.config.radius_range()?,
        );
        let nodes = build_nodes(items, &scale, self.config.center);

        self.index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        self.nodes = nodes;
        self.scale = scale;
        self.alpha = 1.0;
        self.alpha_target = self.config.alpha_target;
        self.heat_holds = 0;
        self.generation += 1;
        self.ticks = 0;
        self.rng = StdRng::seed_from_u64(self.config.seed);

        debug!(
            nodes = self.nodes.len(),
            degenerate_scale = scale.is_degenerate(),
            "seeded simulation"
        );
        Ok(())
    }

    /// Advances one step and returns the positions to render. A no-op on a
    /// converged engine.
    pub fn tick(&mut self) -> Vec<NodePosition<'_>> {
        self.step();
        self.snapshot()
    }

    /// Ticks until converged or `max_ticks` steps have run; returns the
    /// number of steps taken.
    pub fn run_until_converged(&mut self, max_ticks: usize) -> usize {
        let mut taken = 0;
        while taken < max_ticks && self.step() {
            taken += 1;
        }
        taken
    }

    pub fn snapshot(&self) -> Vec<NodePosition<'_>> {
        self.nodes.iter().map(Node::snapshot).collect()
    }

    /// Drops every node and cools the engine. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.nodes.is_empty() {
            debug!(nodes = self.nodes.len(), ticks = self.ticks, "stopped simulation");
        }
        self.nodes = Vec::new();
        self.index_by_id = HashMap::new();
        self.scratch = PhysicsScratch::default();
        self.alpha = 0.0;
        self.alpha_target = self.config.alpha_target;
        self.heat_holds = 0;
        self.generation += 1;
    }

    pub fn is_converged(&self) -> bool {
        self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min
    }

    /// Ticks left before the engine converges, or `None` while the target
    /// alpha holds it hot.
    pub fn remaining_ticks(&self) -> Option<usize> {
        if self.nodes.is_empty() || self.is_converged() {
            return Some(0);
        }
        if self.alpha_target >= self.config.alpha_min {
            return None;
        }

        let mut alpha = self.alpha;
        let mut ticks = 0;
        while alpha >= self.config.alpha_min {
            alpha += (self.alpha_target - alpha) * self.config.alpha_decay;
            ticks += 1;
            if ticks >= REMAINING_TICKS_LIMIT {
                return None;
            }
        }
        Some(ticks)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f64) -> Result<(), ValidationError> {
        unit_interval("alpha_target", target)?;
        self.alpha_target = target;
        Ok(())
    }

    /// Sets alpha directly, e.g. to restart a full layout pass.
    pub fn reheat(&mut self, alpha: f64) -> Result<(), ValidationError> {
        unit_interval("alpha", alpha)?;
        debug!(from = self.alpha, to = alpha, "reheated simulation");
        self.alpha = alpha;
        Ok(())
    }

    /// Fixes a node at `point` until [`unpin`](Self::unpin). The node moves
    /// there immediately.
    pub fn pin(&mut self, id: &str, point: DVec2) -> Result<(), InvalidOperation> {
        if !point.is_finite() {
            return Err(InvalidOperation::NonFinitePoint(id.to_owned()));
        }
        let node = self.node_mut(id)?;
        node.pin = Some(point);
        node.position = point;
        node.velocity = DVec2::ZERO;
        Ok(())
    }

    /// Releases a pin; the node re-enters the force field at rest.
    pub fn unpin(&mut self, id: &str) -> Result<(), InvalidOperation> {
        let node = self.node_mut(id)?;
        node.pin = None;
        node.velocity = DVec2::ZERO;
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Scale fitted to the current node set.
    pub fn scale(&self) -> &MagnitudeScale {
        &self.scale
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Bumped by every [`seed`](Self::seed) and [`stop`](Self::stop), so
    /// callers can tell whether a node id still refers to the same node set.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Keeps the engine hot for an interaction until the matching
    /// [`release_heat`](Self::release_heat).
    pub(crate) fn hold_heat(&mut self, target: f64) {
        self.heat_holds += 1;
        self.alpha_target = self.alpha_target.max(target);
        debug!(holds = self.heat_holds, alpha_target = self.alpha_target, "holding heat");
    }

    pub(crate) fn release_heat(&mut self) {
        self.heat_holds = self.heat_holds.saturating_sub(1);
        if self.heat_holds == 0 {
            self.alpha_target = self.config.alpha_target;
        }
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node, InvalidOperation> {
        let index = *self
            .index_by_id
            .get(id)
            .ok_or_else(|| InvalidOperation::UnknownNode(id.to_owned()))?;
        Ok(&mut self.nodes[index])
    }

    fn step(&mut self) -> bool {
        let node_count = self.nodes.len();
        if node_count == 0 || self.is_converged() {
            return false;
        }

        let scratch = &mut self.scratch;
        scratch.load(&self.nodes);

        let mut bodies = Bodies {
            positions: &scratch.positions,
            velocities: &mut scratch.velocities,
            radii: &scratch.radii,
            pinned: &scratch.pinned,
        };
        self.forces.apply(&mut bodies, self.alpha, &mut self.rng);

        let max_velocity = self.config.max_velocity;
        let mut clamped = 0usize;
        for (node, velocity) in self.nodes.iter_mut().zip(&scratch.velocities) {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = DVec2::ZERO;
                continue;
            }

            let mut velocity = *velocity * self.config.velocity_decay;
            if !velocity.is_finite() {
                velocity = DVec2::ZERO;
                clamped += 1;
            } else if velocity.length_squared() > max_velocity * max_velocity {
                velocity *= max_velocity / velocity.length();
                clamped += 1;
            }

            let next = node.position + velocity;
            if next.is_finite() {
                node.position = next;
                node.velocity = velocity;
            } else {
                node.velocity = DVec2::ZERO;
                clamped += 1;
            }
        }
        if clamped > 0 {
            debug!(clamped, tick = self.ticks, "clamped unstable node motion");
        }

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        self.ticks += 1;
        trace!(tick = self.ticks, alpha = self.alpha, nodes = node_count, "ticked");

        if self.is_converged() {
            self.settle();
            debug!(ticks = self.ticks, "simulation converged");
        }
        true
    }

    fn settle(&mut self) {
        let Some(collision) = self.forces.collision().copied() else {
            return;
        };
        let tolerance = self.config.settle_tolerance;
        if self.config.settle_max_sweeps == 0 || self.nodes.len() < 2 {
            return;
        }

        let scratch = &mut self.scratch;
        scratch.load(&self.nodes);
        let report = collision.settle(
            &mut scratch.positions,
            &scratch.radii,
            &scratch.pinned,
            tolerance,
            self.config.settle_max_sweeps,
        );
        for (node, position) in self.nodes.iter_mut().zip(&scratch.positions) {
            if node.pin.is_none() {
                node.position = *position;
            }
        }

        if report.worst_overlap > tolerance {
            warn!(
                sweeps = report.sweeps,
                worst_overlap = report.worst_overlap,
                "overlap left after settling"
            );
        } else if report.sweeps > 0 {
            debug!(sweeps = report.sweeps, "settled remaining overlap");
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::dvec2;
    use rand::Rng;

    use super::*;

    fn simulation() -> Simulation {
        Simulation::new(SimulationConfig::default()).unwrap()
    }

    fn random_items(seed: u64, count: usize) -> Vec<Item> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|index| {
                Item::new(
                    format!("item-{index}"),
                    rng.random_range(0.0..10_000.0),
                    ["angry", "happy", "sad", "neutral"][index % 4],
                )
            })
            .collect()
    }

    fn positions(simulation: &Simulation) -> Vec<(String, f64, f64)> {
        simulation
            .snapshot()
            .iter()
            .map(|position| (position.id.to_owned(), position.x, position.y))
            .collect()
    }

    fn assert_no_overlap(simulation: &Simulation, tolerance: f64) {
        let nodes = simulation.nodes();
        for (index, a) in nodes.iter().enumerate() {
            for b in &nodes[index + 1..] {
                if a.is_pinned() || b.is_pinned() {
                    continue;
                }
                let distance = a.position().distance(b.position());
                assert!(
                    distance >= a.radius() + b.radius() - tolerance,
                    "{} and {} overlap: distance {distance}, radii {} + {}",
                    a.id(),
                    b.id(),
                    a.radius(),
                    b.radius()
                );
            }
        }
    }

    #[test]
    fn seeding_starts_hot_with_scaled_radii() {
        let mut simulation = simulation();
        assert!(simulation.is_converged());

        simulation
            .seed(&[
                Item::new("small", 0.0, "sad"),
                Item::new("large", 400.0, "angry"),
                Item::new("medium", 100.0, "happy"),
            ])
            .unwrap();

        assert_eq!(simulation.alpha(), 1.0);
        assert_eq!(simulation.len(), 3);
        assert_eq!(simulation.node("small").unwrap().radius(), 20.0);
        assert_eq!(simulation.node("large").unwrap().radius(), 80.0);
        assert_eq!(simulation.node("medium").unwrap().radius(), 50.0);
        assert_eq!(simulation.node("medium").unwrap().category(), "happy");
    }

    #[test]
    fn converges_without_overlap() {
        for seed in [1, 2, 3] {
            let mut simulation = simulation();
            simulation.seed(&random_items(seed, 20)).unwrap();

            let ticks = simulation.run_until_converged(10_000);
            assert!(simulation.is_converged());
            assert!(ticks < 10_000);
            assert_no_overlap(&simulation, 1.0);
        }
    }

    #[test]
    fn large_sets_converge_without_overlap() {
        for (count, seeds) in [(50, 21..26), (100, 31..36), (200, 41..44)] {
            for seed in seeds {
                let mut simulation = simulation();
                simulation.seed(&random_items(seed, count)).unwrap();
                simulation.run_until_converged(10_000);

                assert!(simulation.is_converged());
                assert_no_overlap(&simulation, 1.0);
            }
        }
    }

    #[test]
    fn converging_settles_overlap_left_by_cooling() {
        // a single weak collision pass cannot keep up with cooling on its own
        let config = SimulationConfig {
            collision_strength: 0.05,
            ..SimulationConfig::default()
        };
        let mut unsettled = Simulation::new(SimulationConfig {
            settle_max_sweeps: 0,
            ..config.clone()
        })
        .unwrap();
        let mut settled = Simulation::new(config).unwrap();
        unsettled.seed(&random_items(17, 120)).unwrap();
        settled.seed(&random_items(17, 120)).unwrap();
        unsettled.run_until_converged(10_000);
        settled.run_until_converged(10_000);

        let worst = |simulation: &Simulation| {
            let nodes = simulation.nodes();
            let mut worst = f64::NEG_INFINITY;
            for (index, a) in nodes.iter().enumerate() {
                for b in &nodes[index + 1..] {
                    worst = worst.max(a.radius() + b.radius() - a.position().distance(b.position()));
                }
            }
            worst
        };
        assert!(worst(&unsettled) > 1.0);
        assert!(worst(&settled) <= 1.0);

        // settling happens once, on the converging tick
        let frozen = positions(&settled);
        settled.tick();
        assert_eq!(positions(&settled), frozen);
    }

    #[test]
    fn settling_keeps_pins_fixed() {
        let mut simulation = simulation();
        simulation.seed(&random_items(18, 60)).unwrap();
        simulation.pin("item-7", dvec2(0.0, 0.0)).unwrap();
        simulation.run_until_converged(10_000);

        let pinned = simulation.node("item-7").unwrap();
        assert_eq!(pinned.position(), dvec2(0.0, 0.0));
        assert_no_overlap(&simulation, 1.0);
        let pinned = simulation.node("item-7").unwrap();
        for node in simulation.nodes() {
            if node.id() != "item-7" {
                assert!(
                    node.position().distance(pinned.position())
                        >= node.radius() + pinned.radius() - 1.0
                );
            }
        }
    }

    #[test]
    fn seed_and_stop_bump_the_generation() {
        let mut simulation = simulation();
        let start = simulation.generation();
        simulation.seed(&random_items(19, 3)).unwrap();
        assert_eq!(simulation.generation(), start + 1);
        assert!(simulation.seed(&[Item::new("bad", -1.0, "")]).is_err());
        assert_eq!(simulation.generation(), start + 1);
        simulation.stop();
        assert_eq!(simulation.generation(), start + 2);
    }

    #[test]
    fn convergence_takes_a_bounded_number_of_ticks() {
        let mut simulation = simulation();
        simulation.seed(&random_items(9, 50)).unwrap();

        let expected = simulation.remaining_ticks().unwrap();
        assert!((295..=305).contains(&expected));
        assert_eq!(simulation.run_until_converged(usize::MAX), expected);
        assert_eq!(simulation.remaining_ticks(), Some(0));
    }

    #[test]
    fn equal_magnitudes_spread_without_overlap() {
        let mut simulation = simulation();
        let items = (0..5)
            .map(|index| Item::new(format!("n{index}"), 100.0, "neutral"))
            .collect::<Vec<_>>();
        simulation.seed(&items).unwrap();
        assert!(simulation.nodes().iter().all(|node| node.radius() == 50.0));

        simulation.run_until_converged(10_000);
        assert_no_overlap(&simulation, 1.0);
    }

    #[test]
    fn cluster_settles_around_the_center() {
        let config = SimulationConfig {
            center: dvec2(480.0, 320.0),
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(config).unwrap();
        simulation.seed(&random_items(4, 30)).unwrap();
        simulation.run_until_converged(10_000);

        let centroid = simulation
            .nodes()
            .iter()
            .map(Node::position)
            .sum::<DVec2>()
            / 30.0;
        assert!(centroid.distance(dvec2(480.0, 320.0)) < 1.0);
    }

    #[test]
    fn pinned_node_holds_its_point_every_tick() {
        let mut simulation = simulation();
        simulation.seed(&random_items(5, 20)).unwrap();
        simulation.pin("item-3", dvec2(100.0, 100.0)).unwrap();

        for _ in 0..200 {
            let frame = simulation.tick();
            let pinned = frame
                .iter()
                .find(|position| position.id == "item-3")
                .unwrap();
            assert_eq!((pinned.x, pinned.y), (100.0, 100.0));
        }
        assert_eq!(simulation.node("item-3").unwrap().velocity(), DVec2::ZERO);
    }

    #[test]
    fn pinning_a_converged_engine_reports_the_pin() {
        let mut simulation = simulation();
        simulation.seed(&random_items(6, 8)).unwrap();
        simulation.run_until_converged(10_000);

        simulation.pin("item-0", dvec2(-40.0, 12.5)).unwrap();
        let frame = simulation.tick();
        assert_eq!((frame[0].x, frame[0].y), (-40.0, 12.5));
    }

    #[test]
    fn unpinned_node_moves_again_while_hot() {
        let mut simulation = simulation();
        simulation.seed(&random_items(7, 10)).unwrap();
        simulation.pin("item-1", dvec2(400.0, 400.0)).unwrap();
        for _ in 0..20 {
            simulation.tick();
        }

        simulation.unpin("item-1").unwrap();
        assert!(simulation.alpha() > 0.0);
        simulation.tick();
        assert_ne!(
            simulation.node("item-1").unwrap().position(),
            dvec2(400.0, 400.0)
        );
    }

    #[test]
    fn pin_rejects_unknown_ids_and_bad_points() {
        let mut simulation = simulation();
        simulation.seed(&random_items(8, 3)).unwrap();
        let before = positions(&simulation);

        assert_eq!(
            simulation.pin("nope", DVec2::ZERO),
            Err(InvalidOperation::UnknownNode("nope".to_owned()))
        );
        assert_eq!(
            simulation.pin("item-0", dvec2(f64::NAN, 0.0)),
            Err(InvalidOperation::NonFinitePoint("item-0".to_owned()))
        );
        assert_eq!(
            simulation.unpin("nope"),
            Err(InvalidOperation::UnknownNode("nope".to_owned()))
        );
        assert_eq!(positions(&simulation), before);
    }

    #[test]
    fn rejected_seed_keeps_the_previous_layout() {
        let mut simulation = simulation();
        simulation.seed(&random_items(10, 12)).unwrap();
        for _ in 0..40 {
            simulation.tick();
        }
        let before = positions(&simulation);
        let alpha = simulation.alpha();

        let error = simulation
            .seed(&[Item::new("fine", 3.0, ""), Item::new("bad", -5.0, "")])
            .unwrap_err();
        assert_eq!(
            error,
            ValidationError::NegativeMagnitude {
                id: "bad".to_owned(),
                magnitude: -5.0
            }
        );
        assert_eq!(positions(&simulation), before);
        assert_eq!(simulation.alpha(), alpha);

        assert!(simulation.seed(&[Item::new("x", 1.0, ""), Item::new("x", 2.0, "")]).is_err());
        assert!(simulation.seed(&[Item::new("y", f64::NAN, "")]).is_err());
        assert_eq!(positions(&simulation), before);
    }

    #[test]
    fn reseeding_discards_all_prior_state() {
        let mut simulation = simulation();
        simulation.seed(&random_items(11, 10)).unwrap();
        simulation.pin("item-2", dvec2(500.0, 500.0)).unwrap();
        simulation.run_until_converged(10_000);
        assert!(simulation.is_converged());

        let mut fresh = self::simulation();
        fresh.seed(&random_items(11, 10)).unwrap();

        simulation.seed(&random_items(11, 10)).unwrap();
        assert_eq!(simulation.alpha(), 1.0);
        assert_eq!(simulation.tick_count(), 0);
        assert!(simulation.nodes().iter().all(|node| !node.is_pinned()));
        assert!(
            simulation
                .nodes()
                .iter()
                .all(|node| node.velocity() == DVec2::ZERO)
        );
        assert_eq!(positions(&simulation), positions(&fresh));

        // same input, same seed, same layout
        simulation.run_until_converged(10_000);
        fresh.run_until_converged(10_000);
        assert_eq!(positions(&simulation), positions(&fresh));
    }

    #[test]
    fn converged_ticks_are_idempotent() {
        let mut simulation = simulation();
        simulation.seed(&random_items(12, 15)).unwrap();
        simulation.run_until_converged(10_000);
        assert_eq!(simulation.alpha_target(), 0.0);

        let first = positions(&simulation);
        let ticks = simulation.tick_count();
        simulation.tick();
        simulation.tick();
        assert_eq!(positions(&simulation), first);
        assert_eq!(simulation.tick_count(), ticks);
    }

    #[test]
    fn raising_the_target_reheats_without_resetting_positions() {
        let mut simulation = simulation();
        simulation.seed(&random_items(13, 15)).unwrap();
        simulation.run_until_converged(10_000);
        let settled = positions(&simulation);
        let alpha = simulation.alpha();

        simulation.set_alpha_target(0.3).unwrap();
        assert!(!simulation.is_converged());
        assert_eq!(positions(&simulation), settled);
        assert_eq!(simulation.remaining_ticks(), None);

        simulation.tick();
        assert!(simulation.alpha() > alpha);

        simulation.set_alpha_target(0.0).unwrap();
        assert!(simulation.remaining_ticks().is_some());
        simulation.run_until_converged(10_000);
        assert!(simulation.is_converged());

        assert!(simulation.set_alpha_target(1.5).is_err());
        assert!(simulation.reheat(-0.1).is_err());
    }

    #[test]
    fn stop_is_idempotent_and_inert() {
        let mut simulation = simulation();
        simulation.seed(&random_items(14, 6)).unwrap();
        simulation.stop();
        simulation.stop();

        assert!(simulation.is_empty());
        assert!(simulation.is_converged());
        assert!(simulation.tick().is_empty());
        assert_eq!(simulation.run_until_converged(100), 0);

        simulation.seed(&random_items(14, 6)).unwrap();
        assert_eq!(simulation.len(), 6);
        assert_eq!(simulation.alpha(), 1.0);
    }

    #[test]
    fn empty_seed_is_valid_and_inert() {
        let mut simulation = simulation();
        simulation.seed(&[]).unwrap();
        assert!(simulation.tick().is_empty());
        assert_eq!(simulation.remaining_ticks(), Some(0));
    }

    struct Blowup;

    impl Force for Blowup {
        fn apply(&self, bodies: &mut Bodies<'_>, _alpha: f64, _rng: &mut StdRng) {
            bodies.velocities[0] = dvec2(f64::NAN, 1.0);
            bodies.velocities[1] = dvec2(1e300, -1e300);
            bodies.velocities[2] = dvec2(f64::INFINITY, 0.0);
        }
    }

    #[test]
    fn unstable_forces_are_clamped_not_propagated() {
        let config = SimulationConfig::default();
        let max_velocity = config.max_velocity;
        let mut simulation =
            Simulation::with_forces(config, ForceField::new().with(Blowup)).unwrap();
        simulation.seed(&random_items(15, 3)).unwrap();

        for _ in 0..5 {
            for position in simulation.tick() {
                assert!(position.x.is_finite() && position.y.is_finite());
            }
        }
        for node in simulation.nodes() {
            assert!(node.velocity().is_finite());
            assert!(node.velocity().length() <= max_velocity + 1e-9);
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = SimulationConfig {
            radius_min: 50.0,
            radius_max: 10.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(ValidationError::InvalidRadiusRange { .. })
        ));
    }
}
