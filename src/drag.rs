use glam::DVec2;
use tracing::debug;

use crate::config::unit_interval;
use crate::error::{InvalidOperation, ValidationError};
use crate::sim::Simulation;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        id: String,
        pointer: DVec2,
        /// [`Simulation::generation`] the drag started in.
        generation: u64,
    },
}

/// Turns pointer drag gestures into pins on a [`Simulation`].
///
/// One controller drags at most one node. Run several controllers side by
/// side for multi-touch; each keeps the engine hot until its own drag ends.
#[derive(Clone, Debug)]
pub struct DragController {
    state: DragState,
    reheat_target: f64,
}

impl DragController {
    pub fn new(reheat_target: f64) -> Result<Self, ValidationError> {
        unit_interval("reheat_target", reheat_target)?;
        Ok(Self {
            state: DragState::Idle,
            reheat_target,
        })
    }

    /// Controller using the simulation's configured drag target.
    pub fn for_simulation(simulation: &Simulation) -> Self {
        Self {
            state: DragState::Idle,
            reheat_target: simulation.config().drag_alpha_target,
        }
    }

    pub fn reheat_target(&self) -> f64 {
        self.reheat_target
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn dragged_id(&self) -> Option<&str> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { id, .. } => Some(id),
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged_id().is_some()
    }

    /// Pins the node where it currently sits and holds the engine hot.
    pub fn on_drag_start(
        &mut self,
        simulation: &mut Simulation,
        id: &str,
        point: DVec2,
    ) -> Result<(), InvalidOperation> {
        if let Some(active) = self.dragged_id() {
            return Err(InvalidOperation::AlreadyDragging {
                active: active.to_owned(),
                requested: id.to_owned(),
            });
        }
        if !point.is_finite() {
            return Err(InvalidOperation::NonFinitePoint(id.to_owned()));
        }
        let position = simulation
            .node(id)
            .map(|node| node.position())
            .ok_or_else(|| InvalidOperation::UnknownNode(id.to_owned()))?;

        simulation.pin(id, position)?;
        simulation.hold_heat(self.reheat_target);
        self.state = DragState::Dragging {
            id: id.to_owned(),
            pointer: point,
            generation: simulation.generation(),
        };
        debug!(id, x = position.x, y = position.y, "drag started");
        Ok(())
    }

    /// Moves the pin to `point`. Ticking stays with the caller's clock.
    pub fn on_drag_move(
        &mut self,
        simulation: &mut Simulation,
        id: &str,
        point: DVec2,
    ) -> Result<(), InvalidOperation> {
        self.ensure_dragging(simulation, id)?;
        simulation.pin(id, point)?;
        if let DragState::Dragging { pointer, .. } = &mut self.state {
            *pointer = point;
        }
        Ok(())
    }

    /// Releases the node at its last pinned position with zero velocity and
    /// lets the engine cool once no other drag holds it.
    pub fn on_drag_end(
        &mut self,
        simulation: &mut Simulation,
        id: &str,
    ) -> Result<(), InvalidOperation> {
        self.ensure_dragging(simulation, id)?;
        simulation.unpin(id)?;
        simulation.release_heat();
        self.state = DragState::Idle;
        debug!(id, "drag ended");
        Ok(())
    }

    /// Forgets the current drag without touching the simulation, for when
    /// the node set was replaced mid-gesture.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// The drag must be this controller's and must belong to the node set
    /// the simulation holds now; a re-seed in between invalidates it.
    fn ensure_dragging(&self, simulation: &Simulation, id: &str) -> Result<(), InvalidOperation> {
        match &self.state {
            DragState::Dragging {
                id: active,
                generation,
                ..
            } if active == id => {
                if *generation == simulation.generation() {
                    Ok(())
                } else {
                    Err(InvalidOperation::StaleDrag(id.to_owned()))
                }
            }
            _ => Err(InvalidOperation::NotDragging(id.to_owned())),
        }
    }
}
