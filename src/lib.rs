//! Force-directed bubble layout for weighted, categorised items.
//!
//! [`sim::Simulation`] owns the node set and the tick loop,
//! [`drag::DragController`] turns pointer gestures into pins, and
//! [`trend`] adapts trend backend JSON into seed items.

pub mod config;
pub mod drag;
pub mod error;
pub mod scale;
pub mod sim;
pub mod trend;

pub use config::SimulationConfig;
pub use drag::{DragController, DragState};
pub use error::{InvalidOperation, SimError, SimResult, ValidationError};
pub use scale::{MagnitudeScale, RadiusRange};
pub use sim::{Item, Node, NodePosition, Simulation};
