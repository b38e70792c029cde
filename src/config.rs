//! Tunables for the layout engine.
//!
//! Every force constant lives here instead of being hardcoded in the force
//! terms. The struct deserializes with defaults for any missing field, so a
//! JSON file only needs to name what it overrides:
//!
//! ```json
//! { "radius_min": 12.0, "radius_max": 64.0, "collision_strength": 0.7 }
//! ```

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scale::RadiusRange;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub radius_min: f64,
    pub radius_max: f64,
    /// Point the cluster is pulled toward.
    pub center: DVec2,

    pub repulsion_strength: f64,
    /// Barnes-Hut opening criterion; `0.0` visits every pair exactly.
    pub repulsion_theta: f64,
    /// Floor applied to pair distances before the inverse-square falloff.
    pub repulsion_distance_min: f64,

    /// Fraction of the remaining overlap corrected per pass.
    pub collision_strength: f64,
    /// Gap kept between circle edges on top of the radii.
    pub collision_padding: f64,
    pub collision_iterations: usize,
    /// Overlap allowed to remain once the engine converges. The final
    /// positional sweep stops as soon as every pair is within it.
    pub settle_tolerance: f64,
    /// Cap on positional sweeps when the engine converges; `0` disables
    /// the sweep.
    pub settle_max_sweeps: usize,

    pub centering_strength: f64,
    pub axis_strength_x: f64,
    pub axis_strength_y: f64,

    /// Fraction of velocity kept from one tick to the next.
    pub velocity_decay: f64,
    pub max_velocity: f64,

    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// Resting target alpha cools toward when nothing holds the engine hot.
    pub alpha_target: f64,
    /// Target used while a drag is in progress.
    pub drag_alpha_target: f64,

    /// Seed for the jiggle applied to coincident nodes.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            radius_min: 20.0,
            radius_max: 80.0,
            center: DVec2::ZERO,
            repulsion_strength: 5.0,
            repulsion_theta: 0.9,
            repulsion_distance_min: 1.0,
            collision_strength: 0.8,
            collision_padding: 2.0,
            collision_iterations: 1,
            settle_tolerance: 0.1,
            settle_max_sweeps: 1_000,
            centering_strength: 1.0,
            axis_strength_x: 0.05,
            axis_strength_y: 0.05,
            velocity_decay: 0.6,
            max_velocity: 500.0,
            alpha_min,
            // reaches alpha_min from 1.0 in 300 ticks
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            drag_alpha_target: 0.3,
            seed: 0x7e4d_b0b1,
        }
    }
}

impl SimulationConfig {
    pub fn radius_range(&self) -> Result<RadiusRange, ValidationError> {
        RadiusRange::new(self.radius_min, self.radius_max)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.radius_range()?;

        if !self.center.is_finite() {
            return Err(ValidationError::InvalidParameter {
                name: "center",
                value: if self.center.x.is_finite() {
                    self.center.y
                } else {
                    self.center.x
                },
            });
        }

        non_negative("repulsion_strength", self.repulsion_strength)?;
        non_negative("repulsion_theta", self.repulsion_theta)?;
        non_negative("repulsion_distance_min", self.repulsion_distance_min)?;
        unit_interval("collision_strength", self.collision_strength)?;
        non_negative("collision_padding", self.collision_padding)?;
        if self.collision_iterations == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "collision_iterations",
                value: 0.0,
            });
        }
        non_negative("settle_tolerance", self.settle_tolerance)?;
        non_negative("centering_strength", self.centering_strength)?;
        non_negative("axis_strength_x", self.axis_strength_x)?;
        non_negative("axis_strength_y", self.axis_strength_y)?;
        unit_interval("velocity_decay", self.velocity_decay)?;
        positive("max_velocity", self.max_velocity)?;
        positive("alpha_min", self.alpha_min)?;
        unit_interval("alpha_min", self.alpha_min)?;
        positive("alpha_decay", self.alpha_decay)?;
        unit_interval("alpha_decay", self.alpha_decay)?;
        unit_interval("alpha_target", self.alpha_target)?;
        unit_interval("drag_alpha_target", self.drag_alpha_target)?;
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter { name, value })
    }
}

pub(crate) fn unit_interval(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter { name, value })
    }
}
