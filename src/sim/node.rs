use std::collections::HashSet;
use std::f64::consts::PI;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scale::MagnitudeScale;

/// One weighted input record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub magnitude: f64,
    /// Rendering tag; the engine never looks at it.
    #[serde(default)]
    pub category: String,
}

impl Item {
    pub fn new(id: impl Into<String>, magnitude: f64, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            magnitude,
            category: category.into(),
        }
    }
}

/// Per-node simulation state.
#[derive(Clone, Debug)]
pub struct Node {
    pub(super) id: String,
    pub(super) magnitude: f64,
    pub(super) category: String,
    pub(super) radius: f64,
    pub(super) position: DVec2,
    pub(super) velocity: DVec2,
    pub(super) pin: Option<DVec2>,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn velocity(&self) -> DVec2 {
        self.velocity
    }

    pub fn pin(&self) -> Option<DVec2> {
        self.pin
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }

    pub(super) fn snapshot(&self) -> NodePosition<'_> {
        NodePosition {
            id: &self.id,
            category: &self.category,
            x: self.position.x,
            y: self.position.y,
            radius: self.radius,
        }
    }
}

/// Read-only per-tick view of a node, handed to the rendering layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NodePosition<'a> {
    pub id: &'a str,
    pub category: &'a str,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

pub(super) fn validate_items(items: &[Item]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if item.id.is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if !item.magnitude.is_finite() {
            return Err(ValidationError::NonFiniteMagnitude {
                id: item.id.clone(),
            });
        }
        if item.magnitude < 0.0 {
            return Err(ValidationError::NegativeMagnitude {
                id: item.id.clone(),
                magnitude: item.magnitude,
            });
        }
        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateId(item.id.clone()));
        }
    }
    Ok(())
}

/// Lays nodes out on a phyllotaxis spiral around `center`, spaced by the
/// mean radius so the first ticks start from mild overlap.
pub(super) fn build_nodes(items: &[Item], scale: &MagnitudeScale, center: DVec2) -> Vec<Node> {
    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    let radii = items
        .iter()
        .map(|item| scale.radius(item.magnitude))
        .collect::<Vec<_>>();
    let spacing = if radii.is_empty() {
        0.0
    } else {
        (radii.iter().sum::<f64>() / radii.len() as f64).max(1.0)
    };

    items
        .iter()
        .zip(radii)
        .enumerate()
        .map(|(index, (item, radius))| {
            let distance = spacing * (0.5 + index as f64).sqrt();
            let angle = index as f64 * golden_angle;
            Node {
                id: item.id.clone(),
                magnitude: item.magnitude,
                category: item.category.clone(),
                radius,
                position: center + DVec2::from_angle(angle) * distance,
                velocity: DVec2::ZERO,
                pin: None,
            }
        })
        .collect()
}
