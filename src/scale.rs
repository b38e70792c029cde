use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Closed interval of circle radii a scale maps onto.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadiusRange {
    pub min: f64,
    pub max: f64,
}

impl RadiusRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ValidationError> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(ValidationError::InvalidRadiusRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn midpoint(self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn clamp(self, radius: f64) -> f64 {
        radius.clamp(self.min, self.max)
    }
}

/// Square-root magnitude scale: circle *area* grows linearly with magnitude.
///
/// The domain is fitted to the magnitudes of one input set. A degenerate
/// domain (empty set, a single node, or all magnitudes equal) maps every
/// magnitude to the midpoint of the range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MagnitudeScale {
    domain_min: f64,
    domain_max: f64,
    range: RadiusRange,
}

impl MagnitudeScale {
    pub fn fit(magnitudes: impl IntoIterator<Item = f64>, range: RadiusRange) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for magnitude in magnitudes {
            min = min.min(magnitude);
            max = max.max(magnitude);
        }

        if !min.is_finite() || !max.is_finite() {
            min = 0.0;
            max = 0.0;
        }

        Self {
            domain_min: min,
            domain_max: max,
            range,
        }
    }

    pub fn range(&self) -> RadiusRange {
        self.range
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.domain_max > self.domain_min)
    }

    pub fn radius(&self, magnitude: f64) -> f64 {
        if self.is_degenerate() {
            return self.range.midpoint();
        }

        let span = self.domain_max - self.domain_min;
        let t = ((magnitude - self.domain_min) / span).clamp(0.0, 1.0);
        self.range
            .clamp(self.range.min + ((self.range.max - self.range.min) * t.sqrt()))
    }
}
