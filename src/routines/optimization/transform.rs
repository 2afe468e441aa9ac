//! Box constraints through a change of variables.
//!
//! The optimizer works on unconstrained internal values `u`, mapped onto the
//! feasible interval of each parameter:
//!
//! - bounded on both sides: `x = lo + (sin(u) + 1) * (hi - lo) / 2`
//! - bounded below only:    `x = lo - 1 + sqrt(u^2 + 1)`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Bound {
    pub fn lower(lower: f64) -> Self {
        Bound { lower, upper: None }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Bound {
            lower,
            upper: Some(upper),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && self.upper.map_or(true, |upper| x <= upper)
    }

    /// Map an external (bounded) value to the internal, unconstrained space.
    ///
    /// Values outside the bound are clamped first.
    pub fn to_internal(&self, x: f64) -> f64 {
        match self.upper {
            Some(upper) => {
                let x = x.clamp(self.lower, upper);
                (2.0 * (x - self.lower) / (upper - self.lower) - 1.0).asin()
            }
            None => {
                let x = x.max(self.lower);
                ((x - self.lower + 1.0).powi(2) - 1.0).sqrt()
            }
        }
    }

    /// Map an internal value back onto the bounded interval
    pub fn to_external(&self, u: f64) -> f64 {
        match self.upper {
            Some(upper) => self.lower + (u.sin() + 1.0) * (upper - self.lower) / 2.0,
            None => self.lower - 1.0 + (u * u + 1.0).sqrt(),
        }
    }
}
