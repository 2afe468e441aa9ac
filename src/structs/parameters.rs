use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{SeirdError, SeirdResult};
use crate::routines::optimization::transform::Bound;

/// Number of free parameters estimated by the fitter.
pub const NPARAMS: usize = 5;

/// The SEIRD parameter set.
///
/// - `r0`: basic reproduction number
/// - `gamma`: recovery rate
/// - `delta`: incubation-to-infectious rate
/// - `alpha`: case fatality fraction
/// - `rho`: death rate among infected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub r0: f64,
    pub gamma: f64,
    pub delta: f64,
    pub alpha: f64,
    pub rho: f64,
}

impl Parameters {
    pub const NAMES: [&'static str; NPARAMS] = ["r0", "gamma", "delta", "alpha", "rho"];

    pub fn new(r0: f64, gamma: f64, delta: f64, alpha: f64, rho: f64) -> Self {
        Parameters {
            r0,
            gamma,
            delta,
            alpha,
            rho,
        }
    }

    /// Starting point of the optimizer.
    pub fn initial() -> Self {
        Parameters::new(2.0, 0.1, 0.1, 0.1, 0.1)
    }

    /// Box constraints, in the same order as [Parameters::NAMES].
    pub fn bounds() -> [Bound; NPARAMS] {
        [
            Bound::lower(0.0),
            Bound::between(0.0, 1.0),
            Bound::between(0.0, 1.0),
            Bound::between(0.0, 1.0),
            Bound::between(0.0, 1.0),
        ]
    }

    /// Transmission rate, `beta = r0 * gamma`
    pub fn beta(&self) -> f64 {
        self.r0 * self.gamma
    }

    /// Total rate at which individuals leave the infected compartment
    pub fn removal_rate(&self) -> f64 {
        (1.0 - self.alpha) * self.gamma + self.alpha * self.rho
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(vec![self.r0, self.gamma, self.delta, self.alpha, self.rho])
    }

    pub fn from_slice(values: &[f64]) -> SeirdResult<Self> {
        match values {
            [r0, gamma, delta, alpha, rho] => Ok(Parameters::new(*r0, *gamma, *delta, *alpha, *rho)),
            _ => Err(SeirdError::data(format!(
                "Expected {} parameter values, got {}",
                NPARAMS,
                values.len()
            ))),
        }
    }

    /// Check every value against [Parameters::bounds]
    pub fn is_within_bounds(&self) -> bool {
        self.to_array()
            .iter()
            .zip(Parameters::bounds().iter())
            .all(|(&value, bound)| bound.contains(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        Parameters::NAMES
            .into_iter()
            .zip([self.r0, self.gamma, self.delta, self.alpha, self.rho])
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters::initial()
    }
}
