use argmin::core::{Error, Jacobian, Operator};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::error::SeirdResult;
use crate::routines::settings::{FitSettings, SolverSettings};
use crate::simulator;
use crate::structs::parameters::{Parameters, NPARAMS};

use super::transform::Bound;

/// Least-squares problem matching the infected compartment to an observed series.
///
/// The parameter vector lives in the internal (unbounded) space defined by
/// [Bound]; residuals are `model - observed` in population fractions.
pub struct SeirdProblem<'a> {
    observed: &'a Array1<f64>,
    grid: &'a [f64],
    population: f64,
    bounds: [Bound; NPARAMS],
    solver: &'a SolverSettings,
    step: f64,
    parallel: bool,
}

impl<'a> SeirdProblem<'a> {
    pub fn new(
        observed: &'a Array1<f64>,
        grid: &'a [f64],
        population: f64,
        settings: &FitSettings,
        solver: &'a SolverSettings,
    ) -> Self {
        Self {
            observed,
            grid,
            population,
            bounds: Parameters::bounds(),
            solver,
            step: settings.fd_step,
            parallel: settings.parallel,
        }
    }

    /// Map an internal vector to the model parameters
    pub fn parameters(&self, internal: &Array1<f64>) -> SeirdResult<Parameters> {
        let external: Vec<f64> = internal
            .iter()
            .zip(self.bounds.iter())
            .map(|(&u, bound)| bound.to_external(u))
            .collect();
        Parameters::from_slice(&external)
    }

    /// Map model parameters to the internal vector
    pub fn internal(&self, parameters: &Parameters) -> Array1<f64> {
        parameters
            .to_array()
            .iter()
            .zip(self.bounds.iter())
            .map(|(&x, bound)| bound.to_internal(x))
            .collect()
    }

    /// Infected fraction predicted at the internal point
    pub fn model(&self, internal: &Array1<f64>) -> SeirdResult<Array1<f64>> {
        let parameters = self.parameters(internal)?;
        simulator::infected(self.grid, &parameters, self.population, self.solver)
    }

    fn residuals(&self, internal: &Array1<f64>) -> SeirdResult<Array1<f64>> {
        Ok(self.model(internal)? - self.observed)
    }

    fn column(
        &self,
        internal: &Array1<f64>,
        base: &Array1<f64>,
        j: usize,
    ) -> SeirdResult<Array1<f64>> {
        let h = self.step * internal[j].abs().max(1.0);
        let mut shifted = internal.clone();
        shifted[j] += h;
        Ok((self.residuals(&shifted)? - base) / h)
    }
}

impl Operator for SeirdProblem<'_> {
    type Param = Array1<f64>;
    type Output = Array1<f64>;

    fn apply(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.residuals(param)?)
    }
}

impl Jacobian for SeirdProblem<'_> {
    type Param = Array1<f64>;
    type Jacobian = Array2<f64>;

    /// Forward differences, one column per parameter.
    ///
    /// Columns are computed independently and assembled in parameter order, so
    /// the parallel and sequential paths give the same matrix.
    fn jacobian(&self, param: &Self::Param) -> Result<Self::Jacobian, Error> {
        let base = self.residuals(param)?;
        let n = param.len();
        let columns: Vec<Array1<f64>> = if self.parallel {
            (0..n)
                .into_par_iter()
                .map(|j| self.column(param, &base, j))
                .collect::<SeirdResult<Vec<_>>>()?
        } else {
            (0..n)
                .map(|j| self.column(param, &base, j))
                .collect::<SeirdResult<Vec<_>>>()?
        };
        Ok(Array2::from_shape_fn((base.len(), n), |(i, j)| {
            columns[j][i]
        }))
    }
}
