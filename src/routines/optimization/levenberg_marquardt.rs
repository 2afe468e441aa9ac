//! Levenberg-Marquardt for small, dense nonlinear least-squares problems.
//!
//! Minimizes `0.5 * ||r(x)||^2` for any problem exposing its residuals through
//! [Operator] and their derivatives through [Jacobian]. Each iteration solves
//! the damped normal equations
//!
//! `(JᵀJ + λ diag(JᵀJ)) δ = -Jᵀr`
//!
//! with a Cholesky factorization, and adapts `λ` from the ratio between the
//! actual and the predicted reduction of the cost.

use argmin::core::{Error, Jacobian, Operator};
use linfa_linalg::{cholesky::Cholesky, triangular::SolveTriangular, triangular::UPLO};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use crate::routines::settings::FitSettings;

/// Damping beyond which no step can make progress
const MAX_DAMPING: f64 = 1e32;
/// Floor for the diagonal scaling of parameters without influence on the residuals
const MIN_SCALE: f64 = 1e-300;

/// Why the optimizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// Relative reduction of the cost below `ftol`
    CostTolerance,
    /// Relative step length below `xtol`
    StepTolerance,
    /// Scaled gradient below `gtol`, or an exact fit
    GradientTolerance,
    /// Iteration budget exhausted
    MaxIterations,
    /// Damping overflowed without finding a descent step
    DampingOverflow,
    /// The cost at the starting point is not finite
    NonFiniteCost,
}

impl Termination {
    pub fn converged(&self) -> bool {
        matches!(
            self,
            Termination::CostTolerance
                | Termination::StepTolerance
                | Termination::GradientTolerance
        )
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Termination::CostTolerance => "relative cost reduction below ftol",
            Termination::StepTolerance => "relative step below xtol",
            Termination::GradientTolerance => "scaled gradient below gtol",
            Termination::MaxIterations => "maximum number of iterations reached",
            Termination::DampingOverflow => "damping overflow",
            Termination::NonFiniteCost => "non-finite cost",
        };
        write!(f, "{}", text)
    }
}

/// Final state of a [LevenbergMarquardt] run
#[derive(Debug, Clone)]
pub struct LmReport {
    /// Solution in the optimizer's own coordinates
    pub param: Array1<f64>,
    pub residuals: Array1<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub damping: f64,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    max_iters: usize,
    ftol: f64,
    xtol: f64,
    gtol: f64,
    damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::from(&FitSettings::default())
    }
}

impl From<&FitSettings> for LevenbergMarquardt {
    fn from(settings: &FitSettings) -> Self {
        Self {
            max_iters: settings.max_iters,
            ftol: settings.ftol,
            xtol: settings.xtol,
            gtol: settings.gtol,
            damping: settings.initial_damping,
        }
    }
}

impl LevenbergMarquardt {
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_tolerances(mut self, ftol: f64, xtol: f64, gtol: f64) -> Self {
        self.ftol = ftol;
        self.xtol = xtol;
        self.gtol = gtol;
        self
    }

    /// Minimize the squared residuals of `problem`, starting at `init`.
    ///
    /// Errors raised while evaluating the starting point or a Jacobian are
    /// returned as-is. Errors at trial points only reject the step.
    pub fn minimize<O>(&self, problem: &O, init: Array1<f64>) -> Result<LmReport, Error>
    where
        O: Operator<Param = Array1<f64>, Output = Array1<f64>>
            + Jacobian<Param = Array1<f64>, Jacobian = Array2<f64>>,
    {
        let n = init.len();
        let mut x = init;
        let mut r = problem.apply(&x)?;
        let mut cost = 0.5 * r.dot(&r);
        let mut evaluations = 1;
        let mut lambda = self.damping;
        let mut nu = 2.0;

        let report = |x: Array1<f64>, r: Array1<f64>, cost, iterations, evaluations, damping, termination| {
            LmReport {
                param: x,
                residuals: r,
                cost,
                iterations,
                evaluations,
                damping,
                termination,
            }
        };

        if !cost.is_finite() {
            return Ok(report(x, r, cost, 0, evaluations, lambda, Termination::NonFiniteCost));
        }

        for iter in 1..=self.max_iters {
            let jac = problem.jacobian(&x)?;
            evaluations += n + 1;
            let jtj = jac.t().dot(&jac);
            let g = jac.t().dot(&r);
            let scale = jtj.diag().mapv(|d| d.max(MIN_SCALE));

            let rnorm = (2.0 * cost).sqrt();
            if rnorm == 0.0 {
                return Ok(report(x, r, cost, iter, evaluations, lambda, Termination::GradientTolerance));
            }
            let gnorm = g
                .iter()
                .zip(scale.iter())
                .fold(0.0_f64, |acc, (gi, si)| acc.max(gi.abs() / (si.sqrt() * rnorm)));
            if gnorm <= self.gtol {
                return Ok(report(x, r, cost, iter, evaluations, lambda, Termination::GradientTolerance));
            }

            loop {
                if lambda > MAX_DAMPING {
                    return Ok(report(x, r, cost, iter, evaluations, lambda, Termination::DampingOverflow));
                }

                let step = match damped_step(&jtj, &g, &scale, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= nu;
                        nu *= 2.0;
                        continue;
                    }
                };

                let xnorm = x.dot(&x).sqrt();
                let snorm = step.dot(&step).sqrt();
                if snorm <= self.xtol * (xnorm + self.xtol) {
                    return Ok(report(x, r, cost, iter, evaluations, lambda, Termination::StepTolerance));
                }

                let candidate = &x + &step;
                evaluations += 1;
                let (r_new, cost_new) = match problem.apply(&candidate) {
                    Ok(r_new) => {
                        let c = 0.5 * r_new.dot(&r_new);
                        (r_new, c)
                    }
                    Err(err) => {
                        tracing::trace!("Rejected trial point: {}", err);
                        (Array1::zeros(r.len()), f64::INFINITY)
                    }
                };

                let predicted = 0.5 * step.dot(&(lambda * &scale * &step - &g));
                let rho = if predicted > 0.0 && cost_new.is_finite() {
                    (cost - cost_new) / predicted
                } else {
                    -1.0
                };

                if rho > 0.0 {
                    let reduction = cost - cost_new;
                    x = candidate;
                    r = r_new;
                    cost = cost_new;
                    lambda *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                    nu = 2.0;
                    tracing::debug!(
                        "LM iteration {:>4}: cost = {:.6e}, damping = {:.3e}",
                        iter,
                        cost,
                        lambda
                    );
                    if reduction <= self.ftol * (cost + reduction) {
                        return Ok(report(x, r, cost, iter, evaluations, lambda, Termination::CostTolerance));
                    }
                    break;
                }

                lambda *= nu;
                nu *= 2.0;
            }
        }

        Ok(report(
            x,
            r,
            cost,
            self.max_iters,
            evaluations,
            lambda,
            Termination::MaxIterations,
        ))
    }
}

/// Solve `(JᵀJ + λ D) δ = -g`, returning `None` if the system is not positive definite
fn damped_step(jtj: &Array2<f64>, g: &Array1<f64>, scale: &Array1<f64>, lambda: f64) -> Option<Array1<f64>> {
    let mut a = jtj.clone();
    for (k, s) in scale.iter().enumerate() {
        a[(k, k)] += lambda * s;
    }
    let l = a.cholesky().ok()?;
    let rhs = g.mapv(|v| -v).insert_axis(Axis(1));
    let y = l.solve_triangular(&rhs, UPLO::Lower).ok()?;
    let step = l.t().solve_triangular(&y, UPLO::Upper).ok()?;
    let step = step.column(0).to_owned();
    if step.iter().all(|v| v.is_finite()) {
        Some(step)
    } else {
        None
    }
}
