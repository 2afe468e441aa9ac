use ndarray::Array1;

use crate::error::{SeirdError, SeirdResult};
use crate::routines::math::r_squared;
use crate::routines::optimization::levenberg_marquardt::{LevenbergMarquardt, LmReport};
use crate::routines::optimization::problem::SeirdProblem;
use crate::routines::settings::{FitSettings, SolverSettings};
use crate::structs::parameters::{Parameters, NPARAMS};

/// Outcome of fitting the SEIRD model to an observed series
#[derive(Debug, Clone)]
pub struct FitResult {
    best_fit: Array1<f64>,
    parameters: Parameters,
    r2: f64,
    population: f64,
    report: LmReport,
}

impl FitResult {
    /// Fitted infected curve in absolute counts
    pub fn best_fit(&self) -> Array1<f64> {
        &self.best_fit * self.population
    }

    /// Fitted infected curve as fractions of the population
    pub fn best_fit_fraction(&self) -> &Array1<f64> {
        &self.best_fit
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn r0(&self) -> f64 {
        self.parameters.r0
    }

    pub fn r2(&self) -> f64 {
        self.r2
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn report(&self) -> &LmReport {
        &self.report
    }

    /// Number of points of the fitted series
    pub fn len(&self) -> usize {
        self.best_fit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fit.is_empty()
    }
}

/// Fit the SEIRD parameters so that the infected fraction tracks `observed`.
///
/// `observed` holds population fractions sampled at `grid`.
pub fn fit(
    observed: &Array1<f64>,
    grid: &[f64],
    population: f64,
    settings: &FitSettings,
    solver: &SolverSettings,
) -> SeirdResult<FitResult> {
    validate(observed, grid)?;

    let problem = SeirdProblem::new(observed, grid, population, settings, solver);
    let init = problem.internal(&Parameters::initial());

    tracing::debug!(
        "Fitting {} points, population {}, starting at {:?}",
        observed.len(),
        population,
        Parameters::initial()
    );

    let report = LevenbergMarquardt::from(settings)
        .minimize(&problem, init)
        .map_err(into_seird_error)?;

    if !report.termination.converged() {
        tracing::warn!(
            "Fit stopped without converging after {} iterations: {}",
            report.iterations,
            report.termination
        );
        return Err(SeirdError::FitDiverged {
            iterations: report.iterations,
            cost: report.cost,
            damping: report.damping,
            reason: report.termination.to_string(),
        });
    }

    let parameters = problem.parameters(&report.param)?;
    let best_fit = problem.model(&report.param)?;
    let r2 = r_squared(best_fit.view(), observed.view());

    tracing::info!(
        "Fit converged in {} iterations ({}): R0 = {:.4}, R² = {:.4}",
        report.iterations,
        report.termination,
        parameters.r0,
        r2
    );

    Ok(FitResult {
        best_fit,
        parameters,
        r2,
        population,
        report,
    })
}

fn validate(observed: &Array1<f64>, grid: &[f64]) -> SeirdResult<()> {
    if observed.len() != grid.len() {
        return Err(SeirdError::data(format!(
            "Observed series has {} points but the time grid has {}",
            observed.len(),
            grid.len()
        )));
    }
    if observed.len() <= NPARAMS {
        return Err(SeirdError::data(format!(
            "At least {} observations are needed to fit {} parameters, got {}",
            NPARAMS + 1,
            NPARAMS,
            observed.len()
        )));
    }
    if observed.iter().any(|v| !v.is_finite()) {
        return Err(SeirdError::data("Observed series contains non-finite values"));
    }
    Ok(())
}

/// Recover the typed error raised inside the optimizer
fn into_seird_error(err: argmin::core::Error) -> SeirdError {
    match err.downcast::<SeirdError>() {
        Ok(err) => err,
        Err(err) => SeirdError::FitDiverged {
            iterations: 0,
            cost: f64::NAN,
            damping: f64::NAN,
            reason: err.to_string(),
        },
    }
}
