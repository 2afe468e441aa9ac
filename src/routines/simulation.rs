use crate::error::{SeirdError, SeirdResult};
use crate::routines::fit::FitResult;
use crate::routines::settings::SolverSettings;
use crate::simulator::{compartments, time_grid};
use crate::structs::trajectory::Trajectory;

/// Run the fitted model over the observed span plus `forecast_days`.
///
/// The grid starts at day 0 with daily spacing, so its first `observed_length`
/// points coincide with the grid used for fitting.
pub fn simulate(
    fit: &FitResult,
    observed_length: usize,
    forecast_days: usize,
    solver: &SolverSettings,
) -> SeirdResult<Trajectory> {
    let n = observed_length.checked_add(forecast_days).ok_or_else(|| {
        SeirdError::data(format!(
            "Simulation span of {} observed plus {} forecast days is too long",
            observed_length, forecast_days
        ))
    })?;
    if n == 0 {
        return Err(SeirdError::data("Cannot simulate an empty time span"));
    }
    tracing::debug!(
        "Simulating {} days ({} observed, {} ahead)",
        n,
        observed_length,
        forecast_days
    );
    compartments(&time_grid(n), fit.parameters(), fit.population(), solver)
}
