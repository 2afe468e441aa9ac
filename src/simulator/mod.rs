//! The SEIRD compartmental model.
//!
//! All state is expressed in fractions of the population, so that the system
//! stays well scaled regardless of the country size.

pub mod ode_solvers;

use ndarray::Array1;

use crate::error::{SeirdError, SeirdResult};
use crate::routines::settings::SolverSettings;
use crate::structs::parameters::Parameters;
use crate::structs::trajectory::Trajectory;

use self::ode_solvers::{integrate, State};

/// What the model should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Only the infected compartment, used inside the optimizer
    Fit,
    /// All five compartments
    Simulate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SeirdOutput {
    Infected(Array1<f64>),
    Compartments(Trajectory),
}

/// Right-hand side of the SEIRD system for the state `[S, E, I, R, D]`
pub fn derivatives(p: &Parameters, y: &[f64; 5]) -> [f64; 5] {
    let [s, e, i, _, _] = *y;
    let beta = p.beta();
    let infection = beta * s * i;
    let recovery = (1.0 - p.alpha) * p.gamma * i;
    let death = p.alpha * p.rho * i;
    [
        -infection,
        infection - p.delta * e,
        p.delta * e - recovery - death,
        recovery,
        death,
    ]
}

/// One exposed and one infected individual, everyone else susceptible.
///
/// Only the infected case is taken out of `S`, so the compartments add up to
/// `1 + 1/N`. That total is what the dynamics conserve.
pub fn initial_state(population: f64) -> [f64; 5] {
    let i0 = 1.0 / population;
    [1.0 - i0, i0, i0, 0.0, 0.0]
}

/// `n` daily time points starting at zero
pub fn time_grid(n: usize) -> Vec<f64> {
    (0..n).map(|k| k as f64).collect()
}

/// Run the model over `grid`.
pub fn solve(
    grid: &[f64],
    parameters: &Parameters,
    population: f64,
    mode: Mode,
    settings: &SolverSettings,
) -> SeirdResult<SeirdOutput> {
    match mode {
        Mode::Fit => infected(grid, parameters, population, settings).map(SeirdOutput::Infected),
        Mode::Simulate => {
            compartments(grid, parameters, population, settings).map(SeirdOutput::Compartments)
        }
    }
}

/// Infected fraction at every grid point
pub fn infected(
    grid: &[f64],
    parameters: &Parameters,
    population: f64,
    settings: &SolverSettings,
) -> SeirdResult<Array1<f64>> {
    let states = states(grid, parameters, population, settings)?;
    Ok(states.iter().map(|state| state[2]).collect())
}

/// All five compartments at every grid point
pub fn compartments(
    grid: &[f64],
    parameters: &Parameters,
    population: f64,
    settings: &SolverSettings,
) -> SeirdResult<Trajectory> {
    let rows: Vec<[f64; 5]> = states(grid, parameters, population, settings)?
        .iter()
        .map(|state| [state[0], state[1], state[2], state[3], state[4]])
        .collect();
    Trajectory::from_states(grid.to_vec(), &rows, population)
}

fn states(
    grid: &[f64],
    parameters: &Parameters,
    population: f64,
    settings: &SolverSettings,
) -> SeirdResult<Vec<State>> {
    validate_grid(grid)?;
    if !population.is_finite() || population <= 0.0 {
        return Err(SeirdError::data(format!(
            "Population must be positive, got {}",
            population
        )));
    }
    let [s, e, i, r, d] = initial_state(population);
    integrate(parameters, State::new(s, e, i, r, d), grid, settings)
}

fn validate_grid(grid: &[f64]) -> SeirdResult<()> {
    if grid.is_empty() {
        return Err(SeirdError::data("Time grid is empty"));
    }
    if grid.iter().any(|t| !t.is_finite() || *t < 0.0) {
        return Err(SeirdError::data(
            "Time grid must contain finite, non-negative values",
        ));
    }
    if grid.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SeirdError::data("Time grid must be strictly increasing"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::trajectory::Compartment;

    fn reference() -> Parameters {
        Parameters::new(2.5, 0.2, 0.3, 0.02, 0.1)
    }

    #[test]
    fn derivatives_sum_to_zero() {
        let dy = derivatives(&reference(), &[0.7, 0.1, 0.15, 0.04, 0.01]);
        assert!(dy.iter().sum::<f64>().abs() < 1e-15);
    }

    #[test]
    fn initial_state_seeds_one_case() {
        let y0 = initial_state(1_000.0);
        assert_eq!(y0[1], 0.001);
        assert_eq!(y0[2], 0.001);
        assert!((y0[0] - 0.999).abs() < 1e-15);
        assert_eq!(y0[3] + y0[4], 0.0);
    }

    #[test]
    fn fit_mode_matches_infected_compartment() {
        let grid = time_grid(30);
        let settings = SolverSettings::default();
        let infected = infected(&grid, &reference(), 1e6, &settings).unwrap();
        let trajectory = compartments(&grid, &reference(), 1e6, &settings).unwrap();
        assert_eq!(infected.len(), 30);
        assert_eq!(infected, trajectory.fractions(Compartment::Infected).to_owned());
    }

    #[test]
    fn population_is_conserved() {
        for population in [1e3, 1e4, 1e6] {
            let trajectory = compartments(
                &time_grid(200),
                &reference(),
                population,
                &SolverSettings::default(),
            )
            .unwrap();
            assert!((trajectory.totals()[0] - (1.0 + 1.0 / population)).abs() < 1e-12);
            assert!(trajectory.conservation_error() < 1e-6);
        }
    }

    #[test]
    fn unreachable_tolerances_are_an_integration_error() {
        let settings = SolverSettings {
            rtol: 1e-300,
            atol: 1e-300,
        };
        let err = infected(&time_grid(10), &reference(), 1e6, &settings).unwrap_err();
        assert!(matches!(err, SeirdError::Integration { .. }), "{:?}", err);
    }

    #[test]
    fn stiff_parameters_are_an_integration_error() {
        let stiff = Parameters::new(1e12, 1.0, 1.0, 0.0, 0.0);
        let err = compartments(&time_grid(10), &stiff, 1e6, &SolverSettings::default())
            .unwrap_err();
        assert!(matches!(err, SeirdError::Integration { .. }), "{:?}", err);
    }

    #[test]
    fn both_modes_agree() {
        let grid = time_grid(20);
        let settings = SolverSettings::default();
        let fit = solve(&grid, &reference(), 1e6, Mode::Fit, &settings).unwrap();
        let simulate = solve(&grid, &reference(), 1e6, Mode::Simulate, &settings).unwrap();
        match (fit, simulate) {
            (SeirdOutput::Infected(series), SeirdOutput::Compartments(trajectory)) => {
                assert_eq!(series, trajectory.fractions(Compartment::Infected).to_owned())
            }
            other => panic!("unexpected outputs: {:?}", other),
        }
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let grid = time_grid(50);
        let settings = SolverSettings::default();
        let a = infected(&grid, &reference(), 5e5, &settings).unwrap();
        let b = infected(&grid, &reference(), 5e5, &settings).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_grids_are_rejected() {
        let settings = SolverSettings::default();
        let p = reference();
        assert!(matches!(
            solve(&[], &p, 1e6, Mode::Fit, &settings),
            Err(SeirdError::Data(_))
        ));
        assert!(matches!(
            solve(&[0.0, 2.0, 1.0], &p, 1e6, Mode::Fit, &settings),
            Err(SeirdError::Data(_))
        ));
        assert!(matches!(
            solve(&[0.0, 1.0], &p, 0.0, Mode::Fit, &settings),
            Err(SeirdError::Data(_))
        ));
    }
}
