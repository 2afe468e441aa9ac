use std::collections::BTreeMap;

use ndarray::Array1;

use crate::data::{CountryData, ObservedSeries, TimeSeriesProvider};
use crate::error::{SeirdError, SeirdResult};
use crate::routines::fit::{fit, FitResult};
use crate::routines::settings::{FitSettings, SolverSettings};
use crate::routines::simulation::simulate;
use crate::simulator::time_grid;
use crate::structs::parameters::Parameters;
use crate::structs::trajectory::Trajectory;

/// Days simulated past the observed series when no horizon is given
pub const DEFAULT_FORECAST_DAYS: usize = 100;

/// Where a [CountrySeird] is in its lifecycle
#[derive(Debug, Clone)]
pub enum State {
    Unfitted,
    Fitted(FitResult),
    Simulated {
        fit: FitResult,
        trajectory: Trajectory,
    },
}

/// A country's observed series together with the SEIRD model fitted to it.
///
/// [CountrySeird::fit] is run once and cached; [CountrySeird::simulation] can be
/// run any number of times after it, each call replacing the previous curves.
#[derive(Debug, Clone)]
pub struct CountrySeird {
    code: String,
    name: String,
    population: f64,
    data: ObservedSeries,
    fit_settings: FitSettings,
    solver: SolverSettings,
    state: State,
}

impl CountrySeird {
    /// Wrap a country's data, dropping the days before its first confirmed case
    pub fn new(country: CountryData) -> SeirdResult<Self> {
        if !country.population.is_finite() || country.population <= 0.0 {
            return Err(SeirdError::data(format!(
                "Population of {} must be positive, got {}",
                country.code, country.population
            )));
        }
        let data = country.series.trim_leading_zeros();
        data.validate()?;
        Ok(CountrySeird {
            code: country.code,
            name: country.name,
            population: country.population,
            data,
            fit_settings: FitSettings::default(),
            solver: SolverSettings::default(),
            state: State::Unfitted,
        })
    }

    /// Fetch a country from `provider` by its code
    pub fn from_provider<P>(provider: &P, code: &str) -> SeirdResult<Self>
    where
        P: TimeSeriesProvider + ?Sized,
    {
        Self::new(provider.country(code)?)
    }

    /// Codes of every country served by `provider` whose name contains `query`
    pub fn code_search<P>(provider: &P, query: &str) -> BTreeMap<String, String>
    where
        P: TimeSeriesProvider + ?Sized,
    {
        provider.locations().code_search(query)
    }

    pub fn with_settings(mut self, fit_settings: FitSettings, solver: SolverSettings) -> Self {
        self.fit_settings = fit_settings;
        self.solver = solver;
        self.state = State::Unfitted;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn data(&self) -> &ObservedSeries {
        &self.data
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        !matches!(self.state, State::Unfitted)
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.state, State::Simulated { .. })
    }

    /// Fit the model to the observed series.
    ///
    /// Does nothing if the instance is already fitted. On failure the instance
    /// stays unfitted.
    pub fn fit(&mut self) -> SeirdResult<&FitResult> {
        if let State::Unfitted = self.state {
            tracing::info!("Fitting SEIRD model for {} ({})", self.name, self.code);
            let observed = self.data.fractions(self.population)?;
            let grid = time_grid(observed.len());
            let result = fit(
                &observed,
                &grid,
                self.population,
                &self.fit_settings,
                &self.solver,
            )?;
            self.state = State::Fitted(result);
        }
        self.fit_result()
    }

    /// Simulate the fitted model over the observed span plus `days_ahead` days.
    ///
    /// Replaces the curves of any previous simulation.
    pub fn simulation(&mut self, days_ahead: usize) -> SeirdResult<&Trajectory> {
        let trajectory = simulate(self.fit_result()?, self.data.len(), days_ahead, &self.solver)?;
        let fit = match std::mem::replace(&mut self.state, State::Unfitted) {
            State::Fitted(fit) | State::Simulated { fit, .. } => fit,
            State::Unfitted => return Err(SeirdError::NotFitted),
        };
        tracing::info!(
            "Simulated {} for {} days ahead of the observed series",
            self.name,
            days_ahead
        );
        self.state = State::Simulated { fit, trajectory };
        self.curves()
    }

    pub fn fit_result(&self) -> SeirdResult<&FitResult> {
        match &self.state {
            State::Unfitted => Err(SeirdError::NotFitted),
            State::Fitted(fit) | State::Simulated { fit, .. } => Ok(fit),
        }
    }

    /// Fitted infected curve in absolute counts
    pub fn best_fit(&self) -> SeirdResult<Array1<f64>> {
        Ok(self.fit_result()?.best_fit())
    }

    pub fn r0(&self) -> SeirdResult<f64> {
        Ok(self.fit_result()?.r0())
    }

    pub fn r2(&self) -> SeirdResult<f64> {
        Ok(self.fit_result()?.r2())
    }

    pub fn parameters(&self) -> SeirdResult<&Parameters> {
        Ok(self.fit_result()?.parameters())
    }

    /// Curves of the last simulation
    pub fn curves(&self) -> SeirdResult<&Trajectory> {
        match &self.state {
            State::Simulated { trajectory, .. } => Ok(trajectory),
            _ => Err(SeirdError::NotSimulated),
        }
    }

    /// Forget the fit and any simulation
    pub fn reset(&mut self) {
        self.state = State::Unfitted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn country(confirmed: &[f64]) -> CountryData {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        CountryData {
            code: "TST".to_string(),
            name: "Testland".to_string(),
            population: 1e6,
            series: ObservedSeries::from_counts(start, confirmed, &vec![0.0; confirmed.len()])
                .unwrap(),
        }
    }

    #[test]
    fn accessors_require_a_fit() {
        let seird = CountrySeird::new(country(&[1.0, 2.0, 4.0, 8.0, 16.0, 32.0])).unwrap();
        assert!(!seird.is_fitted());
        assert_eq!(seird.best_fit().unwrap_err(), SeirdError::NotFitted);
        assert_eq!(seird.r0().unwrap_err(), SeirdError::NotFitted);
        assert_eq!(seird.r2().unwrap_err(), SeirdError::NotFitted);
        assert_eq!(seird.parameters().unwrap_err(), SeirdError::NotFitted);
        assert_eq!(seird.curves().unwrap_err(), SeirdError::NotSimulated);
    }

    #[test]
    fn simulation_requires_a_fit() {
        let mut seird = CountrySeird::new(country(&[1.0, 2.0, 4.0, 8.0, 16.0, 32.0])).unwrap();
        assert_eq!(seird.simulation(10).unwrap_err(), SeirdError::NotFitted);
        assert!(matches!(seird.state(), State::Unfitted));
    }

    #[test]
    fn leading_zeros_are_dropped() {
        let seird = CountrySeird::new(country(&[0.0, 0.0, 1.0, 2.0])).unwrap();
        assert_eq!(seird.data().len(), 2);
        assert_eq!(seird.name(), "Testland");
        assert_eq!(seird.code(), "TST");
        assert_eq!(seird.population(), 1e6);
    }

    #[test]
    fn countries_without_cases_are_rejected() {
        assert!(matches!(
            CountrySeird::new(country(&[0.0, 0.0])),
            Err(SeirdError::Data(_))
        ));
    }

    #[test]
    fn failed_fit_leaves_instance_unfitted() {
        // Too short to fit five parameters
        let mut seird = CountrySeird::new(country(&[1.0, 2.0, 3.0])).unwrap();
        assert!(matches!(seird.fit(), Err(SeirdError::Data(_))));
        assert!(!seird.is_fitted());
    }

    #[test]
    fn invalid_population_is_rejected() {
        let mut data = country(&[1.0, 2.0]);
        data.population = 0.0;
        assert!(CountrySeird::new(data).is_err());
    }
}
