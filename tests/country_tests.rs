use chrono::NaiveDate;
use eyre::Result;
use ndarray::Array1;
use seird::prelude::*;
use seird::routines::optimization::levenberg_marquardt::Termination;
use seird::simulator::infected;

const POPULATION: f64 = 1e6;

fn truth() -> Parameters {
    Parameters::new(2.5, 0.2, 0.3, 0.02, 0.1)
}

/// Infected counts generated by the model itself
fn synthetic(days: usize) -> Result<Array1<f64>> {
    let fractions = infected(
        &time_grid(days),
        &truth(),
        POPULATION,
        &SolverSettings::default(),
    )?;
    Ok(fractions * POPULATION)
}

fn country(confirmed: &[f64]) -> Result<CountrySeird> {
    let start = NaiveDate::from_ymd_opt(2020, 3, 1).ok_or_else(|| eyre::eyre!("bad date"))?;
    let deaths = vec![0.0; confirmed.len()];
    let data = CountryData {
        code: "SYN".to_string(),
        name: "Synthetica".to_string(),
        population: POPULATION,
        series: ObservedSeries::from_counts(start, confirmed, &deaths)?,
    };
    Ok(CountrySeird::new(data)?)
}

#[test]
fn synthetic_series_is_recovered() -> Result<()> {
    let observed = synthetic(60)?;
    let mut seird = country(&observed.to_vec())?;
    seird.fit()?;

    assert!(seird.r2()? > 0.99);
    let peak = observed.fold(0.0_f64, |a, &b| a.max(b));
    let best_fit = seird.best_fit()?;
    assert_eq!(best_fit.len(), 60);
    let worst = best_fit
        .iter()
        .zip(observed.iter())
        .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()));
    assert!(worst < 0.05 * peak, "max residual {} for peak {}", worst, peak);

    let parameters = seird.parameters()?;
    assert!(parameters.is_within_bounds());
    assert!(parameters.r0 >= 0.0);
    assert_eq!(seird.r0()?, parameters.r0);
    Ok(())
}

#[test]
fn fits_are_deterministic() -> Result<()> {
    let observed = synthetic(40)?;
    let mut a = country(&observed.to_vec())?;
    let mut b = country(&observed.to_vec())?;
    a.fit()?;
    b.fit()?;
    assert_eq!(a.parameters()?, b.parameters()?);
    assert_eq!(a.best_fit()?, b.best_fit()?);
    assert_eq!(a.r2()?, b.r2()?);
    Ok(())
}

#[test]
fn sequential_jacobian_gives_the_same_fit() -> Result<()> {
    let observed = synthetic(40)?;
    let mut parallel = country(&observed.to_vec())?;
    let sequential_settings = FitSettings {
        parallel: false,
        ..FitSettings::default()
    };
    let mut sequential = country(&observed.to_vec())?
        .with_settings(sequential_settings, SolverSettings::default());
    parallel.fit()?;
    sequential.fit()?;
    assert_eq!(parallel.parameters()?, sequential.parameters()?);
    Ok(())
}

#[test]
fn second_fit_is_a_no_op() -> Result<()> {
    let observed = synthetic(40)?;
    let mut seird = country(&observed.to_vec())?;
    let first = seird.fit()?.clone();
    let second = seird.fit()?;
    assert_eq!(first.best_fit(), second.best_fit());
    assert_eq!(first.r0(), second.r0());
    assert_eq!(first.r2(), second.r2());
    assert_eq!(first.report().iterations, second.report().iterations);
    Ok(())
}

#[test]
fn accessors_guard_their_prerequisites() -> Result<()> {
    let observed = synthetic(30)?;
    let mut seird = country(&observed.to_vec())?;

    assert_eq!(seird.best_fit().unwrap_err(), SeirdError::NotFitted);
    assert_eq!(seird.r0().unwrap_err(), SeirdError::NotFitted);
    assert_eq!(seird.r2().unwrap_err(), SeirdError::NotFitted);
    assert_eq!(seird.simulation(10).unwrap_err(), SeirdError::NotFitted);
    assert_eq!(seird.curves().unwrap_err(), SeirdError::NotSimulated);

    seird.fit()?;
    assert_eq!(seird.curves().unwrap_err(), SeirdError::NotSimulated);

    seird.simulation(10)?;
    assert!(seird.curves().is_ok());

    seird.reset();
    assert_eq!(seird.r0().unwrap_err(), SeirdError::NotFitted);
    assert_eq!(seird.curves().unwrap_err(), SeirdError::NotSimulated);
    Ok(())
}

#[test]
fn flat_series_fits_with_a_defined_r2() -> Result<()> {
    let mut seird = country(&[100.0; 30])?;
    seird.fit()?;
    let r2 = seird.r2()?;
    assert!(r2.is_finite());
    assert!((0.0..=1.0).contains(&r2));
    assert!(seird.parameters()?.is_within_bounds());

    let report = seird.fit_result()?.report();
    assert!(
        matches!(
            report.termination,
            Termination::CostTolerance | Termination::StepTolerance | Termination::GradientTolerance
        ),
        "stopped on {:?}",
        report.termination
    );
    assert!(report.iterations < FitSettings::default().max_iters);
    Ok(())
}

#[test]
fn simulation_covers_observed_span_and_horizon() -> Result<()> {
    let observed = synthetic(60)?;
    let mut seird = country(&observed.to_vec())?;
    seird.fit()?;
    let curves = seird.simulation(150)?;

    assert_eq!(curves.len(), 210);
    for compartment in Compartment::ALL {
        let values = curves.compartment(compartment);
        assert_eq!(values.len(), 210);
        assert!(values
            .iter()
            .all(|&v| v >= -1e-6 * POPULATION && v <= POPULATION * (1.0 + 1e-6)));
    }
    let totals = curves.totals();
    assert!((totals[0] - (1.0 + 1.0 / POPULATION)).abs() < 1e-12);
    assert!(curves.conservation_error() < 1e-6);
    Ok(())
}

#[test]
fn last_simulation_wins() -> Result<()> {
    let observed = synthetic(60)?;
    let mut seird = country(&observed.to_vec())?;
    seird.fit()?;
    seird.simulation(10)?;
    assert_eq!(seird.curves()?.len(), 70);
    seird.simulation(20)?;
    assert_eq!(seird.curves()?.len(), 80);
    assert!(seird.is_simulated());
    Ok(())
}

#[test]
fn default_horizon_is_one_hundred_days() -> Result<()> {
    let observed = synthetic(30)?;
    let mut seird = country(&observed.to_vec())?;
    seird.fit()?;
    let curves = seird.simulation(DEFAULT_FORECAST_DAYS)?;
    assert_eq!(curves.len(), 130);
    assert_eq!(curves.time()[129], 129.0);
    Ok(())
}
