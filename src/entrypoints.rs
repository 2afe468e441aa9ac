use crate::country::CountrySeird;
use crate::data::{CsvProvider, TimeSeriesProvider};
use crate::routines::logger;
use crate::routines::settings::Settings;

use eyre::{eyre, Result, WrapErr};
use std::time::Instant;

/// Primary entrypoint for seird
///
/// Loads the observed series of `config.country` from `paths.data`, fits the
/// SEIRD model, simulates `config.forecast_days` past the observed series and,
/// if `config.output` is set, writes the results to `paths.output`.
pub fn run(settings: Settings) -> Result<CountrySeird> {
    logger::setup_log(&settings)?;
    let data_path = settings
        .paths
        .data
        .as_deref()
        .ok_or_else(|| eyre!("No data file given, set `paths.data` in the configuration file"))?;
    let provider = CsvProvider::from_path(data_path)
        .wrap_err_with(|| format!("Failed to read data from {}", data_path))?;
    run_with_provider(settings, &provider)
}

/// Alternative entrypoint taking any [TimeSeriesProvider]
pub fn run_with_provider<P>(settings: Settings, provider: &P) -> Result<CountrySeird>
where
    P: TimeSeriesProvider + ?Sized,
{
    let now = Instant::now();
    settings.validate()?;

    let code = settings
        .config
        .country
        .as_deref()
        .ok_or_else(|| eyre!("No country given, set `config.country` in the configuration file"))?;
    let code = resolve_code(provider, code)?;

    let mut country = CountrySeird::from_provider(provider, &code)
        .wrap_err_with(|| format!("Failed to load country {}", code))?
        .with_settings(settings.fit.clone(), settings.solver.clone());

    // Provide information of the input data
    tracing::info!(
        "{} ({}): {} days of data starting {}, population {}",
        country.name(),
        country.code(),
        country.data().len(),
        country
            .data()
            .first_date()
            .map(|date| date.to_string())
            .unwrap_or_default(),
        country.population()
    );

    if let Err(err) = country.fit() {
        tracing::error!("An error has occurred during model fitting: {}", err);
        return Err(err).wrap_err_with(|| format!("Failed to fit {}", code));
    }
    country
        .simulation(settings.config.forecast_days)
        .wrap_err("Failed to simulate the fitted model")?;

    // Write output files (if configured)
    match settings.config.output {
        true => {
            tracing::info!("Output files will be written to {}", settings.paths.output);
            settings.write()?;
            country.write_outputs(&settings.paths.output)?;
        }
        false => {
            tracing::info!("Output files will not be written - set `output = true` in the configuration file to enable output files")
        }
    }

    tracing::info!("Program complete after {:.2?}", now.elapsed());
    Ok(country)
}

/// Accept either a country code or a name that matches exactly one country
fn resolve_code<P>(provider: &P, query: &str) -> Result<String>
where
    P: TimeSeriesProvider + ?Sized,
{
    let locations = provider.locations();
    if let Some((code, _)) = locations.lookup(query) {
        return Ok(code.to_string());
    }
    let matches = locations.code_search(query);
    match matches.len() {
        1 => Ok(matches.into_keys().next().unwrap_or_default()),
        0 => Err(eyre!("No country matches {:?}", query)),
        _ => Err(eyre!(
            "{:?} matches several countries: {}",
            query,
            matches.keys().cloned().collect::<Vec<_>>().join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CountryData, CountryTable};
    use crate::error::{SeirdError, SeirdResult};

    struct Names(CountryTable);

    impl TimeSeriesProvider for Names {
        fn country(&self, code: &str) -> SeirdResult<CountryData> {
            Err(SeirdError::DataUnavailable(code.to_string()))
        }

        fn locations(&self) -> &CountryTable {
            &self.0
        }
    }

    fn provider() -> Names {
        Names(CountryTable::new([
            ("NE", "Niger"),
            ("NG", "Nigeria"),
            ("IT", "Italy"),
        ]))
    }

    #[test]
    fn codes_and_unique_names_resolve() {
        assert_eq!(resolve_code(&provider(), "it").unwrap(), "IT");
        assert_eq!(resolve_code(&provider(), "ital").unwrap(), "IT");
        assert_eq!(resolve_code(&provider(), "nigeria").unwrap(), "NG");
    }

    #[test]
    fn ambiguous_and_unknown_names_fail() {
        assert!(resolve_code(&provider(), "niger").is_err());
        assert!(resolve_code(&provider(), "Atlantis").is_err());
    }

    #[test]
    fn missing_country_is_reported() {
        let settings = Settings::default();
        assert!(run_with_provider(settings, &provider()).is_err());
    }
}
