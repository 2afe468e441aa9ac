use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{SeirdError, SeirdResult};

use super::{CountryData, CountryTable, Observation, ObservedSeries, TimeSeriesProvider};

/// A row of the long-format input file
#[derive(Debug, Deserialize)]
struct Row {
    code: String,
    name: String,
    population: f64,
    date: NaiveDate,
    confirmed: f64,
    #[serde(default)]
    deaths: Option<f64>,
}

/// Offline provider backed by a CSV file with the columns
/// `code,name,population,date,confirmed,deaths`.
///
/// The file is read once; countries are served from memory.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    countries: BTreeMap<String, CountryData>,
    table: CountryTable,
}

impl CsvProvider {
    pub fn from_path(path: impl AsRef<Path>) -> SeirdResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| SeirdError::Io(format!("Failed to open {:?}: {}", path, e)))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> SeirdResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        // Convert headers to lowercase
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_lowercase())
            .collect::<Vec<_>>();
        reader.set_headers(csv::StringRecord::from(headers));

        let mut countries: BTreeMap<String, (CountryData, Vec<Observation>)> = BTreeMap::new();
        for row_result in reader.deserialize() {
            let row: Row = row_result?;
            let code = row.code.to_uppercase();
            let (country, rows) = countries.entry(code.clone()).or_insert_with(|| {
                let country = CountryData {
                    code,
                    name: row.name.clone(),
                    population: row.population,
                    series: ObservedSeries::default(),
                };
                (country, Vec::new())
            });
            if country.population != row.population {
                return Err(SeirdError::data(format!(
                    "Country {} has inconsistent populations ({} and {})",
                    country.code, country.population, row.population
                )));
            }
            rows.push(Observation {
                date: row.date,
                confirmed: row.confirmed,
                deaths: row.deaths.unwrap_or(0.0),
            });
        }

        let countries: BTreeMap<String, CountryData> = countries
            .into_iter()
            .map(|(code, (mut country, mut rows))| {
                rows.sort_by_key(|row| row.date);
                country.series = ObservedSeries::new(rows);
                (code, country)
            })
            .collect();

        let table = CountryTable::new(
            countries
                .values()
                .map(|country| (country.code.clone(), country.name.clone())),
        );
        tracing::debug!("Loaded observed series for {} countries", countries.len());

        Ok(CsvProvider { countries, table })
    }
}

impl TimeSeriesProvider for CsvProvider {
    fn country(&self, code: &str) -> SeirdResult<CountryData> {
        self.countries
            .get(&code.trim().to_uppercase())
            .cloned()
            .ok_or_else(|| {
                SeirdError::DataUnavailable(format!("No data for country code {:?}", code))
            })
    }

    fn locations(&self) -> &CountryTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "\
code,name,population,date,confirmed,deaths
IT,Italy,60000000,2020-02-21,20,1
IT,Italy,60000000,2020-02-20,0,0
IT,Italy,60000000,2020-02-22,62,2
br,Brazil,210000000,2020-02-26,1,
br,Brazil,210000000,2020-02-27,1,0
";

    #[test]
    fn rows_are_grouped_by_country_and_sorted() {
        let provider = CsvProvider::from_reader(DATA.as_bytes()).unwrap();
        let italy = provider.country("it").unwrap();
        assert_eq!(italy.name, "Italy");
        assert_eq!(italy.population, 6e7);
        assert_eq!(italy.series.confirmed().to_vec(), vec![0.0, 20.0, 62.0]);
        assert_eq!(provider.locations().len(), 2);
    }

    #[test]
    fn missing_deaths_default_to_zero() {
        let provider = CsvProvider::from_reader(DATA.as_bytes()).unwrap();
        let brazil = provider.country("BR").unwrap();
        assert_eq!(brazil.code, "BR");
        assert_eq!(brazil.series.deaths().to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn unknown_country_is_unavailable() {
        let provider = CsvProvider::from_reader(DATA.as_bytes()).unwrap();
        assert!(matches!(
            provider.country("XX"),
            Err(SeirdError::DataUnavailable(_))
        ));
    }

    #[test]
    fn inconsistent_population_is_rejected() {
        let data = "code,name,population,date,confirmed,deaths\n\
                    IT,Italy,1000,2020-02-21,1,0\n\
                    IT,Italy,2000,2020-02-22,2,0\n";
        assert!(matches!(
            CsvProvider::from_reader(data.as_bytes()),
            Err(SeirdError::Data(_))
        ));
    }

    #[test]
    fn malformed_rows_are_io_errors() {
        let data = "code,name,population,date,confirmed,deaths\nIT,Italy,lots,2020-02-21,1,0\n";
        assert!(matches!(
            CsvProvider::from_reader(data.as_bytes()),
            Err(SeirdError::Io(_))
        ));
    }
}
