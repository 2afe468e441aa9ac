//! Observed epidemic data and the providers that supply it

use chrono::NaiveDate;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{SeirdError, SeirdResult};

pub mod reader;
pub mod table;

pub use reader::CsvProvider;
pub use table::CountryTable;

/// One day of cumulative counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub confirmed: f64,
    pub deaths: f64,
}

/// Cumulative confirmed cases and deaths, one row per day
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservedSeries {
    rows: Vec<Observation>,
}

impl ObservedSeries {
    pub fn new(rows: Vec<Observation>) -> Self {
        ObservedSeries { rows }
    }

    /// Build a daily series starting at `start`
    pub fn from_counts(start: NaiveDate, confirmed: &[f64], deaths: &[f64]) -> SeirdResult<Self> {
        if confirmed.len() != deaths.len() {
            return Err(SeirdError::data(format!(
                "Got {} confirmed counts but {} death counts",
                confirmed.len(),
                deaths.len()
            )));
        }
        let rows = start
            .iter_days()
            .zip(confirmed.iter().zip(deaths.iter()))
            .map(|(date, (&confirmed, &deaths))| Observation {
                date,
                confirmed,
                deaths,
            })
            .collect();
        Ok(ObservedSeries { rows })
    }

    /// Drop the days before the first confirmed case
    pub fn trim_leading_zeros(mut self) -> Self {
        let first = self
            .rows
            .iter()
            .position(|row| row.confirmed > 0.0)
            .unwrap_or(self.rows.len());
        self.rows = self.rows.split_off(first);
        self
    }

    /// Check the series can be fitted
    pub fn validate(&self) -> SeirdResult<()> {
        let first = match self.rows.first() {
            Some(first) => first,
            None => return Err(SeirdError::data("Observed series is empty")),
        };
        if !(first.confirmed > 0.0) {
            return Err(SeirdError::data(
                "Observed series must start with at least one confirmed case",
            ));
        }
        if let Some(row) = self
            .rows
            .iter()
            .find(|row| !row.confirmed.is_finite() || !row.deaths.is_finite())
        {
            return Err(SeirdError::data(format!(
                "Non-finite counts on {}",
                row.date
            )));
        }
        for pair in self.rows.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeirdError::data(format!(
                    "Dates must be strictly increasing, found {} after {}",
                    pair[1].date, pair[0].date
                )));
            }
            if pair[1].confirmed < pair[0].confirmed {
                return Err(SeirdError::data(format!(
                    "Cumulative confirmed cases decrease on {}",
                    pair[1].date
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|row| row.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|row| row.date).collect()
    }

    pub fn confirmed(&self) -> Array1<f64> {
        self.rows.iter().map(|row| row.confirmed).collect()
    }

    pub fn deaths(&self) -> Array1<f64> {
        self.rows.iter().map(|row| row.deaths).collect()
    }

    /// Confirmed cases as fractions of `population`
    pub fn fractions(&self, population: f64) -> SeirdResult<Array1<f64>> {
        if !population.is_finite() || population <= 0.0 {
            return Err(SeirdError::data(format!(
                "Population must be positive, got {}",
                population
            )));
        }
        Ok(self.confirmed() / population)
    }
}

/// Everything a provider knows about one country
#[derive(Debug, Clone, PartialEq)]
pub struct CountryData {
    pub code: String,
    pub name: String,
    pub population: f64,
    pub series: ObservedSeries,
}

/// Source of per-country observed series
pub trait TimeSeriesProvider {
    /// Fetch the series of the country with the given code, matched case-insensitively
    fn country(&self, code: &str) -> SeirdResult<CountryData>;

    /// The (code, name) table of every country the provider serves
    fn locations(&self) -> &CountryTable;
}
