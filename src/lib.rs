//! Fit the SEIRD epidemiological model to a country's observed case counts and
//! simulate its trajectory forward in time.
//!
//! The typical flow goes through [country::CountrySeird]:
//!
//! ```no_run
//! use seird::prelude::*;
//!
//! # fn main() -> eyre::Result<()> {
//! let provider = CsvProvider::from_path("data/countries.csv")?;
//! let mut italy = CountrySeird::from_provider(&provider, "IT")?;
//! italy.fit()?;
//! println!("R0 = {:.2}, R² = {:.3}", italy.r0()?, italy.r2()?);
//! let curves = italy.simulation(DEFAULT_FORECAST_DAYS)?;
//! println!("Peak infected: {:.0}", curves.infected().fold(0.0_f64, |a, &b| a.max(b)));
//! # Ok(())
//! # }
//! ```

pub mod country;
pub mod data;
pub mod entrypoints;
pub mod error;
pub mod routines;
pub mod simulator;
pub mod structs;

pub mod prelude {
    pub use crate::country::{CountrySeird, State, DEFAULT_FORECAST_DAYS};
    pub use crate::data::{
        CountryData, CountryTable, CsvProvider, Observation, ObservedSeries, TimeSeriesProvider,
    };
    pub use crate::entrypoints;
    pub use crate::error::{SeirdError, SeirdResult};
    pub use crate::routines::fit::{fit, FitResult};
    pub use crate::routines::logger;
    pub use crate::routines::settings::{read_settings, FitSettings, Settings, SolverSettings};
    pub use crate::routines::simulation::simulate;
    pub use crate::simulator::{time_grid, Mode, SeirdOutput};
    pub use crate::structs::parameters::Parameters;
    pub use crate::structs::trajectory::{Compartment, Trajectory};
}
