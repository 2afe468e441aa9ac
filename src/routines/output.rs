use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use csv::WriterBuilder;
use eyre::{Result, WrapErr};
use serde::Serialize;

use crate::country::CountrySeird;
use crate::routines::optimization::levenberg_marquardt::Termination;
use crate::structs::parameters::Parameters;

/// Contains all the necessary information of an output file
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

/// Contents of `summary.json`
#[derive(Debug, Serialize)]
struct Summary<'a> {
    code: &'a str,
    name: &'a str,
    population: f64,
    observations: usize,
    first_date: Option<NaiveDate>,
    parameters: &'a Parameters,
    r0: f64,
    r2: f64,
    iterations: usize,
    evaluations: usize,
    cost: f64,
    termination: Termination,
    converged: bool,
    simulated_days: Option<usize>,
}

fn date_after(start: Option<NaiveDate>, days: usize) -> String {
    start
        .and_then(|start| start.checked_add_days(Days::new(days as u64)))
        .map(|date| date.to_string())
        .unwrap_or_default()
}

impl CountrySeird {
    /// Write every output available in the current state to `folder`
    pub fn write_outputs(&self, folder: &str) -> Result<()> {
        tracing::debug!("Writing outputs to {}", folder);
        self.write_fit(folder)?;
        self.write_summary(folder)?;
        if self.is_simulated() {
            self.write_simulation(folder)?;
        }
        Ok(())
    }

    /// Writes `fit.csv`: the observed series next to the fitted curve, in absolute counts
    pub fn write_fit(&self, folder: &str) -> Result<()> {
        let best_fit = self.best_fit()?;
        let outputfile = OutputFile::new(folder, "fit.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(outputfile.file());

        writer.write_record(["date", "time", "confirmed", "deaths", "best_fit"])?;
        for (k, (row, fitted)) in self.data().rows().iter().zip(best_fit.iter()).enumerate() {
            writer.write_record(&[
                row.date.to_string(),
                k.to_string(),
                row.confirmed.to_string(),
                row.deaths.to_string(),
                fitted.to_string(),
            ])?;
        }
        writer.flush()?;
        tracing::info!("Fit written to {:?}", outputfile.relative_path());
        Ok(())
    }

    /// Writes `simulation.csv`: the five compartments in absolute counts, one row per day
    pub fn write_simulation(&self, folder: &str) -> Result<()> {
        let trajectory = self.curves()?;
        let start = self.data().first_date();
        let outputfile = OutputFile::new(folder, "simulation.csv")?;
        let mut writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(outputfile.file());

        writer.write_record([
            "date",
            "time",
            "susceptible",
            "exposed",
            "infected",
            "recovered",
            "dead",
        ])?;
        for (k, (t, values)) in trajectory.rows().enumerate() {
            let mut record = vec![date_after(start, k), t.to_string()];
            record.extend(values.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        tracing::info!("Simulation written to {:?}", outputfile.relative_path());
        Ok(())
    }

    /// Writes `summary.json` with the fitted parameters and optimizer diagnostics
    pub fn write_summary(&self, folder: &str) -> Result<()> {
        let fit = self.fit_result()?;
        let report = fit.report();
        let summary = Summary {
            code: self.code(),
            name: self.name(),
            population: self.population(),
            observations: self.data().len(),
            first_date: self.data().first_date(),
            parameters: fit.parameters(),
            r0: fit.r0(),
            r2: fit.r2(),
            iterations: report.iterations,
            evaluations: report.evaluations,
            cost: report.cost,
            termination: report.termination,
            converged: report.termination.converged(),
            simulated_days: self.curves().ok().map(|trajectory| trajectory.len()),
        };
        let outputfile = OutputFile::new(folder, "summary.json")?;
        serde_json::to_writer_pretty(outputfile.file(), &summary)
            .wrap_err("Failed to write summary.json")?;
        Ok(())
    }
}
