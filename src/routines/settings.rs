use config::Config as eConfig;
use config::{Environment, File, FileFormat};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use serde_derive::Serialize;
use std::path::Path;

use crate::routines::output::OutputFile;

/// Contains all settings for a SEIRD run
#[derive(Debug, Deserialize, Clone, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub fit: FitSettings,
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(default)]
    pub log: Log,
}

/// Input and output locations
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Paths {
    /// Long-format CSV with one row per country and day
    pub data: Option<String>,
    /// Folder receiving fit.csv, simulation.csv, summary.json and settings.json
    #[serde(default = "default_output_folder")]
    pub output: String,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            data: None,
            output: default_output_folder(),
        }
    }
}

/// What to run
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// ISO3 code or name of the country to fit
    pub country: Option<String>,
    /// Days simulated past the end of the observed series
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,
    /// Write output files
    #[serde(default = "default_true")]
    pub output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            country: None,
            forecast_days: default_forecast_days(),
            output: true,
        }
    }
}

/// Controls for the Levenberg-Marquardt fit
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct FitSettings {
    pub max_iters: usize,
    /// Relative cost reduction below which the fit stops
    pub ftol: f64,
    /// Relative step length below which the fit stops
    pub xtol: f64,
    /// Scaled gradient below which the fit stops
    pub gtol: f64,
    /// Relative step for the forward-difference Jacobian
    pub fd_step: f64,
    pub initial_damping: f64,
    /// Evaluate Jacobian columns in parallel
    pub parallel: bool,
}

impl Default for FitSettings {
    fn default() -> Self {
        FitSettings {
            max_iters: 1000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 0.0,
            fd_step: f64::EPSILON.sqrt(),
            initial_damping: 1e-3,
            parallel: true,
        }
    }
}

/// Tolerances for the Dormand-Prince integrator
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SolverSettings {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            rtol: 1e-8,
            atol: 1e-12,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file name inside the output folder
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Settings {
    /// Check values that deserialize fine but cannot be run
    pub fn validate(&self) -> Result<()> {
        if self.fit.max_iters == 0 {
            eyre::bail!("fit.max_iters must be at least 1");
        }
        for (name, value) in [
            ("fit.ftol", self.fit.ftol),
            ("fit.xtol", self.fit.xtol),
            ("fit.gtol", self.fit.gtol),
        ] {
            if !(value >= 0.0) {
                eyre::bail!("{} must be non-negative, got {}", name, value);
            }
        }
        for (name, value) in [
            ("fit.fd_step", self.fit.fd_step),
            ("fit.initial_damping", self.fit.initial_damping),
            ("solver.rtol", self.solver.rtol),
            ("solver.atol", self.solver.atol),
        ] {
            if !(value > 0.0) {
                eyre::bail!("{} must be positive, got {}", name, value);
            }
        }
        Ok(())
    }

    /// Writes a copy of the parsed settings to `settings.json` in the output folder
    pub fn write(&self) -> Result<()> {
        let serialized =
            serde_json::to_string_pretty(self).wrap_err("Failed to serialize settings")?;
        let outputfile = OutputFile::new(&self.paths.output, "settings.json")?;
        std::io::Write::write_all(&mut outputfile.file_owned(), serialized.as_bytes())
            .wrap_err("Failed to write settings.json")?;
        Ok(())
    }
}

/// Parses the settings from a TOML configuration file
///
/// Every value can be overridden from the environment with the `SEIRD_` prefix
/// and `__` between sections, e.g. `SEIRD_CONFIG__COUNTRY=BRA` or
/// `SEIRD_FIT__MAX_ITERS=200`.
pub fn read_settings(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let name = path
        .to_str()
        .ok_or_else(|| eyre::eyre!("Settings path is not valid UTF-8: {:?}", path))?;

    let parsed = eConfig::builder()
        .add_source(File::with_name(name).format(FileFormat::Toml))
        .add_source(
            Environment::with_prefix("SEIRD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .wrap_err_with(|| format!("Failed to read settings from {:?}", path))?;

    let settings: Settings = parsed
        .try_deserialize()
        .wrap_err("Failed to parse settings")?;
    settings.validate()?;

    Ok(settings)
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_folder() -> String {
    "outputs".to_string()
}

fn default_forecast_days() -> usize {
    100
}
