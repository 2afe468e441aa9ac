use std::fmt;

/// Crate-wide result alias for the numerical core and its collaborators.
pub type SeirdResult<T> = Result<T, SeirdError>;

/// Errors raised by the SEIRD engine.
///
/// The variants are the contract, the messages are presentational.
#[derive(Debug, Clone, PartialEq)]
pub enum SeirdError {
    /// A fit-dependent value was requested before `fit()` succeeded.
    NotFitted,
    /// Trajectory data was requested before `simulation()` succeeded.
    NotSimulated,
    /// The optimizer did not reach any of its termination criteria.
    FitDiverged {
        iterations: usize,
        cost: f64,
        damping: f64,
        reason: String,
    },
    /// The ODE solver failed at time `t`.
    Integration { t: f64, reason: String },
    /// Malformed or degenerate input.
    Data(String),
    /// The time-series provider could not supply the requested country.
    DataUnavailable(String),
    /// Filesystem or CSV failure while reading input data.
    Io(String),
}

impl SeirdError {
    pub fn data(message: impl Into<String>) -> Self {
        SeirdError::Data(message.into())
    }

    pub fn integration(t: f64, reason: impl Into<String>) -> Self {
        SeirdError::Integration {
            t,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SeirdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeirdError::NotFitted => write!(
                f,
                "No fit was found. You should consider running the fit method first."
            ),
            SeirdError::NotSimulated => write!(
                f,
                "No simulation was found. You should consider running the simulation method first."
            ),
            SeirdError::FitDiverged {
                iterations,
                cost,
                damping,
                reason,
            } => write!(
                f,
                "Fit diverged after {} iterations ({}): cost = {:e}, damping = {:e}",
                iterations, reason, cost, damping
            ),
            SeirdError::Integration { t, reason } => {
                write!(f, "ODE integration failed at t = {}: {}", t, reason)
            }
            SeirdError::Data(msg) => write!(f, "Invalid data: {}", msg),
            SeirdError::DataUnavailable(msg) => write!(f, "Data unavailable: {}", msg),
            SeirdError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for SeirdError {}

impl From<std::io::Error> for SeirdError {
    fn from(err: std::io::Error) -> Self {
        SeirdError::Io(err.to_string())
    }
}

impl From<csv::Error> for SeirdError {
    fn from(err: csv::Error) -> Self {
        SeirdError::Io(err.to_string())
    }
}
