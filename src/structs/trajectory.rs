use ndarray::{Array1, ArrayView1};
use serde::Serialize;

use crate::error::{SeirdError, SeirdResult};

/// The five SEIRD compartments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infected,
    Recovered,
    Dead,
}

impl Compartment {
    pub const ALL: [Compartment; 5] = [
        Compartment::Susceptible,
        Compartment::Exposed,
        Compartment::Infected,
        Compartment::Recovered,
        Compartment::Dead,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Compartment::Susceptible => "susceptible",
            Compartment::Exposed => "exposed",
            Compartment::Infected => "infected",
            Compartment::Recovered => "recovered",
            Compartment::Dead => "dead",
        }
    }

    fn index(&self) -> usize {
        match self {
            Compartment::Susceptible => 0,
            Compartment::Exposed => 1,
            Compartment::Infected => 2,
            Compartment::Recovered => 3,
            Compartment::Dead => 4,
        }
    }
}

/// Simulated SEIRD curves over a time grid.
///
/// Values are stored as fractions of the population; the plain accessors
/// ([Trajectory::susceptible], [Trajectory::compartment], ...) scale them back
/// to absolute counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    time: Vec<f64>,
    fractions: [Array1<f64>; 5],
    population: f64,
}

impl Trajectory {
    /// Build a trajectory from one `[S, E, I, R, D]` state per time point
    pub fn from_states(time: Vec<f64>, states: &[[f64; 5]], population: f64) -> SeirdResult<Self> {
        if time.len() != states.len() {
            return Err(SeirdError::data(format!(
                "Trajectory has {} time points but {} states",
                time.len(),
                states.len()
            )));
        }
        let fractions = std::array::from_fn(|c| states.iter().map(|state| state[c]).collect());
        Ok(Trajectory {
            time,
            fractions,
            population,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    /// Compartment values as population fractions
    pub fn fractions(&self, compartment: Compartment) -> ArrayView1<f64> {
        self.fractions[compartment.index()].view()
    }

    /// Compartment values in absolute counts
    pub fn compartment(&self, compartment: Compartment) -> Array1<f64> {
        &self.fractions[compartment.index()] * self.population
    }

    pub fn susceptible(&self) -> Array1<f64> {
        self.compartment(Compartment::Susceptible)
    }

    pub fn exposed(&self) -> Array1<f64> {
        self.compartment(Compartment::Exposed)
    }

    pub fn infected(&self) -> Array1<f64> {
        self.compartment(Compartment::Infected)
    }

    pub fn recovered(&self) -> Array1<f64> {
        self.compartment(Compartment::Recovered)
    }

    pub fn dead(&self) -> Array1<f64> {
        self.compartment(Compartment::Dead)
    }

    /// S+E+I+R+D at every time point, in population fractions
    pub fn totals(&self) -> Array1<f64> {
        self.fractions
            .iter()
            .fold(Array1::zeros(self.len()), |acc, series| acc + series)
    }

    /// Largest drift of [Trajectory::totals] away from its value at the first time point.
    ///
    /// The derivatives sum to zero, so the total is conserved along the
    /// trajectory. It is not exactly one: the seeded case adds `1/N`.
    pub fn conservation_error(&self) -> f64 {
        let totals = self.totals();
        let start = match totals.first() {
            Some(start) => *start,
            None => return 0.0,
        };
        totals
            .iter()
            .fold(0.0_f64, |worst, total| worst.max((total - start).abs()))
    }

    /// One `[S, E, I, R, D]` row per time point, in absolute counts
    pub fn rows(&self) -> impl Iterator<Item = (f64, [f64; 5])> + '_ {
        self.time.iter().enumerate().map(move |(k, &t)| {
            let row = std::array::from_fn(|c| self.fractions[c][k] * self.population);
            (t, row)
        })
    }
}
