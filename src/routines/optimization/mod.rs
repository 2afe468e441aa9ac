// Levenberg-Marquardt driver
pub mod levenberg_marquardt;
// Least-squares problem for the SEIRD model
pub mod problem;
// Bound-enforcing change of variables
pub mod transform;
