// Routines for fitting
pub mod fit;
// Routines for logging
pub mod logger;
// Routines for goodness-of-fit statistics
pub mod math;
// Routines for optimization
pub mod optimization;
// Routines for output
pub mod output;
// Routines for settings
pub mod settings;
// Routines for simulation
pub mod simulation;
