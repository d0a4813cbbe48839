pub mod cost_matrix;
pub mod multipliers;

pub use cost_matrix::{CostMatrix, MatrixCell, MatrixError};
pub use multipliers::TimeMultipliers;

/// External node identifier, as supplied by the host.
pub type Id = i64;

/// Travel cost in time units.
pub type Cost = f64;

/// Instants and durations, in seconds relative to the problem's zero point.
pub type Time = f64;
