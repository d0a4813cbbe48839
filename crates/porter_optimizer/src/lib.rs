pub mod cancellation;
pub mod driver;
pub mod error;
pub mod initialsol;
pub mod input;
pub mod messages;
pub mod optimizers;
pub mod problem;

pub use porter_matrix::{Cost, Id, Time};

/// Demand and capacity units.
pub type Amount = i64;

/// Vehicle speed multiplier applied to matrix travel times.
pub type Speed = f64;
