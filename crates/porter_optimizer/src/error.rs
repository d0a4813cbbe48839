use thiserror::Error;

use crate::{Amount, Id};
use porter_matrix::MatrixError;

/// Input-data errors raised while constructing the problem. Each variant
/// carries the offending record's id so the host can point at the bad row.
#[derive(Error, Debug)]
pub enum ProblemError {
    #[error("Order {id} has an invalid time window")]
    InvalidOrderTimeWindow { id: Id },
    #[error("Vehicle {id} has an invalid time window")]
    InvalidVehicleTimeWindow { id: Id },
    #[error("Order {id} has non-positive demand {demand}")]
    NonPositiveDemand { id: Id, demand: Amount },
    #[error("Order {id} has a negative service duration")]
    NegativeOrderService { id: Id },
    #[error("Vehicle {id} has a negative service duration")]
    NegativeVehicleService { id: Id },
    #[error("Vehicle {id} has negative capacity {capacity}")]
    NegativeCapacity { id: Id, capacity: Amount },
    #[error("Vehicle {id} has non-positive speed {speed}")]
    NonPositiveSpeed { id: Id, speed: f64 },
    #[error("Vehicle {vehicle_id} stops reference unknown order {order_id}")]
    UnknownStopOrder { vehicle_id: Id, order_id: Id },
    #[error("Vehicle {vehicle_id} stops mention order {order_id} an odd number of times")]
    MalformedStopSequence { vehicle_id: Id, order_id: Id },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// Hard failures of a whole solve call.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error("Unknown initial solution code {0}")]
    UnknownInitialsCode(i32),
    #[error("Internal invariant violation: {0}")]
    Internal(String),
    #[error("Caught unknown exception")]
    Unknown,
}
