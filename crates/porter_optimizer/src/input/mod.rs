pub mod euclidean;
pub mod records;
pub mod time;

pub use euclidean::synthesize_nodes;
pub use records::{
    EuclideanOrderRecord, EuclideanVehicleRecord, MatrixRecord, MultiplierRecord, OrderRecord,
    VehicleRecord,
};
