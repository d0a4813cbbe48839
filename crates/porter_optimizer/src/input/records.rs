use geo_types::Coord;
use serde::{Deserialize, Serialize};

use crate::{Amount, Id, Speed};
use porter_matrix::{Cost, MatrixCell, TimeMultipliers};

/// One transportation order row. Times are relative seconds ("plain" mode);
/// absolute timestamps are converted up front with [`crate::input::time`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Id,
    pub demand: Amount,
    pub pick_node_id: Id,
    pub pick_open: i64,
    pub pick_close: i64,
    pub pick_service: i64,
    pub deliver_node_id: Id,
    pub deliver_open: i64,
    pub deliver_close: i64,
    pub deliver_service: i64,
}

/// One vehicle row, describing `count` identical trucks. `stops` is an
/// optional existing order-id sequence for replanning (first occurrence =
/// pickup, second = delivery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: Id,
    pub capacity: Amount,
    pub count: u32,
    pub speed: Speed,
    pub start_node_id: Id,
    pub start_open: i64,
    pub start_close: i64,
    pub start_service: i64,
    pub end_node_id: Id,
    pub end_open: i64,
    pub end_close: i64,
    pub end_service: i64,
    pub stops: Vec<Id>,
}

/// One `(from, to, cost)` matrix row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatrixRecord {
    pub from_id: Id,
    pub to_id: Id,
    pub cost: Cost,
}

impl From<MatrixRecord> for MatrixCell {
    fn from(record: MatrixRecord) -> Self {
        MatrixCell {
            from_id: record.from_id,
            to_id: record.to_id,
            cost: record.cost,
        }
    }
}

/// One time-of-day multiplier row: the multiplier applies from `start`
/// until the next row's start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MultiplierRecord {
    pub start: i64,
    pub multiplier: f64,
}

pub fn multipliers_from_records(records: &[MultiplierRecord]) -> TimeMultipliers {
    TimeMultipliers::new(
        records
            .iter()
            .map(|r| (r.start as f64, r.multiplier))
            .collect(),
    )
}

/// Euclidean-mode order row: coordinates instead of matrix node ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EuclideanOrderRecord {
    pub id: Id,
    pub demand: Amount,
    pub pick: Coord,
    pub pick_open: i64,
    pub pick_close: i64,
    pub pick_service: i64,
    pub deliver: Coord,
    pub deliver_open: i64,
    pub deliver_close: i64,
    pub deliver_service: i64,
}

/// Euclidean-mode vehicle row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EuclideanVehicleRecord {
    pub id: Id,
    pub capacity: Amount,
    pub count: u32,
    pub speed: Speed,
    pub start: Coord,
    pub start_open: i64,
    pub start_close: i64,
    pub start_service: i64,
    pub end: Coord,
    pub end_open: i64,
    pub end_close: i64,
    pub end_service: i64,
    pub stops: Vec<Id>,
}
