use fxhash::FxHashMap;
use geo_types::Coord;

use crate::{Id, Speed};
use porter_matrix::{CostMatrix, MatrixError};

use super::records::{EuclideanOrderRecord, EuclideanVehicleRecord, OrderRecord, VehicleRecord};

/// Output of euclidean node synthesis: plain records over synthesized node
/// ids plus the coordinate-derived matrix.
pub struct SynthesizedNodes {
    pub orders: Vec<OrderRecord>,
    pub vehicles: Vec<VehicleRecord>,
    pub matrix: CostMatrix,
}

/// Replaces coordinate pairs with synthesized node ids (identical
/// coordinates share one id) and derives the matrix from the euclidean
/// distances.
pub fn synthesize_nodes(
    orders: &[EuclideanOrderRecord],
    vehicles: &[EuclideanVehicleRecord],
    factor: f64,
) -> Result<SynthesizedNodes, MatrixError> {
    let mut interner = NodeInterner::default();

    let orders: Vec<OrderRecord> = orders
        .iter()
        .map(|o| OrderRecord {
            id: o.id,
            demand: o.demand,
            pick_node_id: interner.intern(o.pick),
            pick_open: o.pick_open,
            pick_close: o.pick_close,
            pick_service: o.pick_service,
            deliver_node_id: interner.intern(o.deliver),
            deliver_open: o.deliver_open,
            deliver_close: o.deliver_close,
            deliver_service: o.deliver_service,
        })
        .collect();

    let vehicles: Vec<VehicleRecord> = vehicles
        .iter()
        .map(|v| VehicleRecord {
            id: v.id,
            capacity: v.capacity,
            count: v.count,
            speed: v.speed,
            start_node_id: interner.intern(v.start),
            start_open: v.start_open,
            start_close: v.start_close,
            start_service: v.start_service,
            end_node_id: interner.intern(v.end),
            end_open: v.end_open,
            end_close: v.end_close,
            end_service: v.end_service,
            stops: v.stops.clone(),
        })
        .collect();

    let matrix = CostMatrix::from_coordinates(&interner.points, factor)?;
    Ok(SynthesizedNodes {
        orders,
        vehicles,
        matrix,
    })
}

/// Travel time between two points at a given speed, for callers that want
/// the euclidean metric without a full matrix.
pub fn travel_time(a: Coord, b: Coord, speed: Speed) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt() / speed
}

#[derive(Default)]
struct NodeInterner {
    by_bits: FxHashMap<(u64, u64), Id>,
    points: Vec<(Id, Coord)>,
}

impl NodeInterner {
    fn intern(&mut self, point: Coord) -> Id {
        let key = (point.x.to_bits(), point.y.to_bits());
        if let Some(&id) = self.by_bits.get(&key) {
            return id;
        }
        let id = self.points.len() as Id + 1;
        self.by_bits.insert(key, id);
        self.points.push((id, point));
        id
    }
}
