use fxhash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::ProblemError;
use crate::input::records::{OrderRecord, VehicleRecord};
use crate::messages::MessageLog;
use crate::{Id, Speed, Time};
use porter_matrix::CostMatrix;

use super::order::Order;
use super::orders::Orders;
use super::route::Route;
use super::stop_node::{StopKind, StopNode};
use super::time_window::TimeWindow;
use super::vehicle::Vehicle;

/// The problem facade: owns the order set, the expanded fleet, and the cost
/// matrix, and exposes the compatibility/feasibility oracles every heuristic
/// consumes.
///
/// Construction validates the input records. Malformed records abort with a
/// [`ProblemError`] naming the offending id; orders that are well-formed but
/// unserviceable are excluded with a log entry and reported as skipped, not
/// as a failure.
#[derive(Debug)]
pub struct PickDeliver {
    orders: Orders,
    vehicles: Vec<Vehicle>,
    matrix: CostMatrix,
    speed: Speed,
}

impl PickDeliver {
    pub fn new(
        order_records: &[OrderRecord],
        vehicle_records: &[VehicleRecord],
        matrix: CostMatrix,
        log: &mut MessageLog,
    ) -> Result<Self, ProblemError> {
        let vehicles = build_fleet(vehicle_records, &matrix)?;
        let speed = vehicles
            .iter()
            .map(Vehicle::speed)
            .fold(1.0_f64, f64::max);

        let mut orders = Vec::new();
        for record in order_records {
            if record.demand <= 0 {
                return Err(ProblemError::NonPositiveDemand {
                    id: record.id,
                    demand: record.demand,
                });
            }
            let idx = orders.len();
            let order = build_order(record, idx, &matrix)?;
            if order.is_valid(&matrix, speed) {
                orders.push(order);
            } else {
                debug!(order = record.id, "order excluded: unserviceable windows");
                log.log(format!(
                    "Order {} skipped: delivery cannot be reached within its time window",
                    record.id
                ));
            }
        }

        let known: FxHashSet<Id> = orders.iter().map(Order::id).collect();
        for vehicle in &vehicles {
            for &order_id in vehicle.initial_stops() {
                if !known.contains(&order_id) {
                    return Err(ProblemError::UnknownStopOrder {
                        vehicle_id: vehicle.id(),
                        order_id,
                    });
                }
            }
        }

        let mut orders = Orders::new(orders);
        orders.set_compatibles(&matrix, speed);

        Ok(PickDeliver {
            orders,
            vehicles,
            matrix,
            speed,
        })
    }

    pub fn orders(&self) -> &Orders {
        &self.orders
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn matrix(&self) -> &CostMatrix {
        &self.matrix
    }

    /// Fastest vehicle speed; the prefilters use it so that no possibly
    /// serviceable pair is pruned.
    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn order_idx(&self, order_id: Id) -> Option<usize> {
        self.orders.iter().position(|o| o.id() == order_id)
    }

    /// One empty route per fleet vehicle.
    pub fn empty_routes(&self) -> Vec<Route> {
        (0..self.vehicles.len())
            .map(|idx| Route::new(self, idx))
            .collect()
    }

    /// Vehicles whose capacity and depot windows could serve the order: a
    /// filter, not a solve.
    pub fn compatible_vehicles(&self, order_idx: usize) -> SmallVec<[Id; 4]> {
        let order = self.orders.get(order_idx);
        self.vehicles
            .iter()
            .filter(|v| v.can_serve(order, &self.matrix))
            .map(Vehicle::id)
            .collect()
    }
}

fn window(open: i64, close: i64) -> Result<TimeWindow, super::time_window::BadTimeWindow> {
    TimeWindow::new(open as Time, close as Time)
}

fn build_order(
    record: &OrderRecord,
    idx: usize,
    matrix: &CostMatrix,
) -> Result<Order, ProblemError> {
    if record.pick_service < 0 || record.deliver_service < 0 {
        return Err(ProblemError::NegativeOrderService { id: record.id });
    }
    let pick_window = window(record.pick_open, record.pick_close)
        .map_err(|_| ProblemError::InvalidOrderTimeWindow { id: record.id })?;
    let deliver_window = window(record.deliver_open, record.deliver_close)
        .map_err(|_| ProblemError::InvalidOrderTimeWindow { id: record.id })?;

    let pickup = StopNode::new(
        matrix.node_index(record.pick_node_id)?,
        record.pick_node_id,
        StopKind::Pickup,
        pick_window,
        record.pick_service as Time,
        record.demand,
        Some(idx),
    );
    let delivery = StopNode::new(
        matrix.node_index(record.deliver_node_id)?,
        record.deliver_node_id,
        StopKind::Delivery,
        deliver_window,
        record.deliver_service as Time,
        -record.demand,
        Some(idx),
    );
    Ok(Order::new(idx, record.id, record.demand, pickup, delivery))
}

fn build_fleet(
    records: &[VehicleRecord],
    matrix: &CostMatrix,
) -> Result<Vec<Vehicle>, ProblemError> {
    let mut fleet = Vec::new();
    for record in records {
        if record.capacity < 0 {
            return Err(ProblemError::NegativeCapacity {
                id: record.id,
                capacity: record.capacity,
            });
        }
        if record.speed <= 0.0 {
            return Err(ProblemError::NonPositiveSpeed {
                id: record.id,
                speed: record.speed,
            });
        }
        if record.start_service < 0 || record.end_service < 0 {
            return Err(ProblemError::NegativeVehicleService { id: record.id });
        }

        let start_window = window(record.start_open, record.start_close)
            .map_err(|_| ProblemError::InvalidVehicleTimeWindow { id: record.id })?;
        let end_window = window(record.end_open, record.end_close)
            .map_err(|_| ProblemError::InvalidVehicleTimeWindow { id: record.id })?;

        let start = StopNode::new(
            matrix.node_index(record.start_node_id)?,
            record.start_node_id,
            StopKind::Start,
            start_window,
            record.start_service as Time,
            0,
            None,
        );
        let end = StopNode::new(
            matrix.node_index(record.end_node_id)?,
            record.end_node_id,
            StopKind::End,
            end_window,
            record.end_service as Time,
            0,
            None,
        );

        // A record describes `count` identical trucks; only the first copy
        // inherits the user-supplied stop sequence.
        for copy in 0..record.count.max(1) {
            let stops = if copy == 0 {
                record.stops.clone()
            } else {
                Vec::new()
            };
            fleet.push(Vehicle::new(
                fleet.len(),
                record.id,
                record.capacity,
                record.speed,
                start,
                end,
                stops,
            ));
        }
    }
    Ok(fleet)
}
