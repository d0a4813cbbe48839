use serde::{Deserialize, Serialize};

use crate::{Amount, Cost, Id};

use super::pick_deliver::PickDeliver;
use super::route::{Route, VIOLATION_PENALTY};
use super::stop_node::StopKind;

/// One per-stop result row, in the host's wire shape. Durations and
/// instants are rounded to whole seconds. The row stream of a solution ends
/// with a summary row (`vehicle_id == -2`) carrying totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRow {
    pub seq: i32,
    pub vehicle_seq: i32,
    pub vehicle_id: Id,
    pub stop_seq: i32,
    pub stop_kind: i32,
    pub order_id: Id,
    pub cargo: Amount,
    pub travel_time: i64,
    pub arrival_time: i64,
    pub wait_time: i64,
    pub service_time: i64,
    pub departure_time: i64,
    pub cv_total: i32,
    pub twv_total: i32,
}

/// A vehicle's served orders as an id sequence: first occurrence is the
/// pickup, second the delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStops {
    pub vehicle_id: Id,
    pub stops: Vec<Id>,
}

/// A complete assignment at one point in time: every vehicle's route plus
/// the orders no route serves. Operators build new `Solution`s rather than
/// mutating a shared one; the best solution seen is kept separately from the
/// working solution.
#[derive(Debug, Clone)]
pub struct Solution {
    routes: Vec<Route>,
    unassigned: Vec<usize>,
    cost: Cost,
    twv: u32,
    cv: u32,
}

impl Solution {
    pub fn new(problem: &PickDeliver, routes: Vec<Route>) -> Self {
        let mut unassigned: Vec<usize> = (0..problem.orders().len())
            .filter(|idx| !routes.iter().any(|r| r.has_order(*idx)))
            .collect();
        unassigned.sort_unstable();

        let cost = routes.iter().map(Route::total_travel_time).sum();
        let twv = routes.iter().map(Route::twv).sum();
        let cv = routes.iter().map(Route::cv).sum();

        Solution {
            routes,
            unassigned,
            cost,
            twv,
            cv,
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn into_routes(self) -> Vec<Route> {
        self.routes
    }

    pub fn unassigned(&self) -> &[usize] {
        &self.unassigned
    }

    pub fn all_served(&self) -> bool {
        self.unassigned.is_empty()
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    pub fn twv(&self) -> u32 {
        self.twv
    }

    pub fn cv(&self) -> u32 {
        self.cv
    }

    pub fn violations(&self) -> u32 {
        self.twv + self.cv
    }

    pub fn objective(&self) -> Cost {
        self.cost + VIOLATION_PENALTY * Cost::from(self.violations())
    }

    /// Lexicographic comparison: fewer hard violations, then fewer
    /// unassigned orders, then lower cost.
    pub fn is_better_than(&self, other: &Solution) -> bool {
        (self.violations(), self.unassigned.len())
            .cmp(&(other.violations(), other.unassigned.len()))
            .then(self.cost.total_cmp(&other.cost))
            .is_lt()
    }

    /// Flattens the solution into host result rows. Unused vehicles are
    /// omitted; a trailing summary row carries the aggregate totals.
    pub fn stop_rows(&self, problem: &PickDeliver) -> Vec<StopRow> {
        let mut rows = Vec::new();
        let mut seq = 0;
        let mut vehicle_seq = 0;

        for route in &self.routes {
            if route.is_unused() {
                continue;
            }
            vehicle_seq += 1;
            let vehicle_id = problem.vehicles()[route.vehicle_idx()].id();
            for (stop_seq, stop) in route.stops().iter().enumerate() {
                let order_id = stop
                    .node
                    .order()
                    .map_or(-1, |idx| problem.orders().get(idx).id());
                rows.push(StopRow {
                    seq,
                    vehicle_seq,
                    vehicle_id,
                    stop_seq: stop_seq as i32,
                    stop_kind: stop.node.kind().code(),
                    order_id,
                    cargo: stop.load,
                    travel_time: stop.travel.round() as i64,
                    arrival_time: stop.arrival.round() as i64,
                    wait_time: stop.wait.round() as i64,
                    service_time: stop.node.service().round() as i64,
                    departure_time: stop.departure.round() as i64,
                    cv_total: stop.cv as i32,
                    twv_total: stop.twv as i32,
                });
                seq += 1;
            }
        }

        let total_duration: f64 = self.routes.iter().map(Route::duration).sum();
        rows.push(StopRow {
            seq,
            vehicle_seq: -2,
            vehicle_id: -2,
            stop_seq: -1,
            stop_kind: -1,
            order_id: -1,
            cargo: 0,
            travel_time: self
                .routes
                .iter()
                .map(Route::total_travel_time)
                .sum::<f64>()
                .round() as i64,
            arrival_time: 0,
            wait_time: self
                .routes
                .iter()
                .map(Route::total_wait_time)
                .sum::<f64>()
                .round() as i64,
            service_time: self
                .routes
                .iter()
                .map(Route::total_service_time)
                .sum::<f64>()
                .round() as i64,
            departure_time: total_duration.round() as i64,
            cv_total: self.cv as i32,
            twv_total: self.twv as i32,
        });
        rows
    }

    /// Per-vehicle order-id sequences for the replanning entry point. Every
    /// vehicle is reported, including empty ones.
    pub fn vehicle_stops(&self, problem: &PickDeliver) -> Vec<VehicleStops> {
        self.routes
            .iter()
            .map(|route| VehicleStops {
                vehicle_id: problem.vehicles()[route.vehicle_idx()].id(),
                stops: route
                    .stops()
                    .iter()
                    .filter(|s| {
                        matches!(s.node.kind(), StopKind::Pickup | StopKind::Delivery)
                    })
                    .filter_map(|s| s.node.order())
                    .map(|idx| problem.orders().get(idx).id())
                    .collect(),
            })
            .collect()
    }
}
