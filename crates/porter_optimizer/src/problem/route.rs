use fxhash::FxHashSet;
use serde::Serialize;

use crate::{Amount, Cost, Time};

use super::pick_deliver::PickDeliver;
use super::stop_node::{StopKind, StopNode};

/// Penalty added to the objective for each counted violation when a route is
/// evaluated in the relaxed model.
pub const VIOLATION_PENALTY: Cost = 10_000.0;

/// One evaluated stop: the node plus the schedule and load state computed
/// from the route prefix. `twv`/`cv` are running violation counts up to and
/// including this stop.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RouteStop {
    pub node: StopNode,
    pub travel: Time,
    pub arrival: Time,
    pub wait: Time,
    pub departure: Time,
    pub load: Amount,
    pub twv: u32,
    pub cv: u32,
}

impl RouteStop {
    fn unevaluated(node: StopNode) -> Self {
        RouteStop {
            node,
            travel: 0.0,
            arrival: 0.0,
            wait: 0.0,
            departure: 0.0,
            load: 0,
            twv: 0,
            cv: 0,
        }
    }

    /// Instant at which service begins.
    pub fn service_start(&self) -> Time {
        self.arrival + self.wait
    }
}

/// An ordered stop sequence for one vehicle, bracketed by the start depot at
/// position 0 and the end depot at the last position. Schedule, load, and
/// violation state are re-evaluated incrementally from the earliest modified
/// position, never from scratch.
#[derive(Debug, Clone)]
pub struct Route {
    vehicle_idx: usize,
    stops: Vec<RouteStop>,
    orders_in_route: FxHashSet<usize>,
    feasible_orders: FxHashSet<usize>,
    unmovable: usize,
}

impl Route {
    pub fn new(problem: &PickDeliver, vehicle_idx: usize) -> Self {
        let vehicle = &problem.vehicles()[vehicle_idx];
        let mut route = Route {
            vehicle_idx,
            stops: vec![
                RouteStop::unevaluated(*vehicle.start()),
                RouteStop::unevaluated(*vehicle.end()),
            ],
            orders_in_route: FxHashSet::default(),
            feasible_orders: FxHashSet::default(),
            unmovable: 1,
        };

        let start = &mut route.stops[0];
        start.arrival = start.node.window().open();
        start.departure = start.arrival + start.node.service();
        route.evaluate(problem, 1);

        for order in problem.orders().iter() {
            if vehicle.can_serve(order, problem.matrix()) {
                route.feasible_orders.insert(order.idx());
            }
        }
        route
    }

    pub fn vehicle_idx(&self) -> usize {
        self.vehicle_idx
    }

    pub fn stops(&self) -> &[RouteStop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// True when the route serves no order.
    pub fn is_unused(&self) -> bool {
        self.orders_in_route.is_empty()
    }

    pub fn orders_in_route(&self) -> &FxHashSet<usize> {
        &self.orders_in_route
    }

    pub fn has_order(&self, order_idx: usize) -> bool {
        self.orders_in_route.contains(&order_idx)
    }

    /// Orders this vehicle could possibly still serve (capacity and
    /// depot-window prefilter, not a full feasibility proof).
    pub fn feasible_orders(&self) -> &FxHashSet<usize> {
        &self.feasible_orders
    }

    /// First position at which stops may be inserted or removed.
    pub fn first_movable(&self) -> usize {
        self.unmovable
    }

    /// Position of the order's pickup or delivery stop.
    pub fn position_of(&self, order_idx: usize, kind: StopKind) -> Option<usize> {
        self.stops
            .iter()
            .position(|s| s.node.order() == Some(order_idx) && s.node.kind() == kind)
    }

    /// Whether the optimizer may move this order: its pickup must not be in
    /// the frozen prefix.
    pub fn is_movable(&self, order_idx: usize) -> bool {
        self.position_of(order_idx, StopKind::Pickup)
            .is_none_or(|pos| pos >= self.unmovable)
    }

    /// Recomputes schedule, loads, and violation counters from `from`
    /// onward. Position 0 (the start depot) is fixed at construction.
    fn evaluate(&mut self, problem: &PickDeliver, from: usize) {
        let vehicle = &problem.vehicles()[self.vehicle_idx];
        let capacity = vehicle.capacity();
        let speed = vehicle.speed();

        for i in from.max(1)..self.stops.len() {
            let prev = self.stops[i - 1];
            let node = self.stops[i].node;
            let travel = problem.matrix().travel_duration(
                prev.node.location(),
                node.location(),
                prev.departure,
                speed,
            );
            let arrival = prev.departure + travel;
            let wait = node.window().wait_until_open(arrival);
            let departure = arrival + wait + node.service();
            let load = prev.load + node.demand();
            self.stops[i] = RouteStop {
                node,
                travel,
                arrival,
                wait,
                departure,
                load,
                twv: prev.twv + u32::from(node.window().closes_before(arrival)),
                cv: prev.cv + u32::from(load > capacity || load < 0),
            };
        }
    }

    /// Inserts the order's pickup before the stop currently at `pick_pos`
    /// and its delivery so it lands at `del_pos` in the grown route
    /// (`pick_pos < del_pos`). Unconditional: violations are counted, not
    /// rejected.
    pub fn insert_order(
        &mut self,
        problem: &PickDeliver,
        order_idx: usize,
        pick_pos: usize,
        del_pos: usize,
    ) {
        debug_assert!(pick_pos >= self.unmovable);
        debug_assert!(pick_pos < del_pos);
        debug_assert!(del_pos <= self.stops.len());
        debug_assert!(!self.has_order(order_idx));

        let order = problem.orders().get(order_idx);
        self.stops
            .insert(pick_pos, RouteStop::unevaluated(*order.pickup()));
        self.stops
            .insert(del_pos, RouteStop::unevaluated(*order.delivery()));
        self.orders_in_route.insert(order_idx);
        self.evaluate(problem, pick_pos);
    }

    /// Appends the order's pickup+delivery pair just before the end depot.
    pub fn push_back(&mut self, problem: &PickDeliver, order_idx: usize) {
        let last = self.stops.len() - 1;
        self.insert_order(problem, order_idx, last, last + 1);
    }

    /// Puts the order's pickup+delivery pair at the front of the movable
    /// part of the route.
    pub fn push_front(&mut self, problem: &PickDeliver, order_idx: usize) {
        let front = self.unmovable;
        self.insert_order(problem, order_idx, front, front + 1);
    }

    /// Appends a single pickup or delivery stop just before the end depot,
    /// unconditionally. Only the replanning rebuild uses this: it replays a
    /// user-supplied interleaved stop sequence, so an order's pickup may sit
    /// in the route before its delivery has been appended.
    pub(crate) fn append_stop(&mut self, problem: &PickDeliver, order_idx: usize, kind: StopKind) {
        let order = problem.orders().get(order_idx);
        let node = match kind {
            StopKind::Pickup => order.pickup(),
            StopKind::Delivery => order.delivery(),
            StopKind::Start | StopKind::End => unreachable!("depots are fixed endpoints"),
        };
        let pos = self.stops.len() - 1;
        self.stops.insert(pos, RouteStop::unevaluated(*node));
        self.orders_in_route.insert(order_idx);
        self.evaluate(problem, pos);
    }

    /// Removes both stops of the order and re-evaluates from the earliest
    /// removed position.
    pub fn erase_order(&mut self, problem: &PickDeliver, order_idx: usize) {
        let Some(pick_pos) = self.position_of(order_idx, StopKind::Pickup) else {
            return;
        };
        let del_pos = self
            .position_of(order_idx, StopKind::Delivery)
            .unwrap_or(pick_pos);
        debug_assert!(pick_pos < del_pos);
        debug_assert!(pick_pos >= self.unmovable);

        self.stops.remove(del_pos);
        self.stops.remove(pick_pos);
        self.orders_in_route.remove(&order_idx);
        self.evaluate(problem, pick_pos);
    }

    /// Removes and returns the last order of the route.
    pub fn pop_back(&mut self, problem: &PickDeliver) -> Option<usize> {
        let last = self.stops[self.stops.len() - 2];
        let order_idx = last.node.order()?;
        self.erase_order(problem, order_idx);
        Some(order_idx)
    }

    /// Removes and returns the first movable order of the route.
    pub fn pop_front(&mut self, problem: &PickDeliver) -> Option<usize> {
        let first = self.stops.get(self.unmovable)?;
        let order_idx = first.node.order()?;
        self.erase_order(problem, order_idx);
        Some(order_idx)
    }

    /// Tries the order at every movable pickup/delivery position pair and
    /// commits the feasible insertion with the lowest cost increase. Returns
    /// false when no feasible pair exists.
    pub fn hill_climb(&mut self, problem: &PickDeliver, order_idx: usize) -> bool {
        if self.has_order(order_idx) {
            return false;
        }

        let base = self.objective();
        let len = self.stops.len();
        let mut best: Option<(Cost, usize, usize)> = None;

        for pick_pos in self.unmovable..len {
            for del_pos in (pick_pos + 1)..=len {
                self.insert_order(problem, order_idx, pick_pos, del_pos);
                if self.is_feasible() {
                    let delta = self.objective() - base;
                    if best.is_none_or(|(cost, _, _)| delta < cost) {
                        best = Some((delta, pick_pos, del_pos));
                    }
                }
                self.erase_order(problem, order_idx);
            }
        }

        match best {
            Some((_, pick_pos, del_pos)) => {
                self.insert_order(problem, order_idx, pick_pos, del_pos);
                true
            }
            None => false,
        }
    }

    /// Restricted insertion: the pickup is tried from the route tail toward
    /// the front with the delivery immediately after it, committing the
    /// first feasible pair. Cheaper than `hill_climb`, coarser results.
    pub fn semi_lifo(&mut self, problem: &PickDeliver, order_idx: usize) -> bool {
        if self.has_order(order_idx) {
            return false;
        }

        for pick_pos in (self.unmovable..self.stops.len()).rev() {
            self.insert_order(problem, order_idx, pick_pos, pick_pos + 1);
            if self.is_feasible() {
                return true;
            }
            self.erase_order(problem, order_idx);
        }
        false
    }

    /// Freezes the prefix of stops whose service starts before
    /// `execution_date`; the optimizer's operators will not touch them.
    pub fn set_unmovable(&mut self, execution_date: Time) {
        let mut fixed = 1;
        while fixed < self.stops.len() - 1 && self.stops[fixed].service_start() < execution_date {
            fixed += 1;
        }
        self.unmovable = fixed;
    }

    pub fn twv(&self) -> u32 {
        self.stops.last().map_or(0, |s| s.twv)
    }

    pub fn cv(&self) -> u32 {
        self.stops.last().map_or(0, |s| s.cv)
    }

    pub fn violations(&self) -> u32 {
        self.twv() + self.cv()
    }

    pub fn is_feasible(&self) -> bool {
        self.violations() == 0
    }

    pub fn total_travel_time(&self) -> Time {
        self.stops.iter().map(|s| s.travel).sum()
    }

    pub fn total_wait_time(&self) -> Time {
        self.stops.iter().map(|s| s.wait).sum()
    }

    pub fn total_service_time(&self) -> Time {
        self.stops.iter().map(|s| s.node.service()).sum()
    }

    /// Departure-to-arrival span of the whole route.
    pub fn duration(&self) -> Time {
        let first = self.stops.first().map_or(0.0, |s| s.departure);
        let last = self.stops.last().map_or(0.0, |s| s.arrival);
        last - first
    }

    /// Scalar route cost: travel time, plus a penalty per counted violation
    /// in the relaxed model.
    pub fn objective(&self) -> Cost {
        self.total_travel_time() + VIOLATION_PENALTY * Cost::from(self.violations())
    }

    /// Structural post-condition: depots bracket the route, every pickup
    /// precedes its delivery, and the schedule is monotone. Used by
    /// assertions and tests, not on the hot path.
    pub fn invariant(&self) -> bool {
        let Some((first, rest)) = self.stops.split_first() else {
            return false;
        };
        let Some((last, middle)) = rest.split_last() else {
            return false;
        };
        if first.node.kind() != StopKind::Start || last.node.kind() != StopKind::End {
            return false;
        }
        if middle
            .iter()
            .any(|s| !matches!(s.node.kind(), StopKind::Pickup | StopKind::Delivery))
        {
            return false;
        }

        for &order_idx in &self.orders_in_route {
            let pick = self.position_of(order_idx, StopKind::Pickup);
            let del = self.position_of(order_idx, StopKind::Delivery);
            match (pick, del) {
                (Some(p), Some(d)) if p < d => {}
                _ => return false,
            }
        }

        self.stops
            .windows(2)
            .all(|w| w[1].arrival >= w[0].departure && w[1].arrival == w[0].departure + w[1].travel)
    }
}
