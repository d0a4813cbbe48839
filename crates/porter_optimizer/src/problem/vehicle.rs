use serde::Serialize;

use crate::{Amount, Id, Speed};
use porter_matrix::CostMatrix;

use super::order::Order;
use super::stop_node::StopNode;

/// A vehicle description: capacity, speed, and the start/end depot stops
/// that bracket its route. `initial_stops` carries a user-supplied order-id
/// sequence (pickup on the first occurrence of an id, delivery on the
/// second) for replanning a partially-executed route.
#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    idx: usize,
    id: Id,
    capacity: Amount,
    speed: Speed,
    start: StopNode,
    end: StopNode,
    initial_stops: Vec<Id>,
}

impl Vehicle {
    pub fn new(
        idx: usize,
        id: Id,
        capacity: Amount,
        speed: Speed,
        start: StopNode,
        end: StopNode,
        initial_stops: Vec<Id>,
    ) -> Self {
        Vehicle {
            idx,
            id,
            capacity,
            speed,
            start,
            end,
            initial_stops,
        }
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn capacity(&self) -> Amount {
        self.capacity
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn start(&self) -> &StopNode {
        &self.start
    }

    pub fn end(&self) -> &StopNode {
        &self.end
    }

    pub fn initial_stops(&self) -> &[Id] {
        &self.initial_stops
    }

    pub fn can_carry(&self, order: &Order) -> bool {
        order.demand() <= self.capacity
    }

    /// Necessary condition for this vehicle to serve the order alone:
    /// capacity fits, and the best-case chain
    /// start → pickup → delivery → end stays inside every window.
    pub fn can_serve(&self, order: &Order, matrix: &CostMatrix) -> bool {
        if !self.can_carry(order) {
            return false;
        }

        let to_pick =
            matrix.cost(self.start.location(), order.pickup().location()) / self.speed;
        let to_del =
            matrix.cost(order.pickup().location(), order.delivery().location()) / self.speed;
        let to_end = matrix.cost(order.delivery().location(), self.end.location()) / self.speed;
        if !(to_pick.is_finite() && to_del.is_finite() && to_end.is_finite()) {
            return false;
        }

        let leave_depot = self.start.window().open() + self.start.service();
        let at_pick = (leave_depot + to_pick).max(order.pickup().window().open());
        if order.pickup().window().closes_before(at_pick) {
            return false;
        }

        let at_del = (at_pick + order.pickup().service() + to_del)
            .max(order.delivery().window().open());
        if order.delivery().window().closes_before(at_del) {
            return false;
        }

        let at_end = at_del + order.delivery().service() + to_end;
        !self.end.window().closes_before(at_end)
    }
}
