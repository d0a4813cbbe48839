use serde::Serialize;

use crate::{Amount, Id, Speed};
use porter_matrix::CostMatrix;

use super::stop_node::StopNode;

/// A transportation order: a pickup stop and a delivery stop that must be
/// served by the same vehicle, pickup first. Immutable after problem
/// construction; assignment state lives on the route.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    idx: usize,
    id: Id,
    demand: Amount,
    pickup: StopNode,
    delivery: StopNode,
}

impl Order {
    pub fn new(idx: usize, id: Id, demand: Amount, pickup: StopNode, delivery: StopNode) -> Self {
        Order {
            idx,
            id,
            demand,
            pickup,
            delivery,
        }
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn demand(&self) -> Amount {
        self.demand
    }

    pub fn pickup(&self) -> &StopNode {
        &self.pickup
    }

    pub fn delivery(&self) -> &StopNode {
        &self.delivery
    }

    /// An order is serviceable at all only when leaving the pickup at its
    /// latest start still reaches the delivery before its window closes.
    pub fn is_valid(&self, matrix: &CostMatrix, speed: Speed) -> bool {
        let travel = matrix.cost(self.pickup.location(), self.delivery.location()) / speed;
        travel.is_finite()
            && self.pickup.window().close() + self.pickup.service() + travel
                <= self.delivery.window().close()
    }

    /// Necessary condition for `other` to be serviceable after this order
    /// completes: leaving this delivery at its earliest possible finish must
    /// reach the other pickup before it closes.
    pub fn can_precede(&self, other: &Order, matrix: &CostMatrix, speed: Speed) -> bool {
        let travel = matrix.cost(self.delivery.location(), other.pickup.location()) / speed;
        travel.is_finite()
            && self.delivery.window().open() + self.delivery.service() + travel
                <= other.pickup.window().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::stop_node::StopKind;
    use crate::problem::time_window::TimeWindow;
    use porter_matrix::MatrixCell;

    fn matrix() -> CostMatrix {
        let rows = vec![
            MatrixCell {
                from_id: 1,
                to_id: 2,
                cost: 10.0,
            },
            MatrixCell {
                from_id: 2,
                to_id: 1,
                cost: 10.0,
            },
        ];
        CostMatrix::new(&rows, &[1, 2], 1.0).unwrap()
    }

    fn stop(location: usize, node_id: Id, kind: StopKind, open: f64, close: f64) -> StopNode {
        StopNode::new(
            location,
            node_id,
            kind,
            TimeWindow::new(open, close).unwrap(),
            1.0,
            0,
            Some(0),
        )
    }

    #[test]
    fn order_validity_depends_on_reachability_in_time() {
        let m = matrix();
        let good = Order::new(
            0,
            7,
            3,
            stop(0, 1, StopKind::Pickup, 0.0, 10.0),
            stop(1, 2, StopKind::Delivery, 0.0, 30.0),
        );
        assert!(good.is_valid(&m, 1.0));

        let late = Order::new(
            0,
            7,
            3,
            stop(0, 1, StopKind::Pickup, 0.0, 10.0),
            stop(1, 2, StopKind::Delivery, 0.0, 15.0),
        );
        assert!(!late.is_valid(&m, 1.0));
        // A faster vehicle can still make it.
        assert!(late.is_valid(&m, 4.0));
    }
}
