use serde::{Deserialize, Serialize};

use crate::{Amount, Id, Time};

use super::time_window::TimeWindow;

/// What a stop is, with the wire code the host expects on result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopKind {
    Start,
    Pickup,
    Delivery,
    End,
}

impl StopKind {
    pub fn code(self) -> i32 {
        match self {
            StopKind::Start => 1,
            StopKind::Pickup => 2,
            StopKind::Delivery => 3,
            StopKind::End => 6,
        }
    }
}

/// A physical stop: location, service window, service duration, and the load
/// change it causes. One composed struct covers pickup, delivery, and depot
/// stops, with `kind` as the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopNode {
    location: usize,
    node_id: Id,
    kind: StopKind,
    window: TimeWindow,
    service: Time,
    demand: Amount,
    order: Option<usize>,
}

impl StopNode {
    pub fn new(
        location: usize,
        node_id: Id,
        kind: StopKind,
        window: TimeWindow,
        service: Time,
        demand: Amount,
        order: Option<usize>,
    ) -> Self {
        StopNode {
            location,
            node_id,
            kind,
            window,
            service,
            demand,
            order,
        }
    }

    /// Compact matrix index of the stop's location.
    pub fn location(&self) -> usize {
        self.location
    }

    pub fn node_id(&self) -> Id {
        self.node_id
    }

    pub fn kind(&self) -> StopKind {
        self.kind
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn service(&self) -> Time {
        self.service
    }

    /// Signed load delta: positive for pickups, negative for deliveries,
    /// zero for depots.
    pub fn demand(&self) -> Amount {
        self.demand
    }

    /// Index of the owning order; depots have none.
    pub fn order(&self) -> Option<usize> {
        self.order
    }
}
