use fxhash::FxHashMap;
use tracing::debug;

use crate::error::ProblemError;
use crate::messages::MessageLog;
use crate::problem::solution::Solution;
use crate::problem::stop_node::StopKind;
use crate::problem::PickDeliver;
use crate::{Id, Time};

use super::simple::insert_cheapest;

/// Builds the initial solution for replanning: replays each vehicle's
/// user-supplied stop sequence, freezes every stop that starts before
/// `execution_date`, and, when `with_assignment` is set, greedily inserts
/// the remaining orders. With `with_assignment` off the given plan is only
/// evaluated, violations counted, and returned untouched (the raw model).
pub fn build(
    problem: &PickDeliver,
    execution_date: Time,
    with_assignment: bool,
    log: &mut MessageLog,
) -> Result<Solution, ProblemError> {
    let mut routes = problem.empty_routes();
    let mut assigned: FxHashMap<usize, Id> = FxHashMap::default();

    for route in routes.iter_mut() {
        let vehicle = &problem.vehicles()[route.vehicle_idx()];
        let mut seen: FxHashMap<usize, u32> = FxHashMap::default();

        for &order_id in vehicle.initial_stops() {
            let order_idx = problem
                .order_idx(order_id)
                .ok_or(ProblemError::UnknownStopOrder {
                    vehicle_id: vehicle.id(),
                    order_id,
                })?;
            if let Some(&other_vehicle) = assigned.get(&order_idx) {
                if other_vehicle != vehicle.id() {
                    return Err(ProblemError::MalformedStopSequence {
                        vehicle_id: vehicle.id(),
                        order_id,
                    });
                }
            }
            assigned.insert(order_idx, vehicle.id());

            let times_seen = seen.entry(order_idx).or_insert(0);
            *times_seen += 1;
            match *times_seen {
                1 => route.append_stop(problem, order_idx, StopKind::Pickup),
                2 => route.append_stop(problem, order_idx, StopKind::Delivery),
                _ => {
                    return Err(ProblemError::MalformedStopSequence {
                        vehicle_id: vehicle.id(),
                        order_id,
                    });
                }
            }
        }

        if let Some((&order_idx, _)) = seen.iter().find(|&(_, &count)| count != 2) {
            return Err(ProblemError::MalformedStopSequence {
                vehicle_id: vehicle.id(),
                order_id: problem.orders().get(order_idx).id(),
            });
        }

        route.set_unmovable(execution_date);
        if !route.is_feasible() {
            debug!(
                vehicle = vehicle.id(),
                twv = route.twv(),
                cv = route.cv(),
                "rebuilt route carries violations"
            );
        }
    }

    if with_assignment {
        let mut order_idxs: Vec<usize> = (0..problem.orders().len())
            .filter(|idx| !assigned.contains_key(idx))
            .collect();
        order_idxs.sort_by(|&a, &b| {
            let oa = problem.orders().get(a).pickup().window().open();
            let ob = problem.orders().get(b).pickup().window().open();
            oa.total_cmp(&ob).then(a.cmp(&b))
        });

        for order_idx in order_idxs {
            if !insert_cheapest(problem, &mut routes, order_idx) {
                log.log(format!(
                    "Order {} left unassigned: no vehicle can serve it",
                    problem.orders().get(order_idx).id()
                ));
            }
        }
    }

    Ok(Solution::new(problem, routes))
}
