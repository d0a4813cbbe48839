use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::initialsol::simple::insert_cheapest;
use crate::messages::MessageLog;
use crate::problem::route::Route;
use crate::problem::solution::Solution;
use crate::problem::PickDeliver;

const EPS: f64 = 1e-9;

/// First-improvement local-search descent: per cycle, reinsert unassigned
/// orders, then relocate and swap while any move lowers the objective. Stops
/// after `max_cycles`, on a cycle with no improvement, or on cancellation.
pub fn optimize(
    problem: &PickDeliver,
    initial: Solution,
    max_cycles: usize,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Solution {
    let mut routes = initial.routes().to_vec();
    let mut best = initial;

    for cycle in 0..max_cycles {
        if cancel.is_cancelled() {
            log.log("Optimization cancelled; returning best solution so far");
            break;
        }

        let mut improved = false;
        for order_idx in best.unassigned().to_vec() {
            improved |= insert_cheapest(problem, &mut routes, order_idx);
        }
        improved |= relocate_pass(problem, &mut routes);
        improved |= swap_pass(problem, &mut routes);

        let current = Solution::new(problem, routes.clone());
        if current.is_better_than(&best) {
            best = current;
        }
        if !improved {
            debug!(cycle, "local search reached a fixed point");
            break;
        }
    }
    best
}

/// Moves one order to the cheapest feasible position anywhere in the fleet,
/// committing the first improving move found.
fn relocate_pass(problem: &PickDeliver, routes: &mut [Route]) -> bool {
    let mut improved = false;
    for from_idx in 0..routes.len() {
        let mut order_idxs: Vec<usize> =
            routes[from_idx].orders_in_route().iter().copied().collect();
        order_idxs.sort_unstable();

        for order_idx in order_idxs {
            if !routes[from_idx].has_order(order_idx) || !routes[from_idx].is_movable(order_idx) {
                continue;
            }

            let base: f64 = routes.iter().map(Route::objective).sum();
            let mut best: Option<(f64, usize, Route, Route)> = None;

            let mut stripped = routes[from_idx].clone();
            stripped.erase_order(problem, order_idx);

            for (to_idx, route) in routes.iter().enumerate() {
                let mut target = if to_idx == from_idx {
                    stripped.clone()
                } else {
                    route.clone()
                };
                if !target.feasible_orders().contains(&order_idx)
                    || !target.hill_climb(problem, order_idx)
                {
                    continue;
                }

                let delta = if to_idx == from_idx {
                    target.objective() - routes[from_idx].objective()
                } else {
                    stripped.objective() + target.objective()
                        - routes[from_idx].objective()
                        - routes[to_idx].objective()
                };
                if delta < -EPS && best.as_ref().is_none_or(|(d, ..)| delta < *d) {
                    best = Some((delta, to_idx, stripped.clone(), target));
                }
            }

            if let Some((delta, to_idx, stripped, target)) = best {
                if to_idx == from_idx {
                    routes[from_idx] = target;
                } else {
                    routes[from_idx] = stripped;
                    routes[to_idx] = target;
                }
                debug_assert!(routes.iter().map(Route::objective).sum::<f64>() < base + EPS);
                debug!(order_idx, delta, "relocate applied");
                improved = true;
            }
        }
    }
    improved
}

/// Exchanges a pair of compatible orders between two routes when both fit
/// and the total objective drops.
fn swap_pass(problem: &PickDeliver, routes: &mut [Route]) -> bool {
    let mut improved = false;
    for r1 in 0..routes.len() {
        for r2 in (r1 + 1)..routes.len() {
            let mut orders1: Vec<usize> = routes[r1].orders_in_route().iter().copied().collect();
            let mut orders2: Vec<usize> = routes[r2].orders_in_route().iter().copied().collect();
            orders1.sort_unstable();
            orders2.sort_unstable();

            'pair: for &o1 in &orders1 {
                if !routes[r1].has_order(o1) || !routes[r1].is_movable(o1) {
                    continue;
                }
                for &o2 in &orders2 {
                    if !routes[r2].has_order(o2)
                        || !routes[r2].is_movable(o2)
                        || !problem.orders().are_compatible(o1, o2)
                    {
                        continue;
                    }

                    let mut a = routes[r1].clone();
                    let mut b = routes[r2].clone();
                    a.erase_order(problem, o1);
                    b.erase_order(problem, o2);
                    if !a.feasible_orders().contains(&o2)
                        || !b.feasible_orders().contains(&o1)
                        || !a.hill_climb(problem, o2)
                        || !b.hill_climb(problem, o1)
                    {
                        continue;
                    }

                    let delta = a.objective() + b.objective()
                        - routes[r1].objective()
                        - routes[r2].objective();
                    if delta < -EPS {
                        routes[r1] = a;
                        routes[r2] = b;
                        debug!(o1, o2, delta, "swap applied");
                        improved = true;
                        continue 'pair;
                    }
                }
            }
        }
    }
    improved
}
