use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::messages::MessageLog;
use crate::problem::route::Route;
use crate::problem::solution::Solution;
use crate::problem::PickDeliver;
use crate::Cost;

/// Which constructive heuristic seeds the search. `TryAll` runs every named
/// heuristic and keeps the best result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialsCode {
    TryAll,
    OnePerTruck,
    FrontTruck,
    BackTruck,
    BestInsert,
    SemiLifo,
    CompatChain,
}

impl InitialsCode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(InitialsCode::TryAll),
            1 => Some(InitialsCode::OnePerTruck),
            2 => Some(InitialsCode::FrontTruck),
            3 => Some(InitialsCode::BackTruck),
            4 => Some(InitialsCode::BestInsert),
            5 => Some(InitialsCode::SemiLifo),
            6 => Some(InitialsCode::CompatChain),
            _ => None,
        }
    }

    fn named() -> [InitialsCode; 6] {
        [
            InitialsCode::OnePerTruck,
            InitialsCode::FrontTruck,
            InitialsCode::BackTruck,
            InitialsCode::BestInsert,
            InitialsCode::SemiLifo,
            InitialsCode::CompatChain,
        ]
    }
}

/// Builds an initial solution with the chosen heuristic. Orders that fit
/// nowhere stay unassigned and are reported on the log, not as an error.
pub fn build(problem: &PickDeliver, code: InitialsCode, log: &mut MessageLog) -> Solution {
    let solution = match code {
        InitialsCode::TryAll => {
            let mut best: Option<Solution> = None;
            for candidate_code in InitialsCode::named() {
                let candidate = build_one(problem, candidate_code);
                debug!(
                    ?candidate_code,
                    cost = candidate.cost(),
                    unassigned = candidate.unassigned().len(),
                    "initial solution candidate"
                );
                if best.as_ref().is_none_or(|b| candidate.is_better_than(b)) {
                    best = Some(candidate);
                }
            }
            best.unwrap_or_else(|| Solution::new(problem, problem.empty_routes()))
        }
        named => build_one(problem, named),
    };

    for &order_idx in solution.unassigned() {
        log.log(format!(
            "Order {} left unassigned: no vehicle can serve it",
            problem.orders().get(order_idx).id()
        ));
    }
    solution
}

fn build_one(problem: &PickDeliver, code: InitialsCode) -> Solution {
    let mut routes = problem.empty_routes();
    match code {
        InitialsCode::OnePerTruck => one_per_truck(problem, &mut routes),
        InitialsCode::FrontTruck => push_ends(problem, &mut routes, true),
        InitialsCode::BackTruck => push_ends(problem, &mut routes, false),
        InitialsCode::BestInsert => best_insert(problem, &mut routes),
        InitialsCode::SemiLifo => semi_lifo(problem, &mut routes),
        InitialsCode::CompatChain => compat_chain(problem, &mut routes),
        InitialsCode::TryAll => unreachable!("TryAll dispatches named heuristics"),
    }
    Solution::new(problem, routes)
}

/// Every order rides alone in the first empty truck that can take it.
fn one_per_truck(problem: &PickDeliver, routes: &mut [Route]) {
    for order in problem.orders().iter() {
        for route in routes.iter_mut() {
            if !route.is_unused() || !route.feasible_orders().contains(&order.idx()) {
                continue;
            }
            route.push_back(problem, order.idx());
            if route.is_feasible() {
                break;
            }
            route.erase_order(problem, order.idx());
        }
    }
}

/// Pushes orders onto the first truck that stays feasible. Front insertion
/// takes the orders latest-opening first so the finished route still runs in
/// chronological order; back insertion takes them earliest first.
fn push_ends(problem: &PickDeliver, routes: &mut [Route], front: bool) {
    let mut order_idxs: Vec<usize> = (0..problem.orders().len()).collect();
    order_idxs.sort_by(|&a, &b| {
        let oa = problem.orders().get(a).pickup().window().open();
        let ob = problem.orders().get(b).pickup().window().open();
        if front {
            ob.total_cmp(&oa).then(b.cmp(&a))
        } else {
            oa.total_cmp(&ob).then(a.cmp(&b))
        }
    });

    for order_idx in order_idxs {
        for route in routes.iter_mut() {
            if !route.feasible_orders().contains(&order_idx) {
                continue;
            }
            if front {
                route.push_front(problem, order_idx);
            } else {
                route.push_back(problem, order_idx);
            }
            if route.is_feasible() {
                break;
            }
            route.erase_order(problem, order_idx);
        }
    }
}

/// Tightest-window orders first, each into the route where the cheapest
/// feasible insertion costs least.
fn best_insert(problem: &PickDeliver, routes: &mut [Route]) {
    let mut order_idxs: Vec<usize> = (0..problem.orders().len()).collect();
    order_idxs.sort_by(|&a, &b| {
        let oa = problem.orders().get(a);
        let ob = problem.orders().get(b);
        let wa = oa.pickup().window().width() + oa.delivery().window().width();
        let wb = ob.pickup().window().width() + ob.delivery().window().width();
        wa.total_cmp(&wb).then(a.cmp(&b))
    });

    for order_idx in order_idxs {
        insert_cheapest(problem, routes, order_idx);
    }
}

/// Heaviest orders first, inserted near the route tail so deliveries stay
/// close to their pickups.
fn semi_lifo(problem: &PickDeliver, routes: &mut [Route]) {
    let mut order_idxs: Vec<usize> = (0..problem.orders().len()).collect();
    order_idxs.sort_by_key(|&idx| {
        (
            std::cmp::Reverse(problem.orders().get(idx).demand()),
            idx,
        )
    });

    for order_idx in order_idxs {
        for route in routes.iter_mut() {
            if route.feasible_orders().contains(&order_idx)
                && route.semi_lifo(problem, order_idx)
            {
                break;
            }
        }
    }
}

/// Chains compatible orders: seed each truck with the most flexible
/// remaining order, then keep appending its cheapest compatible successor.
fn compat_chain(problem: &PickDeliver, routes: &mut [Route]) {
    let mut remaining: FxHashSet<usize> = (0..problem.orders().len()).collect();

    for route in routes.iter_mut() {
        let Some(seed) = problem.orders().find_most_flexible(&remaining) else {
            break;
        };
        if !route.feasible_orders().contains(&seed) || !route.hill_climb(problem, seed) {
            continue;
        }
        remaining.remove(&seed);

        let mut last = seed;
        while let Some(next) =
            problem
                .orders()
                .find_best_successor(last, &remaining, problem.matrix())
        {
            if !route.feasible_orders().contains(&next) || !route.hill_climb(problem, next) {
                break;
            }
            remaining.remove(&next);
            last = next;
        }
    }

    // Whatever the chains missed still gets a chance at a cheapest insertion.
    let mut leftovers: Vec<usize> = remaining.into_iter().collect();
    leftovers.sort_unstable();
    for order_idx in leftovers {
        insert_cheapest(problem, routes, order_idx);
    }
}

/// Commits `order_idx` to the route where the cheapest feasible insertion
/// increases the objective least. Returns false when no route can take it.
pub(crate) fn insert_cheapest(
    problem: &PickDeliver,
    routes: &mut [Route],
    order_idx: usize,
) -> bool {
    if routes.iter().any(|r| r.has_order(order_idx)) {
        return false;
    }

    let mut best: Option<(Cost, usize, Route)> = None;
    for (route_idx, route) in routes.iter().enumerate() {
        if !route.feasible_orders().contains(&order_idx) {
            continue;
        }
        let mut candidate = route.clone();
        let before = candidate.objective();
        if candidate.hill_climb(problem, order_idx) {
            let delta = candidate.objective() - before;
            if best.as_ref().is_none_or(|(cost, _, _)| delta < *cost) {
                best = Some((delta, route_idx, candidate));
            }
        }
    }

    match best {
        Some((_, route_idx, candidate)) => {
            routes[route_idx] = candidate;
            true
        }
        None => false,
    }
}
