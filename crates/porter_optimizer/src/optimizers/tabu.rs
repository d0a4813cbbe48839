use fxhash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::cancellation::CancellationToken;
use crate::messages::MessageLog;
use crate::problem::route::Route;
use crate::problem::solution::Solution;
use crate::problem::PickDeliver;
use crate::Cost;

/// A neighborhood move. Route indices identify the touched vehicles; swap
/// keys are normalized (`a < b`) so a swap is its own inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Relocate {
        order: usize,
        from: usize,
        to: usize,
    },
    Swap {
        a: usize,
        b: usize,
    },
}

impl Move {
    pub fn swap(order_a: usize, order_b: usize) -> Self {
        Move::Swap {
            a: order_a.min(order_b),
            b: order_a.max(order_b),
        }
    }

    /// The move that would undo this one.
    pub fn inverse(self) -> Move {
        match self {
            Move::Relocate { order, from, to } => Move::Relocate {
                order,
                from: to,
                to: from,
            },
            Move::Swap { .. } => self,
        }
    }

    /// How many routes the move rewrites; the stability tie-break prefers
    /// fewer.
    pub fn routes_touched(self) -> usize {
        match self {
            Move::Relocate { from, to, .. } if from == to => 1,
            Move::Relocate { .. } => 2,
            Move::Swap { .. } => 2,
        }
    }
}

/// Recently undone moves, each with an iteration at which its ban expires.
#[derive(Debug, Default)]
pub struct TabuList {
    expiry: FxHashMap<Move, usize>,
}

impl TabuList {
    pub fn is_tabu(&self, mv: Move, iteration: usize) -> bool {
        self.expiry.get(&mv).is_some_and(|&until| iteration < until)
    }

    pub fn ban(&mut self, mv: Move, until: usize) {
        self.expiry.insert(mv, until);
    }

    pub fn purge(&mut self, iteration: usize) {
        self.expiry.retain(|_, &mut until| iteration < until);
    }

    pub fn len(&self) -> usize {
        self.expiry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiry.is_empty()
    }
}

struct Candidate {
    mv: Move,
    replaced: SmallVec<[(usize, Route); 2]>,
    delta_cost: Cost,
    delta_violations: i64,
    ordinal: usize,
}

impl Candidate {
    /// Selection key: violations first, then cost, then the stability
    /// tie-break, then generation order so ties stay deterministic.
    fn key(&self) -> (i64, Cost, usize, usize) {
        (
            self.delta_violations,
            self.delta_cost,
            self.mv.routes_touched(),
            self.ordinal,
        )
    }

    fn beats(&self, other: &Candidate) -> bool {
        let (av, ac, at, ao) = self.key();
        let (bv, bc, bt, bo) = other.key();
        av.cmp(&bv)
            .then(ac.total_cmp(&bc))
            .then(at.cmp(&bt))
            .then(ao.cmp(&bo))
            .is_lt()
    }
}

/// Tabu search over relocate/swap neighborhoods.
///
/// Per cycle: reinsert unassigned orders, generate the compatibility-pruned
/// candidate set, pick the best candidate that is either not tabu or beats
/// the best-found solution (aspiration), apply it, and ban its inverse for
/// `tenure` iterations. Runs until `max_cycles`, until every order is served
/// (when `stop_on_all_served` is set), until the neighborhood dries up, or
/// until cancellation. With `optimize` off the initial solution is returned
/// as evaluated, which is the raw model.
pub fn optimize(
    problem: &PickDeliver,
    initial: Solution,
    max_cycles: usize,
    stop_on_all_served: bool,
    optimize: bool,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Solution {
    if !optimize {
        return initial;
    }

    let tenure = (problem.orders().len() / 4).max(5);
    let mut tabu = TabuList::default();
    let mut routes = initial.routes().to_vec();
    let mut current = initial.clone();
    let mut best = initial;

    for iteration in 0..max_cycles {
        if cancel.is_cancelled() {
            log.log("Optimization cancelled; returning best solution so far");
            break;
        }
        if stop_on_all_served && current.all_served() {
            info!(iteration, "all orders served, stopping early");
            break;
        }

        let inserted = reinsert_unassigned(problem, &mut routes, &current);
        if inserted {
            current = Solution::new(problem, routes.clone());
            if current.is_better_than(&best) {
                best = current.clone();
            }
        }

        let candidates = generate_candidates(problem, &routes);
        let chosen = candidates
            .iter()
            .filter(|c| !tabu.is_tabu(c.mv, iteration) || aspires(c, &current, &best))
            .fold(None::<&Candidate>, |best_so_far, c| match best_so_far {
                Some(b) if !c.beats(b) => Some(b),
                _ => Some(c),
            });

        let Some(chosen) = chosen else {
            if !inserted {
                debug!(iteration, "neighborhood exhausted");
                break;
            }
            continue;
        };

        for (route_idx, route) in &chosen.replaced {
            routes[*route_idx] = route.clone();
        }
        tabu.ban(chosen.mv.inverse(), iteration + 1 + tenure);
        tabu.purge(iteration);

        current = Solution::new(problem, routes.clone());
        debug!(
            iteration,
            mv = ?chosen.mv,
            delta = chosen.delta_cost,
            cost = current.cost(),
            "move applied"
        );
        if current.is_better_than(&best) {
            best = current.clone();
        }
    }

    if !best.all_served() {
        log.log(format!(
            "{} orders remain unassigned after optimization",
            best.unassigned().len()
        ));
    }
    best
}

/// A tabu candidate is admissible anyway when the solution it produces beats
/// the best one found.
fn aspires(candidate: &Candidate, current: &Solution, best: &Solution) -> bool {
    let violations = i64::from(current.violations()) + candidate.delta_violations;
    let cost = current.cost() + candidate.delta_cost;

    let best_key = (
        i64::from(best.violations()),
        best.unassigned().len(),
        best.cost(),
    );
    let candidate_key = (violations, current.unassigned().len(), cost);

    candidate_key
        .0
        .cmp(&best_key.0)
        .then(candidate_key.1.cmp(&best_key.1))
        .then(candidate_key.2.total_cmp(&best_key.2))
        .is_lt()
}

fn reinsert_unassigned(problem: &PickDeliver, routes: &mut [Route], current: &Solution) -> bool {
    let mut inserted = false;
    for &order_idx in current.unassigned() {
        inserted |= crate::initialsol::simple::insert_cheapest(problem, routes, order_idx);
    }
    inserted
}

/// Relocate and swap candidates, pruned by the precomputed order
/// compatibility so obviously-infeasible pairs are never evaluated. Frozen
/// stops are never chosen as move endpoints.
fn generate_candidates(problem: &PickDeliver, routes: &[Route]) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for (from_idx, from_route) in routes.iter().enumerate() {
        let mut order_idxs: Vec<usize> = from_route.orders_in_route().iter().copied().collect();
        order_idxs.sort_unstable();

        for order_idx in order_idxs {
            if !from_route.is_movable(order_idx) {
                continue;
            }

            let mut stripped = from_route.clone();
            stripped.erase_order(problem, order_idx);

            for (to_idx, to_route) in routes.iter().enumerate() {
                if !relocation_is_plausible(problem, routes, from_idx, to_idx, order_idx) {
                    continue;
                }

                let mut target = if to_idx == from_idx {
                    stripped.clone()
                } else {
                    to_route.clone()
                };
                if !target.hill_climb(problem, order_idx) {
                    continue;
                }

                let (delta_cost, delta_violations, replaced) = if to_idx == from_idx {
                    (
                        target.total_travel_time() - from_route.total_travel_time(),
                        i64::from(target.violations()) - i64::from(from_route.violations()),
                        SmallVec::from_vec(vec![(from_idx, target)]),
                    )
                } else {
                    (
                        stripped.total_travel_time() + target.total_travel_time()
                            - from_route.total_travel_time()
                            - to_route.total_travel_time(),
                        i64::from(stripped.violations()) + i64::from(target.violations())
                            - i64::from(from_route.violations())
                            - i64::from(to_route.violations()),
                        SmallVec::from_vec(vec![(from_idx, stripped.clone()), (to_idx, target)]),
                    )
                };
                if delta_violations > 0 {
                    continue;
                }
                candidates.push(Candidate {
                    mv: Move::Relocate {
                        order: order_idx,
                        from: from_idx,
                        to: to_idx,
                    },
                    replaced,
                    delta_cost,
                    delta_violations,
                    ordinal: candidates.len(),
                });
            }
        }
    }

    for r1 in 0..routes.len() {
        for r2 in (r1 + 1)..routes.len() {
            let mut orders1: Vec<usize> = routes[r1].orders_in_route().iter().copied().collect();
            let mut orders2: Vec<usize> = routes[r2].orders_in_route().iter().copied().collect();
            orders1.sort_unstable();
            orders2.sort_unstable();

            for &o1 in &orders1 {
                if !routes[r1].is_movable(o1) {
                    continue;
                }
                for &o2 in &orders2 {
                    if !routes[r2].is_movable(o2)
                        || !problem.orders().are_compatible(o1, o2)
                        || !routes[r1].feasible_orders().contains(&o2)
                        || !routes[r2].feasible_orders().contains(&o1)
                    {
                        continue;
                    }

                    let mut a = routes[r1].clone();
                    let mut b = routes[r2].clone();
                    a.erase_order(problem, o1);
                    b.erase_order(problem, o2);
                    if !a.hill_climb(problem, o2) || !b.hill_climb(problem, o1) {
                        continue;
                    }

                    let delta_cost = a.total_travel_time() + b.total_travel_time()
                        - routes[r1].total_travel_time()
                        - routes[r2].total_travel_time();
                    let delta_violations = i64::from(a.violations()) + i64::from(b.violations())
                        - i64::from(routes[r1].violations())
                        - i64::from(routes[r2].violations());
                    if delta_violations > 0 {
                        continue;
                    }
                    candidates.push(Candidate {
                        mv: Move::swap(o1, o2),
                        replaced: SmallVec::from_vec(vec![(r1, a), (r2, b)]),
                        delta_cost,
                        delta_violations,
                        ordinal: candidates.len(),
                    });
                }
            }
        }
    }

    candidates
}

/// Cheap necessary conditions before cloning routes for a relocation.
fn relocation_is_plausible(
    problem: &PickDeliver,
    routes: &[Route],
    from_idx: usize,
    to_idx: usize,
    order_idx: usize,
) -> bool {
    let target = &routes[to_idx];
    if to_idx != from_idx {
        if !target.feasible_orders().contains(&order_idx) {
            return false;
        }
        // A non-empty target must hold at least one order that can coexist
        // with the incoming one.
        if !target.is_unused()
            && !target
                .orders_in_route()
                .iter()
                .any(|&other| problem.orders().are_compatible(order_idx, other))
        {
            return false;
        }
    }
    true
}
