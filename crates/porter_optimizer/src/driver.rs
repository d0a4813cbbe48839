use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cancellation::CancellationToken;
use crate::error::SolveError;
use crate::initialsol::{self, InitialsCode};
use crate::input::records::{
    multipliers_from_records, EuclideanOrderRecord, EuclideanVehicleRecord, MatrixRecord,
    MultiplierRecord, OrderRecord, VehicleRecord,
};
use crate::input::synthesize_nodes;
use crate::messages::MessageLog;
use crate::optimizers;
use crate::problem::{PickDeliver, Solution, StopRow, VehicleStops};
use crate::{Id, Time};
use porter_matrix::{CostMatrix, MatrixCell, MatrixError};

/// Control parameters for one optimization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveParams {
    /// Global multiplier applied to every matrix cell. Must be positive.
    pub factor: f64,
    /// Iteration budget for the optimizer.
    pub max_cycles: usize,
    /// When off, user-supplied stop sequences are only evaluated (the raw
    /// model: violations are counted, nothing is moved).
    pub optimize: bool,
    /// Stop as soon as every order is assigned.
    pub stop_on_all_served: bool,
    /// Stops starting before this instant are frozen for replanning.
    pub execution_date: i64,
    /// Initial-solution selector for the heuristic pipeline: 0 tries every
    /// named heuristic and keeps the best, 1..=6 pick one.
    pub initial_code: i32,
}

impl Default for SolveParams {
    fn default() -> Self {
        SolveParams {
            factor: 1.0,
            max_cycles: 100,
            optimize: true,
            stop_on_all_served: false,
            execution_date: 0,
            initial_code: 0,
        }
    }
}

impl SolveParams {
    pub fn validate(&self) -> Result<(), SolveError> {
        if self.factor <= 0.0 {
            return Err(MatrixError::NonPositiveFactor(self.factor).into());
        }
        if InitialsCode::from_code(self.initial_code).is_none() {
            return Err(SolveError::UnknownInitialsCode(self.initial_code));
        }
        Ok(())
    }
}

/// Recoverable nothing-to-do conditions, reported on the notice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    NoOrders,
    NoVehicles,
    NoMatrixRows,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoOrders => write!(f, "Insufficient data: no orders to route"),
            Notice::NoVehicles => write!(f, "Insufficient data: no vehicles available"),
            Notice::NoMatrixRows => write!(f, "Insufficient data: no matrix rows"),
        }
    }
}

/// Result of one call: rows, or a notice explaining why there are none.
#[derive(Debug, Clone)]
pub enum SolveOutcome<T = Vec<StopRow>> {
    Routed(T),
    Nothing(Notice),
}

/// For each order, the vehicles that could serve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleVehiclesRow {
    pub order_id: Id,
    pub vehicle_ids: Vec<Id>,
}

/// Solves a pickup-and-delivery problem over a supplied cost matrix with the
/// tabu pipeline: replay any user-supplied stop sequences, freeze the
/// executed prefix, insert the rest, and improve under the iteration budget.
pub fn solve_pick_deliver(
    orders: &[OrderRecord],
    vehicles: &[VehicleRecord],
    cells: &[MatrixRecord],
    multipliers: &[MultiplierRecord],
    params: &SolveParams,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Result<SolveOutcome, SolveError> {
    if orders.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoOrders));
    }
    if vehicles.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoVehicles));
    }
    if cells.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoMatrixRows));
    }
    params.validate()?;

    let matrix = build_matrix(orders, vehicles, cells, multipliers, params.factor, log)?;
    let problem = PickDeliver::new(orders, vehicles, matrix, log)?;
    let solution = run_tabu(&problem, params, cancel, log)?;
    Ok(SolveOutcome::Routed(solution.stop_rows(&problem)))
}

/// Euclidean-mode variant: node ids are synthesized from coordinates and the
/// matrix is derived from their distances, so no matrix rows are needed.
pub fn solve_euclidean(
    orders: &[EuclideanOrderRecord],
    vehicles: &[EuclideanVehicleRecord],
    multipliers: &[MultiplierRecord],
    params: &SolveParams,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Result<SolveOutcome, SolveError> {
    if orders.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoOrders));
    }
    if vehicles.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoVehicles));
    }
    params.validate()?;

    let synthesized = synthesize_nodes(orders, vehicles, params.factor)?;
    let matrix = synthesized
        .matrix
        .with_multipliers(multipliers_from_records(multipliers));
    let problem = PickDeliver::new(&synthesized.orders, &synthesized.vehicles, matrix, log)?;
    let solution = run_tabu(&problem, params, cancel, log)?;
    Ok(SolveOutcome::Routed(solution.stop_rows(&problem)))
}

/// Heuristic pipeline: a named constructive heuristic (or the best of all
/// six) followed by local-search descent. Strict model only.
pub fn solve_with_initials(
    orders: &[OrderRecord],
    vehicles: &[VehicleRecord],
    cells: &[MatrixRecord],
    multipliers: &[MultiplierRecord],
    params: &SolveParams,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Result<SolveOutcome, SolveError> {
    if orders.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoOrders));
    }
    if vehicles.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoVehicles));
    }
    if cells.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoMatrixRows));
    }
    params.validate()?;
    let code = InitialsCode::from_code(params.initial_code)
        .ok_or(SolveError::UnknownInitialsCode(params.initial_code))?;

    let matrix = build_matrix(orders, vehicles, cells, multipliers, params.factor, log)?;
    let problem = PickDeliver::new(orders, vehicles, matrix, log)?;

    let initial = initialsol::simple::build(&problem, code, log);
    info!(
        cost = initial.cost(),
        unassigned = initial.unassigned().len(),
        "initial solution built"
    );
    let solution =
        optimizers::simple::optimize(&problem, initial, params.max_cycles, cancel, log);
    verify_solution(&problem, &solution)?;
    Ok(SolveOutcome::Routed(solution.stop_rows(&problem)))
}

/// Replanning entry point: re-optimizes a partially-executed plan without
/// disturbing stops before the execution date, and returns each vehicle's
/// new order-id sequence instead of full result rows.
pub fn optimize_stops(
    orders: &[OrderRecord],
    vehicles: &[VehicleRecord],
    cells: &[MatrixRecord],
    multipliers: &[MultiplierRecord],
    params: &SolveParams,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Result<SolveOutcome<Vec<VehicleStops>>, SolveError> {
    if orders.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoOrders));
    }
    if vehicles.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoVehicles));
    }
    if cells.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoMatrixRows));
    }
    params.validate()?;

    let matrix = build_matrix(orders, vehicles, cells, multipliers, params.factor, log)?;
    let problem = PickDeliver::new(orders, vehicles, matrix, log)?;
    let replanning = SolveParams {
        optimize: true,
        stop_on_all_served: false,
        ..params.clone()
    };
    let solution = run_tabu(&problem, &replanning, cancel, log)?;
    Ok(SolveOutcome::Routed(solution.vehicle_stops(&problem)))
}

/// For each order, the vehicles whose capacity and depot windows could serve
/// it. This is a filter, not a solve.
pub fn compatible_vehicles(
    orders: &[OrderRecord],
    vehicles: &[VehicleRecord],
    cells: &[MatrixRecord],
    factor: f64,
    log: &mut MessageLog,
) -> Result<SolveOutcome<Vec<CompatibleVehiclesRow>>, SolveError> {
    if orders.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoOrders));
    }
    if vehicles.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoVehicles));
    }
    if cells.is_empty() {
        return Ok(SolveOutcome::Nothing(Notice::NoMatrixRows));
    }

    let matrix = build_matrix(orders, vehicles, cells, &[], factor, log)?;
    let problem = PickDeliver::new(orders, vehicles, matrix, log)?;

    let rows = problem
        .orders()
        .iter()
        .map(|order| CompatibleVehiclesRow {
            order_id: order.id(),
            vehicle_ids: problem.compatible_vehicles(order.idx()).into_vec(),
        })
        .collect();
    Ok(SolveOutcome::Routed(rows))
}

/// Three-channel report for hosts that cannot consume `Result` directly: a
/// diagnostic log, at most one of notice/error, and the rows. A panic inside
/// the core is contained here and reported as the generic unknown-exception
/// error, never propagated into the host process.
#[derive(Debug, Default)]
pub struct SolveReport {
    pub rows: Vec<StopRow>,
    pub log: String,
    pub notice: Option<String>,
    pub error: Option<String>,
}

pub fn solve_report(
    orders: &[OrderRecord],
    vehicles: &[VehicleRecord],
    cells: &[MatrixRecord],
    multipliers: &[MultiplierRecord],
    params: &SolveParams,
    cancel: &CancellationToken,
) -> SolveReport {
    let mut log = MessageLog::default();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        solve_pick_deliver(orders, vehicles, cells, multipliers, params, cancel, &mut log)
    }));

    let mut report = SolveReport::default();
    match outcome {
        Ok(Ok(SolveOutcome::Routed(rows))) => report.rows = rows,
        Ok(Ok(SolveOutcome::Nothing(notice))) => report.notice = Some(notice.to_string()),
        Ok(Err(error)) => report.error = Some(error.to_string()),
        Err(_) => report.error = Some(SolveError::Unknown.to_string()),
    }
    report.log = log.to_string();
    report
}

fn run_tabu(
    problem: &PickDeliver,
    params: &SolveParams,
    cancel: &CancellationToken,
    log: &mut MessageLog,
) -> Result<Solution, SolveError> {
    let initial = initialsol::tabu::build(
        problem,
        params.execution_date as Time,
        params.optimize,
        log,
    )?;
    info!(
        cost = initial.cost(),
        violations = initial.violations(),
        unassigned = initial.unassigned().len(),
        "initial solution built"
    );
    let solution = optimizers::tabu::optimize(
        problem,
        initial,
        params.max_cycles,
        params.stop_on_all_served,
        params.optimize,
        cancel,
        log,
    );
    verify_solution(problem, &solution)?;
    Ok(solution)
}

/// Post-condition check on every returned solution. A broken route here is
/// a bug in the search, not bad input, and is never silently ignored.
fn verify_solution(problem: &PickDeliver, solution: &Solution) -> Result<(), SolveError> {
    for route in solution.routes() {
        if !route.invariant() {
            let vehicle_id = problem.vehicles()[route.vehicle_idx()].id();
            return Err(SolveError::Internal(format!(
                "route of vehicle {vehicle_id} violates stop precedence"
            )));
        }
    }
    Ok(())
}

/// Builds and sanity-checks the matrix over exactly the node ids the orders
/// and vehicles use: triangle violations are repaired (and reported on the
/// log), any remaining infinite cell is a hard error.
fn build_matrix(
    orders: &[OrderRecord],
    vehicles: &[VehicleRecord],
    cells: &[MatrixRecord],
    multipliers: &[MultiplierRecord],
    factor: f64,
    log: &mut MessageLog,
) -> Result<CostMatrix, SolveError> {
    let mut node_ids: Vec<Id> = Vec::new();
    for order in orders {
        node_ids.push(order.pick_node_id);
        node_ids.push(order.deliver_node_id);
    }
    for vehicle in vehicles {
        node_ids.push(vehicle.start_node_id);
        node_ids.push(vehicle.end_node_id);
    }

    let rows: Vec<MatrixCell> = cells.iter().map(|&c| c.into()).collect();
    let mut matrix = CostMatrix::new(&rows, &node_ids, factor)?
        .with_multipliers(multipliers_from_records(multipliers));

    if !matrix.obeys_triangle_inequality() {
        let passes = matrix.fix_triangle_inequality();
        log.log(format!(
            "Matrix did not obey the triangle inequality; repaired in {passes} passes"
        ));
        if !matrix.obeys_triangle_inequality() {
            log.log("Matrix still does not obey the triangle inequality");
        }
    }

    if let Some((from_id, to_id)) = matrix.first_infinite_pair() {
        return Err(MatrixError::InfiniteCell { from_id, to_id }.into());
    }
    Ok(matrix)
}
