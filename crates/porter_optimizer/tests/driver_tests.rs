mod common;

use common::{assert_rows_consistent, order, summary_row, symmetric, three_node_matrix, vehicle};
use geo_types::Coord;
use porter_optimizer::cancellation::CancellationToken;
use porter_optimizer::driver::{
    compatible_vehicles, solve_euclidean, solve_pick_deliver, solve_report, solve_with_initials,
    Notice, SolveOutcome, SolveParams,
};
use porter_optimizer::error::{ProblemError, SolveError};
use porter_optimizer::input::records::{EuclideanOrderRecord, EuclideanVehicleRecord, MultiplierRecord};
use porter_optimizer::messages::MessageLog;

fn params() -> SolveParams {
    SolveParams {
        max_cycles: 20,
        ..SolveParams::default()
    }
}

#[test]
fn two_orders_one_vehicle_yield_a_feasible_four_stop_route() {
    let orders = vec![
        order(101, 5, 1, (0, 200), 2, (0, 500)),
        order(102, 5, 2, (0, 400), 3, (0, 900)),
    ];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];
    let mut log = MessageLog::default();

    let outcome = solve_pick_deliver(
        &orders,
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();

    let SolveOutcome::Routed(rows) = outcome else {
        panic!("expected rows, got a notice");
    };
    // One vehicle: depot + four order stops + depot, then the summary.
    assert_eq!(rows.len(), 7);
    let summary = summary_row(&rows);
    assert_eq!(summary.twv_total, 0);
    assert_eq!(summary.cv_total, 0);
    assert_rows_consistent(&rows, 10);
}

#[test]
fn unservable_order_is_logged_not_an_error() {
    let orders = vec![order(101, 5, 1, (0, 200), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 4, 1, (0, 1000))];
    let mut log = MessageLog::default();

    let outcome = solve_pick_deliver(
        &orders,
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();

    let SolveOutcome::Routed(rows) = outcome else {
        panic!("a partial plan is still a result");
    };
    // No vehicle could take the order: only the summary row remains.
    assert_eq!(rows.len(), 1);
    assert!(log.to_string().contains("left unassigned"));
}

#[test]
fn empty_inputs_are_notices() {
    let mut log = MessageLog::default();
    let orders = vec![order(101, 5, 1, (0, 200), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];

    let no_orders = solve_pick_deliver(
        &[],
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();
    assert!(matches!(no_orders, SolveOutcome::Nothing(Notice::NoOrders)));

    let no_vehicles = solve_pick_deliver(
        &orders,
        &[],
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();
    assert!(matches!(
        no_vehicles,
        SolveOutcome::Nothing(Notice::NoVehicles)
    ));

    let no_matrix = solve_pick_deliver(
        &orders,
        &vehicles,
        &[],
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();
    assert!(matches!(
        no_matrix,
        SolveOutcome::Nothing(Notice::NoMatrixRows)
    ));
}

#[test]
fn missing_connection_is_a_hard_error() {
    let orders = vec![order(101, 5, 1, (0, 200), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];
    // The problem uses nodes 1 and 2 but no row connects them; rows through
    // node 3 are outside the whitelist and ignored.
    let cells = symmetric(&[(1, 3, 8.0), (2, 3, 5.0)]);
    let mut log = MessageLog::default();

    let result = solve_pick_deliver(
        &orders,
        &vehicles,
        &cells,
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    );
    assert!(matches!(
        result,
        Err(SolveError::Matrix(
            porter_matrix::MatrixError::InfiniteCell { .. }
        ))
    ));
}

#[test]
fn malformed_time_window_names_the_order() {
    let mut bad = order(101, 5, 1, (0, 200), 2, (0, 500));
    bad.pick_open = 300;
    bad.pick_close = 100;
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];
    let mut log = MessageLog::default();

    let result = solve_pick_deliver(
        &[bad],
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    );
    assert!(matches!(
        result,
        Err(SolveError::Problem(ProblemError::InvalidOrderTimeWindow {
            id: 101
        }))
    ));
}

#[test]
fn triangle_violations_are_repaired_and_reported() {
    let orders = vec![order(101, 5, 1, (0, 200), 3, (0, 500))];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];
    let cells = symmetric(&[(1, 2, 3.0), (2, 3, 3.0), (1, 3, 10.0)]);
    let mut log = MessageLog::default();

    let outcome = solve_pick_deliver(
        &orders,
        &vehicles,
        &cells,
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();
    assert!(matches!(outcome, SolveOutcome::Routed(_)));
    assert!(log.to_string().contains("triangle inequality"));
}

#[test]
fn time_multipliers_stretch_the_schedule() {
    let orders = vec![order(101, 5, 1, (0, 100), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];
    let multipliers = vec![MultiplierRecord {
        start: 0,
        multiplier: 2.0,
    }];
    let mut log = MessageLog::default();

    let outcome = solve_pick_deliver(
        &orders,
        &vehicles,
        &three_node_matrix(),
        &multipliers,
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();

    let SolveOutcome::Routed(rows) = outcome else {
        panic!("expected rows");
    };
    let delivery = rows
        .iter()
        .find(|r| r.stop_kind == 3)
        .expect("delivery row present");
    // Base travel A→B is 5; the doubled multiplier makes it 10.
    assert_eq!(delivery.arrival_time, 10);
}

#[test]
fn every_initials_code_builds_a_feasible_solution() {
    let orders = vec![
        order(101, 5, 1, (0, 200), 2, (0, 500)),
        order(102, 5, 2, (0, 400), 3, (0, 900)),
        order(103, 3, 1, (0, 600), 3, (0, 900)),
    ];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000)), vehicle(2, 10, 1, (0, 1000))];

    for code in 0..=6 {
        let mut log = MessageLog::default();
        let outcome = solve_with_initials(
            &orders,
            &vehicles,
            &three_node_matrix(),
            &[],
            &SolveParams {
                initial_code: code,
                max_cycles: 10,
                ..SolveParams::default()
            },
            &CancellationToken::new(),
            &mut log,
        )
        .unwrap();

        let SolveOutcome::Routed(rows) = outcome else {
            panic!("code {code} produced no rows");
        };
        let summary = summary_row(&rows);
        assert_eq!(summary.twv_total, 0, "code {code} violated a window");
        assert_eq!(summary.cv_total, 0, "code {code} violated capacity");
        assert_rows_consistent(&rows, 10);
    }
}

#[test]
fn unknown_initials_code_is_rejected() {
    let orders = vec![order(101, 5, 1, (0, 200), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];
    let mut log = MessageLog::default();

    let result = solve_with_initials(
        &orders,
        &vehicles,
        &three_node_matrix(),
        &[],
        &SolveParams {
            initial_code: 7,
            ..SolveParams::default()
        },
        &CancellationToken::new(),
        &mut log,
    );
    assert!(matches!(result, Err(SolveError::UnknownInitialsCode(7))));
}

#[test]
fn euclidean_mode_routes_without_matrix_rows() {
    let orders = vec![EuclideanOrderRecord {
        id: 101,
        demand: 5,
        pick: Coord { x: 0.0, y: 0.0 },
        pick_open: 0,
        pick_close: 200,
        pick_service: 0,
        deliver: Coord { x: 3.0, y: 4.0 },
        deliver_open: 0,
        deliver_close: 500,
        deliver_service: 0,
    }];
    let vehicles = vec![EuclideanVehicleRecord {
        id: 1,
        capacity: 10,
        count: 1,
        speed: 1.0,
        start: Coord { x: 0.0, y: 0.0 },
        start_open: 0,
        start_close: 1000,
        start_service: 0,
        end: Coord { x: 0.0, y: 0.0 },
        end_open: 0,
        end_close: 1000,
        end_service: 0,
        stops: Vec::new(),
    }];
    let mut log = MessageLog::default();

    let outcome = solve_euclidean(
        &orders,
        &vehicles,
        &[],
        &params(),
        &CancellationToken::new(),
        &mut log,
    )
    .unwrap();

    let SolveOutcome::Routed(rows) = outcome else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 5);
    let delivery = rows.iter().find(|r| r.stop_kind == 3).unwrap();
    assert_eq!(delivery.arrival_time, 5);
    assert_rows_consistent(&rows, 10);
}

#[test]
fn compatible_vehicles_filters_by_capacity() {
    let orders = vec![order(101, 5, 1, (0, 200), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 4, 1, (0, 1000)), vehicle(2, 10, 1, (0, 1000))];
    let mut log = MessageLog::default();

    let outcome = compatible_vehicles(
        &orders,
        &vehicles,
        &three_node_matrix(),
        1.0,
        &mut log,
    )
    .unwrap();

    let SolveOutcome::Routed(rows) = outcome else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].order_id, 101);
    assert_eq!(rows[0].vehicle_ids, vec![2]);
}

#[test]
fn report_populates_at_most_one_of_notice_and_error() {
    let orders = vec![order(101, 5, 1, (0, 200), 2, (0, 500))];
    let vehicles = vec![vehicle(1, 10, 1, (0, 1000))];

    let ok = solve_report(
        &orders,
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
    );
    assert!(!ok.rows.is_empty());
    assert!(ok.notice.is_none() && ok.error.is_none());

    let nothing = solve_report(
        &[],
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
    );
    assert!(nothing.rows.is_empty());
    assert!(nothing.notice.is_some() && nothing.error.is_none());

    let mut bad = orders.clone();
    bad[0].demand = -1;
    let failed = solve_report(
        &bad,
        &vehicles,
        &three_node_matrix(),
        &[],
        &params(),
        &CancellationToken::new(),
    );
    assert!(failed.rows.is_empty());
    assert!(failed.error.is_some() && failed.notice.is_none());
}

#[test]
fn params_round_trip_as_json() {
    let params = SolveParams::default();
    let json = serde_json::to_string(&params).unwrap();
    let back: SolveParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back.factor, params.factor);
    assert_eq!(back.max_cycles, params.max_cycles);
    assert_eq!(back.initial_code, params.initial_code);
}
