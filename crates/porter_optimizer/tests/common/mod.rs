#![allow(dead_code)]

use porter_optimizer::input::records::{MatrixRecord, OrderRecord, VehicleRecord};
use porter_optimizer::problem::StopRow;
use porter_optimizer::{Amount, Id};

/// Symmetric matrix rows over the classic three-node instance:
/// A(1)–B(2) = 5, B(2)–C(3) = 5, A(1)–C(3) = 8.
pub fn three_node_matrix() -> Vec<MatrixRecord> {
    symmetric(&[(1, 2, 5.0), (2, 3, 5.0), (1, 3, 8.0)])
}

pub fn symmetric(edges: &[(Id, Id, f64)]) -> Vec<MatrixRecord> {
    let mut rows = Vec::new();
    for &(from_id, to_id, cost) in edges {
        rows.push(MatrixRecord {
            from_id,
            to_id,
            cost,
        });
        rows.push(MatrixRecord {
            from_id: to_id,
            to_id: from_id,
            cost,
        });
    }
    rows
}

pub fn order(
    id: Id,
    demand: Amount,
    pick_node: Id,
    pick_window: (i64, i64),
    deliver_node: Id,
    deliver_window: (i64, i64),
) -> OrderRecord {
    OrderRecord {
        id,
        demand,
        pick_node_id: pick_node,
        pick_open: pick_window.0,
        pick_close: pick_window.1,
        pick_service: 0,
        deliver_node_id: deliver_node,
        deliver_open: deliver_window.0,
        deliver_close: deliver_window.1,
        deliver_service: 0,
    }
}

pub fn vehicle(id: Id, capacity: Amount, depot: Id, window: (i64, i64)) -> VehicleRecord {
    VehicleRecord {
        id,
        capacity,
        count: 1,
        speed: 1.0,
        start_node_id: depot,
        start_open: window.0,
        start_close: window.1,
        start_service: 0,
        end_node_id: depot,
        end_open: window.0,
        end_close: window.1,
        end_service: 0,
        stops: Vec::new(),
    }
}

pub fn summary_row(rows: &[StopRow]) -> &StopRow {
    let row = rows.last().expect("result rows always end with a summary");
    assert_eq!(row.vehicle_id, -2, "last row must be the summary");
    row
}

/// Checks the structural route properties on the wire rows: ascending stop
/// sequences, time monotonicity, pickup-before-delivery, and cargo bounds.
pub fn assert_rows_consistent(rows: &[StopRow], capacity: Amount) {
    let stop_rows: Vec<&StopRow> = rows.iter().filter(|r| r.vehicle_id != -2).collect();

    let mut vehicle_seqs: Vec<i32> = stop_rows.iter().map(|r| r.vehicle_seq).collect();
    vehicle_seqs.dedup();
    for vehicle_seq in vehicle_seqs {
        let route: Vec<&&StopRow> = stop_rows
            .iter()
            .filter(|r| r.vehicle_seq == vehicle_seq)
            .collect();

        for pair in route.windows(2) {
            assert_eq!(pair[1].stop_seq, pair[0].stop_seq + 1);
            assert!(
                pair[1].arrival_time >= pair[0].departure_time,
                "arrival before previous departure at stop {}",
                pair[1].stop_seq
            );
        }
        for row in &route {
            assert!(
                (0..=capacity).contains(&row.cargo),
                "cargo {} out of bounds at stop {}",
                row.cargo,
                row.stop_seq
            );
        }

        let order_ids: Vec<Id> = route
            .iter()
            .filter(|r| r.order_id >= 0)
            .map(|r| r.order_id)
            .collect();
        for order_id in order_ids {
            let pickup = route.iter().position(|r| r.order_id == order_id && r.stop_kind == 2);
            let delivery = route.iter().position(|r| r.order_id == order_id && r.stop_kind == 3);
            match (pickup, delivery) {
                (Some(p), Some(d)) => assert!(p < d, "pickup after delivery for order {order_id}"),
                _ => panic!("order {order_id} is missing a stop in its route"),
            }
        }
    }
}
