use fxhash::FxHashMap;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{Cost, Id, Time, TimeMultipliers};

/// One raw `(from, to, cost)` input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub from_id: Id,
    pub to_id: Id,
    pub cost: Cost,
}

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Cost scale factor must be positive, got {0}")]
    NonPositiveFactor(f64),
    #[error("Node {0} is not part of the matrix")]
    UnknownNode(Id),
    #[error("Negative cost {cost} between {from_id} and {to_id}")]
    NegativeCost { from_id: Id, to_id: Id, cost: Cost },
    #[error("An Infinity value was found on the Matrix between {from_id} and {to_id}")]
    InfiniteCell { from_id: Id, to_id: Id },
}

/// Square travel-cost matrix over a compact remapping of the node ids that
/// the problem actually uses.
///
/// Cells are stored flat: `index = from * num_nodes + to`. A missing
/// diagonal cell defaults to 0; any other missing cell is `INFINITY`
/// (unreachable). Costs are pre-scaled by the global factor at construction;
/// time-of-day multipliers apply at query time through
/// [`CostMatrix::travel_duration`].
#[derive(Debug, Clone)]
pub struct CostMatrix {
    ids: Vec<Id>,
    index: FxHashMap<Id, usize>,
    cells: Vec<Cost>,
    num_nodes: usize,
    multipliers: TimeMultipliers,
}

impl CostMatrix {
    /// Builds the matrix from raw rows against a node-id whitelist.
    ///
    /// Rows referencing ids outside the whitelist are ignored. Duplicate
    /// `(from, to)` rows resolve last-wins.
    pub fn new(rows: &[MatrixCell], node_ids: &[Id], factor: f64) -> Result<Self, MatrixError> {
        if factor <= 0.0 {
            return Err(MatrixError::NonPositiveFactor(factor));
        }

        let mut matrix = Self::empty(node_ids);
        for row in rows {
            if row.cost < 0.0 {
                return Err(MatrixError::NegativeCost {
                    from_id: row.from_id,
                    to_id: row.to_id,
                    cost: row.cost,
                });
            }
            let (Some(&from), Some(&to)) =
                (matrix.index.get(&row.from_id), matrix.index.get(&row.to_id))
            else {
                continue;
            };
            matrix.cells[from * matrix.num_nodes + to] = row.cost * factor;
        }
        Ok(matrix)
    }

    /// Builds the matrix from euclidean coordinates: cell cost is the
    /// distance between the two points, scaled by the factor.
    pub fn from_coordinates(points: &[(Id, Coord)], factor: f64) -> Result<Self, MatrixError> {
        if factor <= 0.0 {
            return Err(MatrixError::NonPositiveFactor(factor));
        }

        let ids: Vec<Id> = points.iter().map(|(id, _)| *id).collect();
        let mut matrix = Self::empty(&ids);
        for (i, (_, a)) in points.iter().enumerate() {
            for (j, (_, b)) in points.iter().enumerate() {
                let distance = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                matrix.cells[i * matrix.num_nodes + j] = distance * factor;
            }
        }
        Ok(matrix)
    }

    fn empty(node_ids: &[Id]) -> Self {
        let mut ids: Vec<Id> = Vec::with_capacity(node_ids.len());
        let mut index = FxHashMap::default();
        for &id in node_ids {
            if !index.contains_key(&id) {
                index.insert(id, ids.len());
                ids.push(id);
            }
        }

        let num_nodes = ids.len();
        let mut cells = vec![Cost::INFINITY; num_nodes * num_nodes];
        for i in 0..num_nodes {
            cells[i * num_nodes + i] = 0.0;
        }

        CostMatrix {
            ids,
            index,
            cells,
            num_nodes,
            multipliers: TimeMultipliers::default(),
        }
    }

    pub fn with_multipliers(mut self, multipliers: TimeMultipliers) -> Self {
        self.multipliers = multipliers;
        self
    }

    pub fn multipliers(&self) -> &TimeMultipliers {
        &self.multipliers
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Compact index of an external node id.
    pub fn node_index(&self, id: Id) -> Result<usize, MatrixError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(MatrixError::UnknownNode(id))
    }

    pub fn node_id(&self, index: usize) -> Id {
        self.ids[index]
    }

    /// Statically scaled cost between two compact indices. `INFINITY` means
    /// unreachable.
    #[inline(always)]
    pub fn cost(&self, from: usize, to: usize) -> Cost {
        self.cells[from * self.num_nodes + to]
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.cost(from, to).is_finite()
    }

    /// Wall-clock travel duration departing at `departure` with a vehicle
    /// speed multiplier: the base cost divided by speed, stretched piecewise
    /// across the time-of-day multiplier breakpoints.
    pub fn travel_duration(&self, from: usize, to: usize, departure: Time, speed: f64) -> Time {
        self.multipliers.stretch(self.cost(from, to) / speed, departure)
    }

    /// First `(from_id, to_id)` pair with an infinite cost, if any.
    pub fn first_infinite_pair(&self) -> Option<(Id, Id)> {
        for from in 0..self.num_nodes {
            for to in 0..self.num_nodes {
                if !self.is_reachable(from, to) {
                    return Some((self.ids[from], self.ids[to]));
                }
            }
        }
        None
    }

    /// True iff every pair among the whitelisted ids has a finite cost in
    /// both directions.
    pub fn has_no_infinity(&self) -> bool {
        self.first_infinite_pair().is_none()
    }

    pub fn obeys_triangle_inequality(&self) -> bool {
        for k in 0..self.num_nodes {
            for i in 0..self.num_nodes {
                let ik = self.cost(i, k);
                if !ik.is_finite() {
                    continue;
                }
                for j in 0..self.num_nodes {
                    let kj = self.cost(k, j);
                    if kj.is_finite() && self.cost(i, j) > ik + kj {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Relaxes every violating cell to the shorter two-hop cost, repeating
    /// until a full pass changes nothing or `num_nodes` passes have run (one
    /// pass propagates an improvement at most one extra hop, so `num_nodes`
    /// passes bound the relaxation). Returns the number of passes used.
    pub fn fix_triangle_inequality(&mut self) -> usize {
        let max_passes = self.num_nodes.max(1);
        let mut passes = 0;
        while passes < max_passes {
            passes += 1;
            let mut changed = false;
            for k in 0..self.num_nodes {
                for i in 0..self.num_nodes {
                    let ik = self.cost(i, k);
                    if !ik.is_finite() {
                        continue;
                    }
                    for j in 0..self.num_nodes {
                        let kj = self.cost(k, j);
                        if kj.is_finite() && self.cells[i * self.num_nodes + j] > ik + kj {
                            self.cells[i * self.num_nodes + j] = ik + kj;
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        debug!(passes, "triangle inequality repair finished");
        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(from_id: Id, to_id: Id, cost: Cost) -> MatrixCell {
        MatrixCell {
            from_id,
            to_id,
            cost,
        }
    }

    fn full_three_node() -> Vec<MatrixCell> {
        let mut rows = Vec::new();
        for &(a, b, c) in &[(1, 2, 5.0), (2, 3, 5.0), (1, 3, 8.0)] {
            rows.push(cell(a, b, c));
            rows.push(cell(b, a, c));
        }
        rows
    }

    #[test]
    fn full_matrix_has_no_infinity() {
        let m = CostMatrix::new(&full_three_node(), &[1, 2, 3], 1.0).unwrap();
        assert!(m.has_no_infinity());
        assert_eq!(m.cost(0, 1), 5.0);
    }

    #[test]
    fn missing_off_diagonal_cell_is_infinite() {
        let mut rows = full_three_node();
        rows.retain(|r| !(r.from_id == 1 && r.to_id == 3));
        let m = CostMatrix::new(&rows, &[1, 2, 3], 1.0).unwrap();
        assert!(!m.has_no_infinity());
        assert_eq!(m.first_infinite_pair(), Some((1, 3)));
    }

    #[test]
    fn diagonal_defaults_to_zero() {
        let m = CostMatrix::new(&full_three_node(), &[1, 2, 3], 1.0).unwrap();
        for i in 0..3 {
            assert_eq!(m.cost(i, i), 0.0);
        }
    }

    #[test]
    fn rows_outside_the_whitelist_are_ignored() {
        let mut rows = full_three_node();
        rows.push(cell(1, 99, 1.0));
        let m = CostMatrix::new(&rows, &[1, 2, 3], 1.0).unwrap();
        assert_eq!(m.num_nodes(), 3);
        assert!(m.node_index(99).is_err());
    }

    #[test]
    fn duplicate_cells_last_wins() {
        let rows = vec![cell(1, 2, 5.0), cell(1, 2, 7.0)];
        let m = CostMatrix::new(&rows, &[1, 2], 1.0).unwrap();
        assert_eq!(m.cost(0, 1), 7.0);

        // The reversed input shows what first-wins would have produced.
        let rows = vec![cell(1, 2, 7.0), cell(1, 2, 5.0)];
        let m = CostMatrix::new(&rows, &[1, 2], 1.0).unwrap();
        assert_eq!(m.cost(0, 1), 5.0);
    }

    #[test]
    fn factor_scales_costs_and_must_be_positive() {
        let m = CostMatrix::new(&full_three_node(), &[1, 2, 3], 2.0).unwrap();
        assert_eq!(m.cost(0, 1), 10.0);

        assert!(matches!(
            CostMatrix::new(&full_three_node(), &[1, 2, 3], 0.0),
            Err(MatrixError::NonPositiveFactor(_))
        ));
    }

    #[test]
    fn negative_cost_is_rejected() {
        let rows = vec![cell(1, 2, -1.0)];
        assert!(matches!(
            CostMatrix::new(&rows, &[1, 2], 1.0),
            Err(MatrixError::NegativeCost { .. })
        ));
    }

    #[test]
    fn triangle_violation_is_detected_and_repaired() {
        let rows = vec![
            cell(1, 2, 3.0),
            cell(2, 1, 3.0),
            cell(2, 3, 3.0),
            cell(3, 2, 3.0),
            cell(1, 3, 10.0),
            cell(3, 1, 10.0),
        ];
        let mut m = CostMatrix::new(&rows, &[1, 2, 3], 1.0).unwrap();
        assert!(!m.obeys_triangle_inequality());

        let passes = m.fix_triangle_inequality();
        assert!(passes >= 1);
        assert_eq!(m.cost(0, 2), 6.0);
        assert!(m.obeys_triangle_inequality());
    }

    #[test]
    fn triangle_repair_is_idempotent() {
        let rows = vec![
            cell(1, 2, 3.0),
            cell(2, 1, 3.0),
            cell(2, 3, 3.0),
            cell(3, 2, 3.0),
            cell(1, 3, 10.0),
            cell(3, 1, 10.0),
        ];
        let mut m = CostMatrix::new(&rows, &[1, 2, 3], 1.0).unwrap();
        m.fix_triangle_inequality();
        let cells_before = m.cells.clone();
        let passes = m.fix_triangle_inequality();
        assert_eq!(passes, 1);
        assert_eq!(m.cells, cells_before);
    }

    #[test]
    fn euclidean_construction() {
        let points = vec![
            (10, Coord { x: 0.0, y: 0.0 }),
            (20, Coord { x: 3.0, y: 4.0 }),
        ];
        let m = CostMatrix::from_coordinates(&points, 1.0).unwrap();
        assert_eq!(m.cost(0, 1), 5.0);
        assert_eq!(m.cost(1, 0), 5.0);
        assert!(m.obeys_triangle_inequality());
    }

    #[test]
    fn travel_duration_applies_speed_and_multipliers() {
        let m = CostMatrix::new(&full_three_node(), &[1, 2, 3], 1.0)
            .unwrap()
            .with_multipliers(TimeMultipliers::new(vec![(0.0, 2.0)]));
        assert_eq!(m.travel_duration(0, 1, 0.0, 1.0), 10.0);
        assert_eq!(m.travel_duration(0, 1, 0.0, 2.0), 5.0);
    }
}
