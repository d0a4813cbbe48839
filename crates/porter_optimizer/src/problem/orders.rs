use std::ops::Index;

use fxhash::FxHashSet;

use crate::Speed;
use porter_matrix::CostMatrix;

use super::order::Order;

/// The full order set plus the precomputed pairwise compatibility used to
/// prune the search space. `can_follow[i]` holds every order that could be
/// served after order `i` completes; `can_precede[i]` is the mirror.
///
/// Compatibility is a necessary-condition prefilter over time windows, not a
/// full feasibility proof; it is computed once, in O(n²), so the insertion
/// and swap operators never re-derive time-window algebra per candidate.
#[derive(Debug, Clone, Default)]
pub struct Orders {
    items: Vec<Order>,
    can_follow: Vec<FxHashSet<usize>>,
    can_precede: Vec<FxHashSet<usize>>,
}

impl Orders {
    pub fn new(items: Vec<Order>) -> Self {
        let n = items.len();
        Orders {
            items,
            can_follow: vec![FxHashSet::default(); n],
            can_precede: vec![FxHashSet::default(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.items.iter()
    }

    pub fn get(&self, idx: usize) -> &Order {
        &self.items[idx]
    }

    pub fn set_compatibles(&mut self, matrix: &CostMatrix, speed: Speed) {
        for i in 0..self.items.len() {
            for j in 0..self.items.len() {
                if i != j && self.items[i].can_precede(&self.items[j], matrix, speed) {
                    self.can_follow[i].insert(j);
                    self.can_precede[j].insert(i);
                }
            }
        }
    }

    /// Orders that could be served after `idx` completes.
    pub fn successors(&self, idx: usize) -> &FxHashSet<usize> {
        &self.can_follow[idx]
    }

    /// Orders that could be served before `idx` starts.
    pub fn predecessors(&self, idx: usize) -> &FxHashSet<usize> {
        &self.can_precede[idx]
    }

    /// Two orders can possibly coexist on one route when either can follow
    /// the other.
    pub fn are_compatible(&self, a: usize, b: usize) -> bool {
        self.can_follow[a].contains(&b) || self.can_follow[b].contains(&a)
    }

    /// Cheapest compatible successor of `of` within `within`, by
    /// delivery-to-pickup travel cost; ties resolve to the lower index.
    pub fn find_best_successor(
        &self,
        of: usize,
        within: &FxHashSet<usize>,
        matrix: &CostMatrix,
    ) -> Option<usize> {
        let from = self.items[of].delivery().location();
        self.can_follow[of]
            .iter()
            .filter(|j| within.contains(j))
            .copied()
            .min_by(|&a, &b| {
                let ca = matrix.cost(from, self.items[a].pickup().location());
                let cb = matrix.cost(from, self.items[b].pickup().location());
                ca.total_cmp(&cb).then(a.cmp(&b))
            })
    }

    /// The order in `within` with the most compatible successors inside the
    /// same set (the most flexible start of a chain); ties resolve to the
    /// lower index.
    pub fn find_most_flexible(&self, within: &FxHashSet<usize>) -> Option<usize> {
        within
            .iter()
            .copied()
            .max_by(|&a, &b| {
                let na = self.can_follow[a].iter().filter(|j| within.contains(j)).count();
                let nb = self.can_follow[b].iter().filter(|j| within.contains(j)).count();
                na.cmp(&nb).then(b.cmp(&a))
            })
    }
}

impl Index<usize> for Orders {
    type Output = Order;

    fn index(&self, idx: usize) -> &Order {
        &self.items[idx]
    }
}
