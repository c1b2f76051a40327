//! Minimum-cost one-to-one matching of riders to targets.
//!
//! Small problems (both sides up to [`MAX_BACKTRACK_SIZE`]) are solved by
//! exhaustive backtracking in rider order, pruning any partial assignment
//! whose cost already meets or exceeds the best complete one. Larger problems
//! go through the Hungarian (Kuhn-Munkres) algorithm, which is also exact.
//!
//! Matching cardinality is always `min(riders, targets)`; surplus riders or
//! targets stay unmatched.

use pathfinding::kuhn_munkres::{kuhn_munkres_min, Weights};

use crate::grid::GridPos;

/// Largest side length solved by backtracking.
pub const MAX_BACKTRACK_SIZE: usize = 8;

/// One matched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub rider_index: usize,
    pub target_index: usize,
    pub cost: i64,
}

/// Match riders to targets minimizing total Manhattan distance.
pub fn solve_assignment(riders: &[GridPos], targets: &[GridPos]) -> Vec<Assignment> {
    let costs: Vec<Vec<i64>> = riders
        .iter()
        .map(|rider| {
            targets
                .iter()
                .map(|target| i64::from(rider.manhattan(*target)))
                .collect()
        })
        .collect();
    solve_assignment_costs(&costs)
}

/// Match rows (riders) to columns (targets) minimizing total cost.
///
/// Every row must have the same length. Costs must be non-negative for the
/// backtracking pruning to be sound.
pub fn solve_assignment_costs(costs: &[Vec<i64>]) -> Vec<Assignment> {
    let rows = costs.len();
    let cols = costs.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    debug_assert!(costs.iter().all(|row| row.len() == cols), "ragged cost matrix");
    debug_assert!(
        costs.iter().flatten().all(|cost| *cost >= 0),
        "negative assignment cost"
    );

    let mut result = if rows <= MAX_BACKTRACK_SIZE && cols <= MAX_BACKTRACK_SIZE {
        backtrack(costs, cols)
    } else {
        hungarian(costs, cols)
    };
    result.sort_by_key(|a| a.rider_index);
    result
}

/// Sum of the matched costs.
pub fn total_cost(assignments: &[Assignment]) -> i64 {
    assignments.iter().map(|a| a.cost).sum()
}

struct Backtrack<'a> {
    costs: &'a [Vec<i64>],
    cols: usize,
    needed: usize,
    used: Vec<bool>,
    current: Vec<Option<usize>>,
    best: Vec<Option<usize>>,
    best_cost: i64,
}

impl Backtrack<'_> {
    fn recurse(&mut self, rider: usize, matched: usize, cost: i64) {
        if cost >= self.best_cost {
            return;
        }
        if matched == self.needed {
            self.best_cost = cost;
            self.best = self.current.clone();
            return;
        }
        let riders_left = self.costs.len() - rider;
        if riders_left < self.needed - matched {
            return;
        }

        for target in 0..self.cols {
            if self.used[target] {
                continue;
            }
            self.used[target] = true;
            self.current[rider] = Some(target);
            self.recurse(rider + 1, matched + 1, cost + self.costs[rider][target]);
            self.current[rider] = None;
            self.used[target] = false;
        }

        // Leave this rider unmatched if the others can still fill every slot.
        if riders_left > self.needed - matched {
            self.recurse(rider + 1, matched, cost);
        }
    }
}

fn backtrack(costs: &[Vec<i64>], cols: usize) -> Vec<Assignment> {
    let rows = costs.len();
    let mut search = Backtrack {
        costs,
        cols,
        needed: rows.min(cols),
        used: vec![false; cols],
        current: vec![None; rows],
        best: vec![None; rows],
        best_cost: i64::MAX,
    };
    search.recurse(0, 0, 0);

    search
        .best
        .iter()
        .enumerate()
        .filter_map(|(rider_index, target)| {
            target.map(|target_index| Assignment {
                rider_index,
                target_index,
                cost: costs[rider_index][target_index],
            })
        })
        .collect()
}

/// Simple matrix type implementing pathfinding's Weights for i64.
struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

fn hungarian(costs: &[Vec<i64>], cols: usize) -> Vec<Assignment> {
    let rows = costs.len();
    // Kuhn-Munkres requires rows <= columns, so the smaller side becomes rows.
    if rows <= cols {
        let weights = I64Weights(costs.to_vec());
        let (_total, assignment) = kuhn_munkres_min(&weights);
        assignment
            .into_iter()
            .enumerate()
            .map(|(rider_index, target_index)| Assignment {
                rider_index,
                target_index,
                cost: costs[rider_index][target_index],
            })
            .collect()
    } else {
        let transposed: Vec<Vec<i64>> = (0..cols)
            .map(|col| costs.iter().map(|row| row[col]).collect())
            .collect();
        let weights = I64Weights(transposed);
        let (_total, assignment) = kuhn_munkres_min(&weights);
        assignment
            .into_iter()
            .enumerate()
            .map(|(target_index, rider_index)| Assignment {
                rider_index,
                target_index,
                cost: costs[rider_index][target_index],
            })
            .collect()
    }
}
