//! Best-first grid search shared by the three routing strategies.
//!
//! One search loop serves uniform-cost (Dijkstra), greedy best-first and A*;
//! the strategies differ only in the frontier key. All edges cost 1 and walls
//! are never enqueued. A cell is marked visited when it is first enqueued, so
//! the frontier never holds two entries for the same cell.
//!
//! Frontier ties are broken deterministically: equal keys pop the shallower
//! node first (smaller distance from start), then in insertion order. With the
//! consistent Manhattan heuristic this keeps A* optimal under
//! visit-on-enqueue, and makes every result reproducible.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{Grid, GridPos};

/// Frontier ordering policy.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Key = distance from start. Shortest path in hop count.
    Dijkstra,
    /// Key = Manhattan distance to goal. Fast, not optimal.
    Greedy,
    /// Key = distance from start + Manhattan distance to goal.
    #[default]
    AStar,
}

impl SearchStrategy {
    pub const ALL: [SearchStrategy; 3] = [
        SearchStrategy::Dijkstra,
        SearchStrategy::Greedy,
        SearchStrategy::AStar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SearchStrategy::Dijkstra => "dijkstra",
            SearchStrategy::Greedy => "greedy",
            SearchStrategy::AStar => "astar",
        }
    }

    /// Whether the strategy always returns a shortest path.
    pub fn is_optimal(self) -> bool {
        !matches!(self, SearchStrategy::Greedy)
    }

    fn key(self, distance: u32, heuristic: u32) -> u32 {
        match self {
            SearchStrategy::Dijkstra => distance,
            SearchStrategy::Greedy => heuristic,
            SearchStrategy::AStar => distance + heuristic,
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown search strategy '{0}' (expected dijkstra, greedy or astar)")]
pub struct ParseStrategyError(pub String);

impl FromStr for SearchStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dijkstra" | "uniform" | "uniform-cost" => Ok(SearchStrategy::Dijkstra),
            "greedy" | "best-first" => Ok(SearchStrategy::Greedy),
            "astar" | "a*" | "a-star" => Ok(SearchStrategy::AStar),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// A successful search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Start to end inclusive.
    pub path: Vec<GridPos>,
    pub visited_count: usize,
    /// Cells in the order they were first enqueued.
    pub visited_order: Vec<GridPos>,
    pub elapsed: Duration,
}

impl SearchResult {
    /// Number of moves along the path.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Full record of one search, successful or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchTrace {
    pub path: Option<Vec<GridPos>>,
    pub visited_order: Vec<GridPos>,
    pub elapsed: Duration,
}

impl SearchTrace {
    pub fn visited_count(&self) -> usize {
        self.visited_order.len()
    }

    pub fn into_result(self) -> Option<SearchResult> {
        let path = self.path?;
        Some(SearchResult {
            path,
            visited_count: self.visited_order.len(),
            visited_order: self.visited_order,
            elapsed: self.elapsed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    key: u32,
    distance: u32,
    seq: u64,
    pos: GridPos,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the smallest (key, distance, seq) first.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.distance.cmp(&self.distance))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    distance: u32,
    parent: Option<GridPos>,
}

/// Route from `start` to `end`, or `None` when the end is unreachable,
/// either endpoint is walled, or either endpoint lies outside the grid.
pub fn find_path(
    grid: &Grid,
    start: GridPos,
    end: GridPos,
    strategy: SearchStrategy,
) -> Option<SearchResult> {
    search(grid, start, end, strategy).into_result()
}

/// Run a search and keep its effort statistics even when it fails.
pub fn search(grid: &Grid, start: GridPos, end: GridPos, strategy: SearchStrategy) -> SearchTrace {
    let started = Instant::now();
    let mut trace = SearchTrace::default();

    let (Some(start_idx), true) = (
        grid.index(start).filter(|_| grid.is_passable(start)),
        grid.is_passable(end),
    ) else {
        trace.elapsed = started.elapsed();
        return trace;
    };

    let mut nodes: Vec<Option<Node>> = vec![None; grid.cell_count()];
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;

    nodes[start_idx] = Some(Node {
        distance: 0,
        parent: None,
    });
    trace.visited_order.push(start);
    frontier.push(FrontierEntry {
        key: strategy.key(0, start.manhattan(end)),
        distance: 0,
        seq,
        pos: start,
    });

    while let Some(FrontierEntry { pos, distance, .. }) = frontier.pop() {
        if pos == end {
            trace.path = Some(reconstruct(grid, &nodes, end));
            break;
        }

        for next in grid.passable_neighbors(pos) {
            let Some(idx) = grid.index(next) else {
                continue;
            };
            if nodes[idx].is_some() {
                continue;
            }
            let next_distance = distance + 1;
            nodes[idx] = Some(Node {
                distance: next_distance,
                parent: Some(pos),
            });
            trace.visited_order.push(next);
            seq += 1;
            frontier.push(FrontierEntry {
                key: strategy.key(next_distance, next.manhattan(end)),
                distance: next_distance,
                seq,
                pos: next,
            });
        }
    }

    trace.elapsed = started.elapsed();
    trace
}

fn reconstruct(grid: &Grid, nodes: &[Option<Node>], end: GridPos) -> Vec<GridPos> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(parent) = grid
        .index(current)
        .and_then(|idx| nodes[idx])
        .and_then(|node| node.parent)
    {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Length in hops of the true shortest path, by the cheapest means available.
pub fn shortest_hops(grid: &Grid, start: GridPos, end: GridPos) -> Option<usize> {
    find_path(grid, start, end, SearchStrategy::Dijkstra).map(|result| result.hop_count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(rows: i32, cols: i32) -> Grid {
        Grid::new(rows, cols).expect("grid")
    }

    #[test]
    fn straight_line_on_open_grid() {
        let grid = open_grid(5, 5);
        for strategy in SearchStrategy::ALL {
            let result = find_path(&grid, GridPos::new(0, 0), GridPos::new(0, 3), strategy)
                .expect("path");
            assert_eq!(result.hop_count(), 3, "{strategy}");
            assert_eq!(result.path.first(), Some(&GridPos::new(0, 0)));
            assert_eq!(result.path.last(), Some(&GridPos::new(0, 3)));
        }
    }

    #[test]
    fn start_equals_end_is_single_cell() {
        let grid = open_grid(3, 3);
        let here = GridPos::new(1, 1);
        let result = find_path(&grid, here, here, SearchStrategy::AStar).expect("path");
        assert_eq!(result.path, vec![here]);
        assert_eq!(result.visited_count, 1);
    }

    #[test]
    fn walled_end_is_not_found() {
        let grid = Grid::with_walls(3, 3, [GridPos::new(2, 2)]).expect("grid");
        for strategy in SearchStrategy::ALL {
            assert!(find_path(&grid, GridPos::new(0, 0), GridPos::new(2, 2), strategy).is_none());
        }
    }

    #[test]
    fn walled_start_is_not_found() {
        let walled = GridPos::new(1, 1);
        let grid = Grid::with_walls(3, 3, [walled]).expect("grid");
        for strategy in SearchStrategy::ALL {
            assert!(find_path(&grid, walled, GridPos::new(2, 2), strategy).is_none());
            assert!(find_path(&grid, walled, walled, strategy).is_none());
        }
    }

    #[test]
    fn out_of_bounds_endpoints_are_not_found() {
        let grid = open_grid(3, 3);
        assert!(find_path(&grid, GridPos::new(-1, 0), GridPos::new(1, 1), SearchStrategy::AStar)
            .is_none());
        assert!(find_path(&grid, GridPos::new(0, 0), GridPos::new(3, 1), SearchStrategy::AStar)
            .is_none());
    }

    #[test]
    fn failed_search_keeps_effort() {
        // End enclosed by a ring of walls.
        let ring = [
            GridPos::new(1, 2),
            GridPos::new(3, 2),
            GridPos::new(2, 1),
            GridPos::new(2, 3),
        ];
        let grid = Grid::with_walls(5, 5, ring).expect("grid");
        let trace = search(&grid, GridPos::new(0, 0), GridPos::new(2, 2), SearchStrategy::Dijkstra);
        assert!(trace.path.is_none());
        // Every passable cell outside the ring gets discovered.
        assert_eq!(trace.visited_count(), 25 - 4 - 1);
    }

    #[test]
    fn visited_cells_are_unique() {
        let grid = Grid::with_walls(6, 6, [GridPos::new(2, 2), GridPos::new(3, 3)]).expect("grid");
        for strategy in SearchStrategy::ALL {
            let result = find_path(&grid, GridPos::new(0, 0), GridPos::new(5, 5), strategy)
                .expect("path");
            let mut seen = result.visited_order.clone();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), result.visited_order.len(), "{strategy}");
        }
    }

    #[test]
    fn astar_expands_no_more_than_dijkstra() {
        let grid = open_grid(15, 15);
        let start = GridPos::new(0, 0);
        let end = GridPos::new(14, 14);
        let dijkstra = find_path(&grid, start, end, SearchStrategy::Dijkstra).expect("path");
        let astar = find_path(&grid, start, end, SearchStrategy::AStar).expect("path");
        assert_eq!(dijkstra.hop_count(), astar.hop_count());
        assert!(astar.visited_count <= dijkstra.visited_count);
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!("A*".parse::<SearchStrategy>(), Ok(SearchStrategy::AStar));
        assert_eq!("Dijkstra".parse::<SearchStrategy>(), Ok(SearchStrategy::Dijkstra));
        assert_eq!("greedy".parse::<SearchStrategy>(), Ok(SearchStrategy::Greedy));
        assert!("bfs".parse::<SearchStrategy>().is_err());
    }
}
