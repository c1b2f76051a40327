//! Side-by-side run of every search strategy over the same multi-waypoint
//! route. Read-only; used by visualizers and the CLI `compare` command.

use std::time::Duration;

use serde::Serialize;

use crate::grid::{Grid, GridPos};
use crate::search::{search, SearchStrategy};

/// Effort and result of one strategy over the whole leg sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyComparison {
    pub strategy: SearchStrategy,
    /// Concatenated route, or `None` if any leg was unreachable.
    pub path: Option<Vec<GridPos>>,
    pub visited_count: usize,
    pub visited_order: Vec<GridPos>,
    #[serde(serialize_with = "serialize_micros")]
    pub execution_time: Duration,
}

impl StrategyComparison {
    pub fn hop_count(&self) -> Option<usize> {
        self.path.as_ref().map(|path| path.len().saturating_sub(1))
    }
}

fn serialize_micros<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_micros().min(u128::from(u64::MAX)) as u64)
}

/// Run Dijkstra, Greedy and A* over `start → waypoints… → end`.
///
/// Legs are concatenated without repeating the shared cell. Visited counts,
/// visited orders and times are summed across legs. A strategy stops at its
/// first unreachable leg and reports `path = None` with the effort spent so
/// far.
pub fn compare_algorithms(
    grid: &Grid,
    start: GridPos,
    end: GridPos,
    waypoints: &[GridPos],
) -> Vec<StrategyComparison> {
    let stops: Vec<GridPos> = std::iter::once(start)
        .chain(waypoints.iter().copied())
        .chain(std::iter::once(end))
        .collect();

    SearchStrategy::ALL
        .iter()
        .map(|&strategy| run_strategy(grid, &stops, strategy))
        .collect()
}

fn run_strategy(grid: &Grid, stops: &[GridPos], strategy: SearchStrategy) -> StrategyComparison {
    let mut comparison = StrategyComparison {
        strategy,
        path: Some(vec![stops[0]]),
        visited_count: 0,
        visited_order: Vec::new(),
        execution_time: Duration::ZERO,
    };

    for leg in stops.windows(2) {
        let trace = search(grid, leg[0], leg[1], strategy);
        comparison.visited_count += trace.visited_count();
        comparison.execution_time += trace.elapsed;
        comparison.visited_order.extend(trace.visited_order);
        match (trace.path, comparison.path.as_mut()) {
            (Some(leg_path), Some(path)) => path.extend(leg_path.into_iter().skip(1)),
            _ => {
                comparison.path = None;
                break;
            }
        }
    }
    comparison
}
