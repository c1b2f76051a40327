//! Multi-stop sequencing for riders carrying a batch of orders.
//!
//! Two modes:
//!
//! - **Nearest neighbor**: repeatedly visit the closest (Manhattan) remaining
//!   target. This is what the live tick uses.
//! - **Exact**: enumerate visiting orders and keep the cheapest Manhattan tour.
//!   Bounded by [`MAX_EXACT_TARGETS`]; larger inputs fall back to nearest
//!   neighbor.
//!
//! Both modes materialize legs through a [`RouteProvider`]. An unreachable
//! leg is skipped: the target is reported in [`PlannedRoute::skipped`] and the
//! current position does not advance.

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, GridPos};
use crate::routing::RouteProvider;

/// Largest target set the exact solver will enumerate.
pub const MAX_EXACT_TARGETS: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    #[default]
    NearestNeighbor,
    Exact,
}

/// A concatenated multi-leg route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlannedRoute {
    /// Target indices in visiting order (reachable targets only).
    pub visit_order: Vec<usize>,
    /// Cells to traverse, excluding the start cell.
    pub path: Vec<GridPos>,
    /// For each entry of `visit_order`, the number of path cells consumed on
    /// arrival. Zero means the target is the start cell.
    pub arrivals: Vec<usize>,
    /// Target indices whose leg could not be routed.
    pub skipped: Vec<usize>,
    /// Manhattan cost of the visited tour.
    pub tour_cost: u32,
}

impl PlannedRoute {
    pub fn is_empty(&self) -> bool {
        self.visit_order.is_empty()
    }
}

/// Manhattan cost of visiting `targets` in `order`, starting at `start`.
pub fn tour_cost(start: GridPos, targets: &[GridPos], order: &[usize]) -> u32 {
    let mut current = start;
    let mut cost = 0;
    for &idx in order {
        cost += current.manhattan(targets[idx]);
        current = targets[idx];
    }
    cost
}

/// Greedy nearest-neighbor tour. Ties go to the lowest target index.
pub fn nearest_neighbor_route(
    router: &dyn RouteProvider,
    grid: &Grid,
    start: GridPos,
    targets: &[GridPos],
) -> PlannedRoute {
    let mut remaining: Vec<usize> = (0..targets.len()).collect();
    let mut route = PlannedRoute::default();
    let mut current = start;

    while !remaining.is_empty() {
        let slot = remaining
            .iter()
            .enumerate()
            .min_by_key(|(_, idx)| (current.manhattan(targets[**idx]), **idx))
            .map(|(slot, _)| slot)
            .unwrap_or(0);
        let idx = remaining.remove(slot);
        if append_leg(router, grid, &mut route, current, targets[idx], idx) {
            current = targets[idx];
        }
    }

    route
}

/// Cheapest Manhattan visiting order, materialized through the router.
pub fn exact_route(
    router: &dyn RouteProvider,
    grid: &Grid,
    start: GridPos,
    targets: &[GridPos],
) -> PlannedRoute {
    if targets.len() > MAX_EXACT_TARGETS {
        return nearest_neighbor_route(router, grid, start, targets);
    }

    let order = best_visiting_order(start, targets);
    let mut route = PlannedRoute::default();
    let mut current = start;
    for idx in order {
        if append_leg(router, grid, &mut route, current, targets[idx], idx) {
            current = targets[idx];
        }
    }
    route
}

/// Plan a route in the requested mode.
pub fn plan_route(
    mode: RouteMode,
    router: &dyn RouteProvider,
    grid: &Grid,
    start: GridPos,
    targets: &[GridPos],
) -> PlannedRoute {
    match mode {
        RouteMode::NearestNeighbor => nearest_neighbor_route(router, grid, start, targets),
        RouteMode::Exact => exact_route(router, grid, start, targets),
    }
}

/// Exhaustive permutation search over Manhattan tour cost. The first
/// permutation (in lexicographic index order) wins ties.
pub fn best_visiting_order(start: GridPos, targets: &[GridPos]) -> Vec<usize> {
    struct Search<'a> {
        targets: &'a [GridPos],
        used: Vec<bool>,
        current: Vec<usize>,
        best: Vec<usize>,
        best_cost: u32,
    }

    impl Search<'_> {
        fn recurse(&mut self, at: GridPos, cost: u32) {
            if cost >= self.best_cost {
                return;
            }
            if self.current.len() == self.targets.len() {
                self.best_cost = cost;
                self.best = self.current.clone();
                return;
            }
            for idx in 0..self.targets.len() {
                if self.used[idx] {
                    continue;
                }
                self.used[idx] = true;
                self.current.push(idx);
                let next = self.targets[idx];
                self.recurse(next, cost + at.manhattan(next));
                self.current.pop();
                self.used[idx] = false;
            }
        }
    }

    if targets.is_empty() {
        return Vec::new();
    }

    let mut search = Search {
        targets,
        used: vec![false; targets.len()],
        current: Vec::with_capacity(targets.len()),
        best: (0..targets.len()).collect(),
        best_cost: u32::MAX,
    };
    search.recurse(start, 0);
    search.best
}

fn append_leg(
    router: &dyn RouteProvider,
    grid: &Grid,
    route: &mut PlannedRoute,
    from: GridPos,
    to: GridPos,
    idx: usize,
) -> bool {
    let Some(leg) = router.route(grid, from, to) else {
        route.skipped.push(idx);
        return false;
    };
    route.path.extend(leg.into_iter().skip(1));
    route.visit_order.push(idx);
    route.arrivals.push(route.path.len());
    route.tour_cost += from.manhattan(to);
    true
}
