//! Grid model: a fixed rectangle of 4-connected cells with a mutable wall set.
//!
//! Cells are addressed by [`GridPos`] (row, column). Walls may only be edited
//! between ticks; every edit bumps the grid revision so cached routes computed
//! against an older wall layout are never reused.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default grid side used when no size is configured.
pub const DEFAULT_GRID_SIZE: i32 = 20;

/// A cell on the grid. Plain value type; equality is by coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub row: i32,
    pub col: i32,
}

impl GridPos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// |Δrow| + |Δcol|.
    pub fn manhattan(self, other: GridPos) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// True when `other` is exactly one orthogonal step away.
    pub fn is_adjacent(self, other: GridPos) -> bool {
        self.manhattan(other) == 1
    }

    /// Orthogonal neighbors in fixed expansion order: up, down, left, right.
    pub fn neighbors(self) -> [GridPos; 4] {
        [
            GridPos::new(self.row - 1, self.col),
            GridPos::new(self.row + 1, self.col),
            GridPos::new(self.row, self.col - 1),
            GridPos::new(self.row, self.col + 1),
        ]
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

impl FromStr for GridPos {
    type Err = GridError;

    /// Parses `"row,col"` (surrounding parentheses and spaces are tolerated).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (row, col) = trimmed
            .split_once(',')
            .ok_or_else(|| GridError::ParsePosition(s.to_string()))?;
        let row = row
            .trim()
            .parse()
            .map_err(|_| GridError::ParsePosition(s.to_string()))?;
        let col = col
            .trim()
            .parse()
            .map_err(|_| GridError::ParsePosition(s.to_string()))?;
        Ok(GridPos::new(row, col))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions must be at least 1x1 (got {rows}x{cols})")]
    InvalidDimensions { rows: i32, cols: i32 },
    #[error("position {0} is outside the grid")]
    OutOfBounds(GridPos),
    #[error("invalid position '{0}', expected 'row,col'")]
    ParsePosition(String),
}

/// Static occupancy surface shared by the whole simulation.
///
/// Invariant: every wall lies inside the grid bounds.
#[derive(Debug, Clone, PartialEq, Eq, Resource)]
pub struct Grid {
    rows: i32,
    cols: i32,
    walls: BTreeSet<GridPos>,
    revision: u64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_SIZE,
            cols: DEFAULT_GRID_SIZE,
            walls: BTreeSet::new(),
            revision: 0,
        }
    }
}

impl Grid {
    pub fn new(rows: i32, cols: i32) -> Result<Self, GridError> {
        if rows < 1 || cols < 1 {
            return Err(GridError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            walls: BTreeSet::new(),
            revision: 0,
        })
    }

    /// Build a grid and wall it in one go. Walls outside the bounds are rejected.
    pub fn with_walls(
        rows: i32,
        cols: i32,
        walls: impl IntoIterator<Item = GridPos>,
    ) -> Result<Self, GridError> {
        let mut grid = Self::new(rows, cols)?;
        for wall in walls {
            grid.set_wall(wall, true)?;
        }
        Ok(grid)
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Bumped on every wall edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols
    }

    /// Row-major index of `pos`, or `None` when out of bounds.
    pub fn index(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.row as usize * self.cols as usize + pos.col as usize)
    }

    pub fn is_wall(&self, pos: GridPos) -> bool {
        self.walls.contains(&pos)
    }

    /// In bounds and not a wall.
    pub fn is_passable(&self, pos: GridPos) -> bool {
        self.in_bounds(pos) && !self.is_wall(pos)
    }

    /// Flip the wall state of `pos`, returning whether it is now a wall.
    pub fn toggle_wall(&mut self, pos: GridPos) -> Result<bool, GridError> {
        let now_wall = !self.is_wall(pos);
        self.set_wall(pos, now_wall)?;
        Ok(now_wall)
    }

    pub fn set_wall(&mut self, pos: GridPos, wall: bool) -> Result<(), GridError> {
        if !self.in_bounds(pos) {
            return Err(GridError::OutOfBounds(pos));
        }
        let changed = if wall {
            self.walls.insert(pos)
        } else {
            self.walls.remove(&pos)
        };
        if changed {
            self.revision += 1;
        }
        Ok(())
    }

    /// Walls in row-major order.
    pub fn walls(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.walls.iter().copied()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    /// Passable orthogonal neighbors of `pos`, in expansion order.
    pub fn passable_neighbors(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        pos.neighbors()
            .into_iter()
            .filter(move |next| self.is_passable(*next))
    }

    /// Every passable cell in row-major order.
    pub fn passable_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.cols)
                .map(move |col| GridPos::new(row, col))
                .filter(move |pos| !self.is_wall(*pos))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_dimensions() {
        assert_eq!(
            Grid::new(0, 5),
            Err(GridError::InvalidDimensions { rows: 0, cols: 5 })
        );
        assert!(Grid::new(1, 1).is_ok());
    }

    #[test]
    fn toggle_wall_flips_state_and_bumps_revision() {
        let mut grid = Grid::new(3, 3).expect("grid");
        let cell = GridPos::new(1, 1);
        assert_eq!(grid.toggle_wall(cell), Ok(true));
        assert!(grid.is_wall(cell));
        assert_eq!(grid.revision(), 1);
        assert_eq!(grid.toggle_wall(cell), Ok(false));
        assert!(!grid.is_wall(cell));
        assert_eq!(grid.revision(), 2);
    }

    #[test]
    fn walls_must_be_in_bounds() {
        let mut grid = Grid::new(2, 2).expect("grid");
        let outside = GridPos::new(2, 0);
        assert_eq!(grid.set_wall(outside, true), Err(GridError::OutOfBounds(outside)));
        assert_eq!(grid.wall_count(), 0);
        assert_eq!(grid.revision(), 0);
    }

    #[test]
    fn passable_neighbors_skip_walls_and_edges() {
        let grid = Grid::with_walls(3, 3, [GridPos::new(0, 1)]).expect("grid");
        let corner: Vec<_> = grid.passable_neighbors(GridPos::new(0, 0)).collect();
        assert_eq!(corner, vec![GridPos::new(1, 0)]);
    }

    #[test]
    fn parses_row_col_pairs() {
        assert_eq!("3,4".parse::<GridPos>(), Ok(GridPos::new(3, 4)));
        assert_eq!(" (0, 10) ".parse::<GridPos>(), Ok(GridPos::new(0, 10)));
        assert!("3;4".parse::<GridPos>().is_err());
    }

    #[test]
    fn manhattan_is_symmetric() {
        let a = GridPos::new(0, 0);
        let b = GridPos::new(3, -4);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(b.manhattan(a), 7);
        assert!(GridPos::new(1, 1).is_adjacent(GridPos::new(1, 2)));
        assert!(!GridPos::new(1, 1).is_adjacent(GridPos::new(2, 2)));
    }
}
