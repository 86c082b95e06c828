//! Bounded grid with obstacles.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::astar;
use crate::models::Position;

/// Neighbor offsets: up, right, down, left.
pub(crate) const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// A `width × height` grid; cell `(x, y)` is inside iff
/// `0 ≤ x < width` and `0 ≤ y < height`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMap {
    width: i32,
    height: i32,
    obstacles: HashSet<Position>,
}

impl GridMap {
    /// Creates an obstacle-free grid.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            obstacles: HashSet::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether the cell lies inside the grid.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    #[inline]
    pub fn is_obstacle(&self, position: Position) -> bool {
        self.obstacles.contains(&position)
    }

    /// Inside the grid and not blocked.
    #[inline]
    pub fn is_free(&self, position: Position) -> bool {
        self.contains(position) && !self.is_obstacle(position)
    }

    /// Blocks a cell. Returns `false` if it was already blocked.
    pub fn add_obstacle(&mut self, position: Position) -> bool {
        self.obstacles.insert(position)
    }

    /// Unblocks a cell. Returns `false` if it was not blocked.
    pub fn remove_obstacle(&mut self, position: Position) -> bool {
        self.obstacles.remove(&position)
    }

    pub fn obstacles(&self) -> &HashSet<Position> {
        &self.obstacles
    }

    /// Shortest route from `start` to `goal`, both inclusive.
    ///
    /// Empty when no route exists or either endpoint is blocked or outside.
    pub fn find_path(&self, start: Position, goal: Position) -> Vec<Position> {
        astar::find_path((self.width, self.height), &self.obstacles, start, goal)
    }

    /// Like [`GridMap::find_path`], treating `start` as free even if blocked.
    ///
    /// Used to route equipment away from the cell it occupies.
    pub fn find_path_from_occupied(&self, start: Position, goal: Position) -> Vec<Position> {
        if !self.is_obstacle(start) {
            return self.find_path(start, goal);
        }
        let mut obstacles = self.obstacles.clone();
        obstacles.remove(&start);
        astar::find_path((self.width, self.height), &obstacles, start, goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let grid = GridMap::new(3, 2);
        assert!(grid.contains(Position::new(0, 0)));
        assert!(grid.contains(Position::new(2, 1)));
        assert!(!grid.contains(Position::new(3, 0)));
        assert!(!grid.contains(Position::new(0, -1)));
    }

    #[test]
    fn test_obstacle_toggle() {
        let mut grid = GridMap::new(2, 2);
        let p = Position::new(1, 1);
        assert!(grid.add_obstacle(p));
        assert!(!grid.add_obstacle(p));
        assert!(!grid.is_free(p));
        assert!(grid.remove_obstacle(p));
        assert!(grid.is_free(p));
    }

    #[test]
    fn test_route_from_occupied_cell() {
        let mut grid = GridMap::new(4, 1);
        let start = Position::new(0, 0);
        grid.add_obstacle(start);

        assert!(grid.find_path(start, Position::new(3, 0)).is_empty());
        let route = grid.find_path_from_occupied(start, Position::new(3, 0));
        assert_eq!(route.len(), 4);
        assert!(grid.is_obstacle(start));
    }
}
