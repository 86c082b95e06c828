//! Grid path planning.
//!
//! Shortest routes over a bounded, 4-connected, uniform-cost grid with
//! static obstacles. Each query is independent and works on a snapshot of
//! the obstacle set.
//!
//! # Algorithm
//! A* with the Manhattan heuristic, which is admissible and consistent on
//! this grid, so returned routes are shortest. Frontier ties on `f` are
//! broken by insertion order, never by coordinates, so routes are
//! reproducible.
//!
//! # Reference
//! Hart, Nilsson & Raphael (1968), "A Formal Basis for the Heuristic
//! Determination of Minimum Cost Paths"

mod astar;
mod grid;

pub use astar::find_path;
pub use grid::GridMap;
