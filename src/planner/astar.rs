//! A* search.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::grid::DIRECTIONS;
use crate::models::Position;

/// Open-set entry. Ordered by `f`, then by insertion sequence; the
/// position never takes part in the comparison.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    f: u32,
    seq: u64,
    position: Position,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we pop the smallest (f, seq).
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Shortest 4-connected route on a `bounds = (width, height)` grid.
///
/// Returns the cells from `start` to `goal` inclusive, or an empty vector
/// when no route exists or either endpoint is blocked or out of bounds.
/// An empty result is a normal outcome, not a fault.
///
/// # Complexity
/// O(N log N) for N = width × height.
pub fn find_path(
    bounds: (i32, i32),
    obstacles: &HashSet<Position>,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    let (width, height) = bounds;
    let is_free = |p: Position| {
        (0..width).contains(&p.x) && (0..height).contains(&p.y) && !obstacles.contains(&p)
    };

    if !is_free(start) || !is_free(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<Position, u32> = HashMap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut closed: HashSet<Position> = HashSet::new();
    let mut seq: u64 = 0;

    g_score.insert(start, 0);
    open.push(Frontier {
        f: start.manhattan(&goal),
        seq,
        position: start,
    });

    while let Some(Frontier {
        position: current, ..
    }) = open.pop()
    {
        if current == goal {
            return reconstruct(&came_from, start, goal);
        }
        if !closed.insert(current) {
            continue; // stale entry
        }
        let Some(&g_current) = g_score.get(&current) else {
            continue;
        };

        for (dx, dy) in DIRECTIONS {
            let next = Position::new(current.x + dx, current.y + dy);
            if !is_free(next) || closed.contains(&next) {
                continue;
            }
            let tentative = g_current + 1;
            if g_score.get(&next).map_or(true, |&known| tentative < known) {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                seq += 1;
                open.push(Frontier {
                    f: tentative + next.manhattan(&goal),
                    seq,
                    position: next,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct(
    came_from: &HashMap<Position, Position>,
    start: Position,
    goal: Position,
) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}
