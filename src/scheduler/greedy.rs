//! Greedy single-pass equipment dispatcher.
//!
//! # Algorithm
//!
//! 1. Take pending tasks that hold no equipment yet.
//! 2. Sort by priority (descending), then deadline (ascending, none last);
//!    the sort is stable, so remaining ties keep creation order.
//! 3. For each task, collect idle equipment whose capability set covers
//!    the task type. Skip the task if there is none.
//! 4. Pick the candidate closest to the task location (Manhattan), ties
//!    broken by ascending equipment id.
//! 5. Claim it (Idle → Busy) and record it on the task. Claimed equipment
//!    is no longer idle, so later tasks in the same pass cannot take it.
//!
//! Not globally optimal: decisions are committed immediately and never
//! revisited. Tasks left without equipment stay Pending for the next pass.
//!
//! # Complexity
//! O(n log n + n * m) where n = pending tasks, m = equipment.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Equipment, Position, Task};
use crate::registry::ResourceRegistry;
use crate::store::TaskStore;

/// One task-to-equipment decision made by a scheduling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub task_id: String,
    pub equipment_id: String,
    /// Manhattan distance from the equipment to the task location.
    pub distance: u32,
}

/// Priority-driven, nearest-equipment greedy scheduler.
///
/// # Example
///
/// ```
/// use u_yard::models::{Equipment, Position, Task, TaskType};
/// use u_yard::planner::GridMap;
/// use u_yard::registry::ResourceRegistry;
/// use u_yard::scheduler::GreedyScheduler;
/// use u_yard::store::TaskStore;
///
/// let mut registry = ResourceRegistry::new(GridMap::new(10, 10));
/// registry
///     .add_equipment(Equipment::frame_truck("T1", "Truck", Position::new(1, 1)))
///     .unwrap();
/// let mut store = TaskStore::new();
/// store.insert(Task::new("J1", TaskType::ShipTransport)).unwrap();
///
/// let dispatches = GreedyScheduler::new().dispatch(&mut store, &mut registry);
/// assert_eq!(dispatches.len(), 1);
/// assert_eq!(dispatches[0].equipment_id, "T1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct GreedyScheduler;

impl GreedyScheduler {
    /// Creates a new scheduler.
    pub fn new() -> Self {
        Self
    }

    /// Pending, unassigned tasks in dispatch order.
    pub fn order<'a>(&self, store: &'a TaskStore) -> Vec<&'a Task> {
        let mut tasks: Vec<&Task> = store
            .pending()
            .filter(|t| t.assigned_equipment().is_none())
            .collect();
        tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| deadline_key(a).cmp(&deadline_key(b)))
        });
        tasks
    }

    /// Where the work of a task happens, if its metadata says so.
    pub fn task_location(&self, task: &Task, registry: &ResourceRegistry) -> Option<Position> {
        let meta = &task.metadata;
        let warehouse_id = meta
            .source_warehouse_id
            .as_deref()
            .or(meta.target_warehouse_id.as_deref());
        if let Some(w) = warehouse_id.and_then(|id| registry.warehouse(id)) {
            return Some(w.position);
        }
        meta.target_position
    }

    /// Nearest idle equipment able to run `task`, with its distance.
    pub fn select_equipment<'a>(
        &self,
        task: &Task,
        registry: &'a ResourceRegistry,
    ) -> Option<(&'a Equipment, u32)> {
        let location = self.task_location(task, registry);
        let mut best: Option<(&Equipment, u32)> = None;

        // Ascending id order; strict `<` keeps the smallest id on ties.
        for equipment in registry.all_equipment() {
            if !equipment.is_idle() || !equipment.supports(task.task_type) {
                continue;
            }
            let distance = location.map_or(0, |loc| equipment.position().manhattan(&loc));
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((equipment, distance));
            }
        }

        best
    }

    /// Runs one scheduling pass, claiming equipment as it goes.
    pub fn dispatch(&self, store: &mut TaskStore, registry: &mut ResourceRegistry) -> Vec<Dispatch> {
        let order: Vec<String> = self.order(store).iter().map(|t| t.id.clone()).collect();
        let mut dispatches = Vec::new();

        for task_id in order {
            let Some(task) = store.get(&task_id) else {
                continue;
            };
            let Some((equipment, distance)) = self.select_equipment(task, registry) else {
                debug!(task_id = %task_id, task_type = ?task.task_type, "no idle equipment, deferred");
                continue;
            };
            let equipment_id = equipment.id.clone();

            if registry.claim_equipment(&equipment_id, &task_id).is_err() {
                continue;
            }
            let assigned = store
                .get_mut(&task_id)
                .and_then(|task| task.assign(&equipment_id));
            if assigned.is_err() {
                // Undo the claim so the equipment is not left Busy.
                let _ = registry.release_equipment(&equipment_id);
                continue;
            }

            dispatches.push(Dispatch {
                task_id,
                equipment_id,
                distance,
            });
        }

        debug!(dispatched = dispatches.len(), "scheduling pass finished");
        dispatches
    }
}

fn deadline_key(task: &Task) -> (bool, Option<chrono::DateTime<chrono::Utc>>) {
    (task.deadline.is_none(), task.deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, TaskMetadata, TaskType, Warehouse};
    use crate::planner::GridMap;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;

    fn registry() -> ResourceRegistry {
        let mut r = ResourceRegistry::new(GridMap::new(20, 20));
        r.add_product(Product::new("P1", "Steel", 10.0, 1.0)).unwrap();
        r.add_warehouse(Warehouse::terminal("W1", "Terminal", Position::new(0, 0), 100.0))
            .unwrap();
        r.add_warehouse(Warehouse::product("W2", "Store", Position::new(10, 10), 100.0))
            .unwrap();
        r
    }

    fn transfer(id: &str, source: &str, target: &str) -> Task {
        let mut meta = TaskMetadata::single_line("P1", 1);
        meta.source_warehouse_id = Some(source.into());
        meta.target_warehouse_id = Some(target.into());
        Task::new(id, TaskType::InternalTransfer).with_metadata(meta)
    }

    #[test]
    fn test_priority_then_deadline_then_creation() {
        let now = Utc::now();
        let mut store = TaskStore::new();
        store
            .insert(Task::new("late", TaskType::Loading).with_deadline(now + Duration::hours(2)))
            .unwrap();
        store.insert(Task::new("none", TaskType::Loading)).unwrap();
        store
            .insert(Task::new("soon", TaskType::Loading).with_deadline(now + Duration::hours(1)))
            .unwrap();
        store
            .insert(Task::new("urgent", TaskType::Loading).with_priority(5))
            .unwrap();
        store.insert(Task::new("none2", TaskType::Loading)).unwrap();

        let ids: Vec<_> = GreedyScheduler::new()
            .order(&store)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["urgent", "soon", "late", "none", "none2"]);
    }

    #[test]
    fn test_nearest_equipment_wins() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "Far", Position::new(15, 15)))
            .unwrap();
        r.add_equipment(Equipment::frame_truck("T2", "Near", Position::new(1, 1)))
            .unwrap();
        let mut store = TaskStore::new();
        store.insert(transfer("J1", "W1", "W2")).unwrap();

        let d = GreedyScheduler::new().dispatch(&mut store, &mut r);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].equipment_id, "T2");
        assert_eq!(d[0].distance, 2);
    }

    #[test]
    fn test_distance_tie_breaks_by_id() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("TB", "B", Position::new(0, 2)))
            .unwrap();
        r.add_equipment(Equipment::frame_truck("TA", "A", Position::new(2, 0)))
            .unwrap();
        let mut store = TaskStore::new();
        store.insert(transfer("J1", "W1", "W2")).unwrap();

        let d = GreedyScheduler::new().dispatch(&mut store, &mut r);
        assert_eq!(d[0].equipment_id, "TA");
    }

    #[test]
    fn test_capability_filter_and_deferral() {
        let mut r = registry();
        r.add_equipment(Equipment::crane("C1", "Crane", Position::new(0, 1), "W1"))
            .unwrap();
        let mut store = TaskStore::new();
        store.insert(transfer("J1", "W1", "W2")).unwrap();
        store.insert(Task::new("J2", TaskType::Loading)).unwrap();

        let d = GreedyScheduler::new().dispatch(&mut store, &mut r);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].task_id, "J2");
        assert_eq!(store.get("J1").unwrap().assigned_equipment(), None);
    }

    #[test]
    fn test_no_equipment_claimed_twice() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "A", Position::new(1, 0)))
            .unwrap();
        r.add_equipment(Equipment::frame_truck("T2", "B", Position::new(2, 0)))
            .unwrap();
        let mut store = TaskStore::new();
        for i in 0..4 {
            store.insert(transfer(&format!("J{i}"), "W1", "W2")).unwrap();
        }

        let d = GreedyScheduler::new().dispatch(&mut store, &mut r);
        assert_eq!(d.len(), 2);
        let used: HashSet<_> = d.iter().map(|x| x.equipment_id.as_str()).collect();
        assert_eq!(used.len(), 2);
        assert_eq!(d[0].task_id, "J0");
        assert_eq!(d[1].task_id, "J1");

        // Second pass finds nothing idle.
        assert!(GreedyScheduler::new().dispatch(&mut store, &mut r).is_empty());
    }

    #[test]
    fn test_already_assigned_task_skipped() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "A", Position::new(1, 0)))
            .unwrap();
        r.add_equipment(Equipment::frame_truck("T2", "B", Position::new(2, 0)))
            .unwrap();
        let mut store = TaskStore::new();
        store.insert(transfer("J1", "W1", "W2")).unwrap();
        r.claim_equipment("T2", "J1").unwrap();
        store.get_mut("J1").unwrap().assign("T2").unwrap();

        let d = GreedyScheduler::new().dispatch(&mut store, &mut r);
        assert!(d.is_empty());
        assert!(r.equipment("T1").unwrap().is_idle());
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let mut r = registry();
            for (id, x, y) in [("T3", 4, 3), ("T1", 9, 3), ("T2", 3, 4)] {
                r.add_equipment(Equipment::frame_truck(id, id, Position::new(x, y)))
                    .unwrap();
            }
            let mut store = TaskStore::new();
            store.insert(transfer("J1", "W2", "W1")).unwrap();
            store.insert(transfer("J2", "W1", "W2")).unwrap();
            store
                .insert(transfer("J3", "W1", "W2").with_priority(3))
                .unwrap();
            (r, store)
        };

        let (mut r1, mut s1) = build();
        let (mut r2, mut s2) = build();
        let a = GreedyScheduler::new().dispatch(&mut s1, &mut r1);
        let b = GreedyScheduler::new().dispatch(&mut s2, &mut r2);
        assert_eq!(a, b);
        assert_eq!(a[0].task_id, "J3");
        assert_eq!(a[0].equipment_id, "T2");
    }
}
