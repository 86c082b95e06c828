//! Task store.
//!
//! Holds top-level tasks in creation order, plus ship plans. Creation order
//! is the final tie-break of the scheduler, so it is kept explicitly rather
//! than derived from timestamps.

use std::collections::{BTreeMap, HashMap};

use crate::error::{EntityKind, Result, YardError};
use crate::models::id::ensure_id;
use crate::models::{ShipPlan, Task, TaskStatus};

/// Tasks and ship plans.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    ship_plans: BTreeMap<String, ShipPlan>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a task tree, generating ids where missing. Returns the root id.
    pub fn insert(&mut self, mut task: Task) -> Result<String> {
        assign_ids(&mut task);
        if self.index.contains_key(&task.id) {
            return Err(YardError::StateConflict(format!(
                "task {} already exists",
                task.id
            )));
        }
        let id = task.id.clone();
        self.index.insert(id.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    pub fn get_or_err(&self, id: &str) -> Result<&Task> {
        self.get(id)
            .ok_or_else(|| YardError::not_found(EntityKind::Task, id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Result<&mut Task> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.tasks[i]),
            None => Err(YardError::not_found(EntityKind::Task, id)),
        }
    }

    /// Top-level tasks in creation order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Pending tasks in creation order.
    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Pending)
    }

    pub fn count_by_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status() == status).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stores a ship plan, generating an id if it has none.
    pub fn add_ship_plan(&mut self, mut plan: ShipPlan) -> Result<String> {
        ensure_id(&mut plan.id, "SP");
        if self.ship_plans.contains_key(&plan.id) {
            return Err(YardError::StateConflict(format!(
                "ship plan {} already exists",
                plan.id
            )));
        }
        let id = plan.id.clone();
        self.ship_plans.insert(id.clone(), plan);
        Ok(id)
    }

    pub fn ship_plan(&self, id: &str) -> Option<&ShipPlan> {
        self.ship_plans.get(id)
    }

    /// Ship plans in ascending id order.
    pub fn ship_plans(&self) -> impl Iterator<Item = &ShipPlan> {
        self.ship_plans.values()
    }
}

fn assign_ids(task: &mut Task) {
    ensure_id(&mut task.id, "T");
    for sub in &mut task.sub_tasks {
        assign_ids(sub);
    }
}
