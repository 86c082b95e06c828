//! Transport task model.
//!
//! A task is a unit of yard work: a ship transport, an internal transfer,
//! a crane loading/unloading, or an equipment move. Tasks may own an
//! ordered tree of sub-tasks.
//!
//! # Lifecycle
//! `Pending → InProgress → {Completed, Failed}`, and `Pending → Cancelled`.
//! Completed, Failed and Cancelled are terminal; no transition moves a task
//! backward. Assigning equipment keeps the task Pending.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Position;
use crate::error::{ErrorKind, Result, YardError};

/// Kind of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskType {
    ShipTransport,
    InternalTransfer,
    Loading,
    Unloading,
    MoveEquipment,
}

impl TaskType {
    /// Every task type, in declaration order.
    pub const ALL: [TaskType; 5] = [
        TaskType::ShipTransport,
        TaskType::InternalTransfer,
        TaskType::Loading,
        TaskType::Unloading,
        TaskType::MoveEquipment,
    ];
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Typed task parameters and outcome notes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Product lines (product id → quantity), iterated in id order.
    pub products: BTreeMap<String, u32>,
    /// Transfer source.
    pub source_warehouse_id: Option<String>,
    /// Transfer destination.
    pub target_warehouse_id: Option<String>,
    /// Originating ship plan.
    pub ship_plan_id: Option<String>,
    pub ship_name: Option<String>,
    pub destination: Option<String>,
    /// Destination cell of a move task.
    pub target_position: Option<Position>,
    /// Why the task failed.
    pub failure_reason: Option<String>,
    /// Category of the failure.
    pub failure_kind: Option<ErrorKind>,
}

impl TaskMetadata {
    /// Metadata carrying a single product line.
    pub fn single_line(product_id: impl Into<String>, quantity: u32) -> Self {
        let mut products = BTreeMap::new();
        products.insert(product_id.into(), quantity);
        Self {
            products,
            ..Default::default()
        }
    }
}

/// A unit of yard work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier. Empty = generated when stored.
    pub id: String,
    pub task_type: TaskType,
    /// Scheduling priority (higher = more urgent).
    pub priority: i32,
    /// Informational deadline; orders scheduling, never expires a task.
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Ordered children, owned by this task.
    pub sub_tasks: Vec<Task>,
    pub metadata: TaskMetadata,
    status: TaskStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    assigned_equipment: Option<String>,
}

impl Task {
    /// Creates a pending task with priority 1.
    pub fn new(id: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: id.into(),
            task_type,
            priority: 1,
            deadline: None,
            created_at: Utc::now(),
            sub_tasks: Vec::new(),
            metadata: TaskMetadata::default(),
            status: TaskStatus::Pending,
            start_time: None,
            end_time: None,
            assigned_equipment: None,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the metadata.
    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Appends a sub-task.
    pub fn with_sub_task(mut self, sub_task: Task) -> Self {
        self.sub_tasks.push(sub_task);
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn assigned_equipment(&self) -> Option<&str> {
        self.assigned_equipment.as_deref()
    }

    /// Wall time between start and end, once both are recorded.
    pub fn execution_duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Number of tasks in this tree, this one included.
    pub fn tree_size(&self) -> usize {
        1 + self.sub_tasks.iter().map(Task::tree_size).sum::<usize>()
    }

    /// Records the equipment assigned to this task. The task stays Pending.
    pub(crate) fn assign(&mut self, equipment_id: &str) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.conflict("assign equipment to"));
        }
        if let Some(current) = &self.assigned_equipment {
            return Err(YardError::StateConflict(format!(
                "task {} already has equipment {current}",
                self.id
            )));
        }
        self.assigned_equipment = Some(equipment_id.to_string());
        Ok(())
    }

    /// Pending → InProgress.
    pub(crate) fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.conflict("start"));
        }
        self.status = TaskStatus::InProgress;
        self.start_time = Some(now);
        Ok(())
    }

    /// InProgress → Completed.
    pub(crate) fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != TaskStatus::InProgress {
            return Err(self.conflict("complete"));
        }
        self.status = TaskStatus::Completed;
        self.end_time = Some(now);
        Ok(())
    }

    /// InProgress → Failed, keeping the cause in the metadata.
    pub(crate) fn fail(&mut self, now: DateTime<Utc>, cause: &YardError) -> Result<()> {
        if self.status != TaskStatus::InProgress {
            return Err(self.conflict("fail"));
        }
        self.status = TaskStatus::Failed;
        self.end_time = Some(now);
        self.metadata.failure_reason = Some(cause.to_string());
        self.metadata.failure_kind = Some(cause.kind());
        Ok(())
    }

    /// Pending → Cancelled.
    pub(crate) fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.conflict("cancel"));
        }
        self.status = TaskStatus::Cancelled;
        self.end_time = Some(now);
        Ok(())
    }

    fn conflict(&self, action: &str) -> YardError {
        YardError::StateConflict(format!(
            "cannot {action} task {} in state {:?}",
            self.id, self.status
        ))
    }
}
