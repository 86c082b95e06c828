//! Task execution metrics (KPIs).
//!
//! Computes performance indicators over the tasks held by a task store.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Completed | Tasks in state Completed |
//! | Failed | Tasks in state Failed |
//! | Success Rate | completed / all tasks × 100 |
//! | Avg Execution | Mean (end - start) of completed tasks, seconds |
//! | By Type | Total / completed / failed per task type |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Task, TaskStatus, TaskType};

/// Execution counts for one task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTypeStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Execution performance indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// All top-level tasks.
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub cancelled_tasks: usize,
    /// Completed share of all tasks, in percent (0 when there are none).
    pub success_rate: f64,
    /// Mean execution time of completed tasks (s).
    pub average_execution_secs: f64,
    /// Per-type breakdown.
    pub by_task_type: BTreeMap<TaskType, TaskTypeStats>,
}

impl PerformanceMetrics {
    /// Computes metrics over top-level tasks.
    pub fn calculate(tasks: &[Task]) -> Self {
        let mut completed = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        let mut total_secs = 0.0;
        let mut timed = 0usize;
        let mut by_task_type: BTreeMap<TaskType, TaskTypeStats> = BTreeMap::new();

        for task in tasks {
            let stats = by_task_type.entry(task.task_type).or_default();
            stats.total += 1;

            match task.status() {
                TaskStatus::Completed => {
                    completed += 1;
                    stats.completed += 1;
                    if let Some(duration) = task.execution_duration() {
                        total_secs += duration.num_milliseconds() as f64 / 1000.0;
                        timed += 1;
                    }
                }
                TaskStatus::Failed => {
                    failed += 1;
                    stats.failed += 1;
                }
                TaskStatus::Cancelled => cancelled += 1,
                TaskStatus::Pending | TaskStatus::InProgress => {}
            }
        }

        let success_rate = if tasks.is_empty() {
            0.0
        } else {
            completed as f64 / tasks.len() as f64 * 100.0
        };

        let average_execution_secs = if timed == 0 {
            0.0
        } else {
            total_secs / timed as f64
        };

        Self {
            total_tasks: tasks.len(),
            completed_tasks: completed,
            failed_tasks: failed,
            cancelled_tasks: cancelled,
            success_rate,
            average_execution_secs,
            by_task_type,
        }
    }
}
