//! Status and report queries.
//!
//! Read-only snapshots of the yard, shaped for a presentation layer to
//! serialize as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::audit::AuditLog;
use crate::models::{EquipmentStatus, TaskStatus, TaskType};
use crate::registry::ResourceRegistry;
use crate::scheduler::{PerformanceMetrics, TaskTypeStats};
use crate::store::TaskStore;

/// Equipment count per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentStatusCounts {
    pub idle: usize,
    pub busy: usize,
    pub maintenance: usize,
    pub error: usize,
}

impl EquipmentStatusCounts {
    fn add(&mut self, status: EquipmentStatus) {
        match status {
            EquipmentStatus::Idle => self.idle += 1,
            EquipmentStatus::Busy => self.busy += 1,
            EquipmentStatus::Maintenance => self.maintenance += 1,
            EquipmentStatus::Error => self.error += 1,
        }
    }
}

/// Counts and utilization at a glance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub total_products: usize,
    pub total_warehouses: usize,
    pub total_equipment: usize,
    pub total_tasks: usize,
    /// Tasks in progress.
    pub active_tasks: usize,
    pub pending_tasks: usize,
    pub equipment_status: EquipmentStatusCounts,
    /// Warehouse id → utilization in percent.
    pub warehouse_utilization: BTreeMap<String, f64>,
}

impl SystemStatus {
    pub fn collect(registry: &ResourceRegistry, store: &TaskStore) -> Self {
        let mut equipment_status = EquipmentStatusCounts::default();
        for equipment in registry.all_equipment() {
            equipment_status.add(equipment.status());
        }

        Self {
            total_products: registry.product_count(),
            total_warehouses: registry.warehouse_count(),
            total_equipment: registry.equipment_count(),
            total_tasks: store.len(),
            active_tasks: store.count_by_status(TaskStatus::InProgress),
            pending_tasks: store.count_by_status(TaskStatus::Pending),
            equipment_status,
            warehouse_utilization: registry
                .warehouses()
                .map(|w| (w.id.clone(), w.utilization_rate()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseUsage {
    pub name: String,
    pub utilization_rate: f64,
    pub available_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentUsage {
    pub name: String,
    pub status: EquipmentStatus,
    pub current_task_id: Option<String>,
    pub current_load: f64,
}

/// Per-entity utilization, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub warehouses: BTreeMap<String, WarehouseUsage>,
    pub equipment: BTreeMap<String, EquipmentUsage>,
}

impl ResourceUtilization {
    pub fn collect(registry: &ResourceRegistry) -> Self {
        let warehouses = registry
            .warehouses()
            .map(|w| {
                let usage = WarehouseUsage {
                    name: w.name.clone(),
                    utilization_rate: w.utilization_rate(),
                    available_capacity: w.available_capacity(),
                };
                (w.id.clone(), usage)
            })
            .collect();
        let equipment = registry
            .all_equipment()
            .map(|e| {
                let usage = EquipmentUsage {
                    name: e.name.clone(),
                    status: e.status(),
                    current_task_id: e.current_task_id().map(str::to_string),
                    current_load: e.current_load(),
                };
                (e.id.clone(), usage)
            })
            .collect();
        Self {
            warehouses,
            equipment,
        }
    }
}

/// Full yard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YardReport {
    pub system_overview: SystemStatus,
    pub performance: PerformanceMetrics,
    pub resource_utilization: ResourceUtilization,
    /// Most recent audit records, oldest first.
    pub recent_logs: Vec<String>,
}

impl YardReport {
    pub fn collect(
        registry: &ResourceRegistry,
        store: &TaskStore,
        audit: &AuditLog,
        log_tail: usize,
    ) -> Self {
        Self {
            system_overview: SystemStatus::collect(registry, store),
            performance: PerformanceMetrics::calculate(store.tasks()),
            resource_utilization: ResourceUtilization::collect(registry),
            recent_logs: audit.tail(log_tail).to_vec(),
        }
    }
}

/// Task statistics with an equipment snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub success_rate: f64,
    pub average_execution_secs: f64,
    pub task_type_statistics: BTreeMap<TaskType, TaskTypeStats>,
    pub equipment_status: BTreeMap<String, EquipmentUsage>,
}

impl PerformanceReport {
    pub fn collect(registry: &ResourceRegistry, store: &TaskStore) -> Self {
        let metrics = PerformanceMetrics::calculate(store.tasks());
        Self {
            total_tasks: metrics.total_tasks,
            completed_tasks: metrics.completed_tasks,
            failed_tasks: metrics.failed_tasks,
            success_rate: metrics.success_rate,
            average_execution_secs: metrics.average_execution_secs,
            task_type_statistics: metrics.by_task_type,
            equipment_status: ResourceUtilization::collect(registry).equipment,
        }
    }
}
