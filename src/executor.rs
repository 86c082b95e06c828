//! Task execution.
//!
//! Drives one task through `Pending → InProgress → {Completed, Failed}`,
//! applying the effect of its type to the registry and appending one audit
//! record per product line or move.
//!
//! # Effects
//!
//! | Type | Effect |
//! |------|--------|
//! | ShipTransport | Per line, take stock from the first product warehouse (by id) holding enough. Stops at the first line that cannot be served. |
//! | InternalTransfer | Per line, move stock from source to target. Failing lines are skipped; the task fails if any line failed. |
//! | Loading | Per line, load the first available crane (by id). |
//! | Unloading | Per line, unload the first crane (by id) carrying a load. |
//! | MoveEquipment | Route the assigned equipment to the target cell. |
//!
//! Lines already applied are never rolled back; each line stands alone.
//! Whatever the outcome, assigned equipment is released back to Idle. A
//! task that fails before reaching any line still leaves one audit record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::error::{ErrorKind, Result, YardError};
use crate::models::{TaskMetadata, TaskType, WarehouseKind};
use crate::registry::ResourceRegistry;
use crate::store::TaskStore;

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Completed,
    Failed { kind: ErrorKind, reason: String },
}

impl ExecutionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Mutable state an execution works on.
pub struct ExecutionContext<'a> {
    pub registry: &'a mut ResourceRegistry,
    pub store: &'a mut TaskStore,
    pub audit: &'a mut AuditLog,
}

/// Runs tasks and applies their effects.
#[derive(Debug, Clone, Default)]
pub struct Executor;

struct Job {
    task_id: String,
    task_type: TaskType,
    metadata: TaskMetadata,
    equipment_id: Option<String>,
}

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Executes a pending task.
    ///
    /// Effect failures do not surface as `Err`: they end the task in Failed
    /// and are reported through [`ExecutionOutcome::Failed`], with the
    /// reason also kept in the task metadata. `Err` means the task could
    /// not be started at all (unknown id, not Pending).
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>, task_id: &str) -> Result<ExecutionOutcome> {
        let job = {
            let task = ctx.store.get_mut(task_id)?;
            task.start(Utc::now())?;
            Job {
                task_id: task.id.clone(),
                task_type: task.task_type,
                metadata: task.metadata.clone(),
                equipment_id: task.assigned_equipment().map(str::to_string),
            }
        };
        info!(task_id, task_type = ?job.task_type, "task started");

        let recorded_before = ctx.audit.len();
        let result = match job.task_type {
            TaskType::ShipTransport => ship_transport(ctx, &job),
            TaskType::InternalTransfer => internal_transfer(ctx, &job),
            TaskType::Loading => loading(ctx, &job),
            TaskType::Unloading => unloading(ctx, &job),
            TaskType::MoveEquipment => move_equipment(ctx, &job),
        };
        if let Err(err) = &result {
            if ctx.audit.len() == recorded_before {
                ctx.audit.record(format!(
                    "{:?} task {task_id} failed: {err}",
                    job.task_type
                ));
            }
        }

        let task = ctx.store.get_mut(task_id)?;
        let outcome = match result {
            Ok(()) => {
                task.complete(Utc::now())?;
                info!(task_id, "task completed");
                ExecutionOutcome::Completed
            }
            Err(err) => {
                task.fail(Utc::now(), &err)?;
                warn!(task_id, error = %err, "task failed");
                ExecutionOutcome::Failed {
                    kind: err.kind(),
                    reason: err.to_string(),
                }
            }
        };

        if let Some(equipment_id) = &job.equipment_id {
            if let Err(err) = ctx.registry.release_equipment(equipment_id) {
                warn!(task_id, equipment_id = %equipment_id, error = %err, "equipment release failed");
            }
        }

        Ok(outcome)
    }
}

fn product_name(registry: &ResourceRegistry, product_id: &str) -> String {
    registry
        .product(product_id)
        .map_or_else(|| product_id.to_string(), |p| p.name.clone())
}

fn ship_transport(ctx: &mut ExecutionContext<'_>, job: &Job) -> Result<()> {
    for (product_id, &quantity) in &job.metadata.products {
        let name = product_name(ctx.registry, product_id);
        ctx.registry.product_or_err(product_id)?;

        let source = ctx
            .registry
            .warehouses()
            .filter(|w| w.kind == WarehouseKind::Product)
            .find(|w| w.quantity_of(product_id) >= quantity)
            .map(|w| (w.id.clone(), w.name.clone()));

        let Some((warehouse_id, warehouse_name)) = source else {
            let available = ctx
                .registry
                .warehouses()
                .filter(|w| w.kind == WarehouseKind::Product)
                .map(|w| w.quantity_of(product_id))
                .max()
                .unwrap_or(0);
            ctx.audit.record(format!(
                "No product warehouse holds {quantity} x {name} for shipment"
            ));
            return Err(YardError::InsufficientStock {
                holder_id: "product warehouses".to_string(),
                product_id: product_id.clone(),
                requested: quantity,
                available,
            });
        };

        ctx.registry.stock_out(&warehouse_id, product_id, quantity)?;
        ctx.audit.record(format!(
            "Took {quantity} x {name} from {warehouse_name} for shipment"
        ));
    }
    Ok(())
}

fn internal_transfer(ctx: &mut ExecutionContext<'_>, job: &Job) -> Result<()> {
    let meta = &job.metadata;
    let (Some(source_id), Some(target_id)) = (&meta.source_warehouse_id, &meta.target_warehouse_id)
    else {
        return Err(YardError::Validation(
            "internal transfer needs source and target warehouses".into(),
        ));
    };
    let source_name = ctx.registry.warehouse_or_err(source_id)?.name.clone();
    let target_name = ctx.registry.warehouse_or_err(target_id)?.name.clone();

    let mut first_error = None;
    for (product_id, &quantity) in &meta.products {
        let name = product_name(ctx.registry, product_id);
        match ctx.registry.transfer(source_id, target_id, product_id, quantity) {
            Ok(()) => ctx.audit.record(format!(
                "Moved {quantity} x {name} from {source_name} to {target_name}"
            )),
            Err(err) => {
                ctx.audit.record(format!(
                    "Transfer of {quantity} x {name} from {source_name} to {target_name} failed: {err}"
                ));
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn require_lines(job: &Job) -> Result<()> {
    if job.metadata.products.is_empty() {
        return Err(YardError::Validation(format!(
            "{:?} task {} names no product",
            job.task_type, job.task_id
        )));
    }
    Ok(())
}

fn loading(ctx: &mut ExecutionContext<'_>, job: &Job) -> Result<()> {
    require_lines(job)?;
    for (product_id, &quantity) in &job.metadata.products {
        let name = product_name(ctx.registry, product_id);
        // The crane claimed for this very task counts as available.
        let crane = ctx
            .registry
            .all_equipment()
            .filter(|e| e.is_crane())
            .find(|e| e.is_idle() || e.current_task_id() == Some(job.task_id.as_str()))
            .map(|e| (e.id.clone(), e.name.clone()));

        let Some((crane_id, crane_name)) = crane else {
            ctx.audit.record(format!("No idle crane to load {quantity} x {name}"));
            return Err(YardError::StateConflict("no idle crane available".into()));
        };

        if let Err(err) = ctx.registry.load_equipment(&crane_id, product_id, quantity) {
            ctx.audit.record(format!(
                "{crane_name} could not load {quantity} x {name}: {err}"
            ));
            return Err(err);
        }
        ctx.audit.record(format!("{crane_name} loaded {quantity} x {name}"));
    }
    Ok(())
}

fn unloading(ctx: &mut ExecutionContext<'_>, job: &Job) -> Result<()> {
    require_lines(job)?;
    for (product_id, &quantity) in &job.metadata.products {
        let name = product_name(ctx.registry, product_id);
        let crane = ctx
            .registry
            .all_equipment()
            .filter(|e| e.is_crane())
            .find(|e| e.current_load() > 0.0)
            .map(|e| (e.id.clone(), e.name.clone()));

        let Some((crane_id, crane_name)) = crane else {
            ctx.audit.record(format!("No loaded crane to unload {quantity} x {name}"));
            return Err(YardError::StateConflict("no loaded crane available".into()));
        };

        if let Err(err) = ctx.registry.unload_equipment(&crane_id, product_id, quantity) {
            ctx.audit.record(format!(
                "{crane_name} could not unload {quantity} x {name}: {err}"
            ));
            return Err(err);
        }
        ctx.audit.record(format!("{crane_name} unloaded {quantity} x {name}"));
    }
    Ok(())
}

fn move_equipment(ctx: &mut ExecutionContext<'_>, job: &Job) -> Result<()> {
    let Some(target) = job.metadata.target_position else {
        return Err(YardError::Validation(format!(
            "move task {} has no target position",
            job.task_id
        )));
    };
    let Some(equipment_id) = &job.equipment_id else {
        return Err(YardError::Validation(format!(
            "move task {} has no assigned equipment",
            job.task_id
        )));
    };
    let equipment = ctx.registry.equipment_or_err(equipment_id)?;
    let (name, from) = (equipment.name.clone(), equipment.position());

    match ctx.registry.relocate(equipment_id, target) {
        Ok(route) => {
            ctx.audit.record(format!(
                "{name} moved from {from} to {target} in {} steps",
                route.len().saturating_sub(1)
            ));
            Ok(())
        }
        Err(err) => {
            ctx.audit.record(format!("{name} could not move from {from} to {target}: {err}"));
            Err(err)
        }
    }
}
