//! Input and state validation.
//!
//! Two layers:
//! - Entity checks (`validate_product`, `validate_warehouse`,
//!   `validate_equipment`) reject malformed input before registration.
//! - [`validate_state`] audits a whole registry and task store against the
//!   yard invariants and reports every violation found:
//!   - warehouse volume equals the sum of its stock volumes and stays
//!     within `0..=capacity`
//!   - equipment load stays within `0..=capacity`
//!   - equipment is Busy iff it references a task, and that task
//!     references it back
//!   - no equipment is held by two active tasks

use std::collections::HashMap;

use crate::error::{Result, YardError};
use crate::models::{Equipment, EquipmentStatus, Product, Warehouse};
use crate::planner::GridMap;
use crate::registry::ResourceRegistry;
use crate::store::TaskStore;

/// Relative tolerance for floating-point volume and load sums.
const EPSILON: f64 = 1e-6;

/// Validation result.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// A detected invariant violation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Recorded warehouse volume differs from its stock.
    VolumeMismatch,
    /// Warehouse volume outside `0..=capacity`.
    VolumeOutOfBounds,
    /// Equipment load outside `0..=capacity`.
    LoadOutOfBounds,
    /// Busy status and task reference disagree.
    StatusMismatch,
    /// An id points at nothing.
    DanglingReference,
    /// One piece of equipment held by several active tasks.
    DoubleAssignment,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Rejects products with negative or non-finite measures.
pub fn validate_product(product: &Product) -> Result<()> {
    check_measure("weight", product.weight)?;
    check_measure("volume", product.volume)?;
    check_measure("unit price", product.unit_price)
}

/// Rejects warehouses with a bad capacity, an off-grid position, or stock
/// carried in from outside. Stock enters only through stock-in.
pub fn validate_warehouse(warehouse: &Warehouse, grid: &GridMap) -> Result<()> {
    check_measure("capacity", warehouse.capacity())?;
    check_on_grid(warehouse.position, grid)?;
    if !warehouse.products().is_empty() || warehouse.current_volume() != 0.0 {
        return Err(YardError::Validation(format!(
            "{} must be registered empty, got volume {} over {} product lines",
            warehouse.id,
            warehouse.current_volume(),
            warehouse.products().len()
        )));
    }
    Ok(())
}

/// Rejects equipment with a bad capacity, an off-grid or occupied
/// position, or state that a fresh registration cannot carry: a task, a
/// load, frame contents or an attached frame.
pub fn validate_equipment(equipment: &Equipment, grid: &GridMap) -> Result<()> {
    check_measure("capacity", equipment.capacity())?;
    check_on_grid(equipment.position(), grid)?;
    if grid.is_obstacle(equipment.position()) {
        return Err(YardError::Validation(format!(
            "cell {} is already occupied",
            equipment.position()
        )));
    }
    if equipment.status() == EquipmentStatus::Busy || equipment.current_task_id().is_some() {
        return Err(YardError::Validation(format!(
            "{} cannot be registered while assigned to a task",
            equipment.id
        )));
    }
    let carries_goods = equipment
        .carried_products()
        .is_some_and(|products| !products.is_empty());
    if equipment.current_load() != 0.0 || carries_goods {
        return Err(YardError::Validation(format!(
            "{} must be registered empty, got load {}",
            equipment.id,
            equipment.current_load()
        )));
    }
    if let Some(frame_id) = equipment.attached_frame_id() {
        return Err(YardError::Validation(format!(
            "{} cannot be registered hauling {frame_id}; attach frames after registration",
            equipment.id
        )));
    }
    Ok(())
}

fn check_measure(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(YardError::Validation(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

fn check_on_grid(position: crate::models::Position, grid: &GridMap) -> Result<()> {
    if !grid.contains(position) {
        return Err(YardError::Validation(format!(
            "position {position} lies outside the {}x{} grid",
            grid.width(),
            grid.height()
        )));
    }
    Ok(())
}

/// Audits the registry and task store against the yard invariants.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_state(registry: &ResourceRegistry, store: &TaskStore) -> ValidationResult {
    let mut errors = Vec::new();

    // Warehouse volume accounting
    for warehouse in registry.warehouses() {
        let mut expected = 0.0;
        for (product_id, &quantity) in warehouse.products() {
            match registry.product(product_id) {
                Some(product) => expected += product.volume * f64::from(quantity),
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!(
                        "Warehouse '{}' stocks unknown product '{product_id}'",
                        warehouse.id
                    ),
                )),
            }
            if quantity == 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::VolumeMismatch,
                    format!(
                        "Warehouse '{}' keeps a zero entry for '{product_id}'",
                        warehouse.id
                    ),
                ));
            }
        }

        let tolerance = EPSILON * warehouse.capacity().max(1.0);
        if (warehouse.current_volume() - expected).abs() > tolerance {
            errors.push(ValidationError::new(
                ValidationErrorKind::VolumeMismatch,
                format!(
                    "Warehouse '{}' records volume {} but holds {expected}",
                    warehouse.id,
                    warehouse.current_volume()
                ),
            ));
        }
        if warehouse.current_volume() < 0.0
            || warehouse.current_volume() > warehouse.capacity() + tolerance
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::VolumeOutOfBounds,
                format!(
                    "Warehouse '{}' volume {} outside 0..={}",
                    warehouse.id,
                    warehouse.current_volume(),
                    warehouse.capacity()
                ),
            ));
        }
    }

    // Equipment load and status
    for equipment in registry.all_equipment() {
        let tolerance = EPSILON * equipment.capacity().max(1.0);
        if equipment.current_load() < 0.0
            || equipment.current_load() > equipment.capacity() + tolerance
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::LoadOutOfBounds,
                format!(
                    "Equipment '{}' load {} outside 0..={}",
                    equipment.id,
                    equipment.current_load(),
                    equipment.capacity()
                ),
            ));
        }

        let busy = equipment.status() == EquipmentStatus::Busy;
        match (busy, equipment.current_task_id()) {
            (true, None) | (false, Some(_)) => errors.push(ValidationError::new(
                ValidationErrorKind::StatusMismatch,
                format!(
                    "Equipment '{}' is {:?} with task {:?}",
                    equipment.id,
                    equipment.status(),
                    equipment.current_task_id()
                ),
            )),
            (true, Some(task_id)) => match store.get(task_id) {
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::DanglingReference,
                    format!(
                        "Equipment '{}' references unknown task '{task_id}'",
                        equipment.id
                    ),
                )),
                Some(task) => {
                    if task.assigned_equipment() != Some(equipment.id.as_str())
                        || task.status().is_terminal()
                    {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::StatusMismatch,
                            format!(
                                "Equipment '{}' holds task '{task_id}' ({:?}) which does not hold it",
                                equipment.id,
                                task.status()
                            ),
                        ));
                    }
                }
            },
            (false, None) => {}
        }
    }

    // Active task → equipment references
    let mut holders: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in store.tasks() {
        if task.status().is_terminal() {
            continue;
        }
        let Some(equipment_id) = task.assigned_equipment() else {
            continue;
        };
        holders.entry(equipment_id).or_default().push(&task.id);
        match registry.equipment(equipment_id) {
            None => errors.push(ValidationError::new(
                ValidationErrorKind::DanglingReference,
                format!("Task '{}' references unknown equipment '{equipment_id}'", task.id),
            )),
            Some(equipment) if equipment.current_task_id() != Some(task.id.as_str()) => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::StatusMismatch,
                    format!(
                        "Task '{}' holds equipment '{equipment_id}' which does not hold it",
                        task.id
                    ),
                ));
            }
            Some(_) => {}
        }
    }

    let mut shared: Vec<_> = holders.into_iter().filter(|(_, t)| t.len() > 1).collect();
    shared.sort();
    for (equipment_id, task_ids) in shared {
        errors.push(ValidationError::new(
            ValidationErrorKind::DoubleAssignment,
            format!(
                "Equipment '{equipment_id}' is held by tasks {}",
                task_ids.join(", ")
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
