//! Mobile handling equipment.
//!
//! Equipment is one struct with a tagged [`EquipmentKind`]. What a piece of
//! equipment may do is decided by its [`Capabilities`], queried through
//! [`Equipment::supports`], not by inspecting the variant at call sites.
//!
//! # Invariants
//! - `current_load ≤ capacity`
//! - `status == Busy` iff `current_task_id` is set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Position, TaskType};
use crate::error::{Result, YardError};

/// Default lifting capacity of a crane (t).
pub const DEFAULT_CRANE_CAPACITY: f64 = 50.0;
/// Default hauling capacity of a frame truck (t).
pub const DEFAULT_TRUCK_CAPACITY: f64 = 100.0;
/// Default carrying capacity of a frame (t).
pub const DEFAULT_FRAME_CAPACITY: f64 = 80.0;

/// Operational status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Idle,
    Busy,
    Maintenance,
    Error,
}

/// Variant-specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquipmentKind {
    /// Overhead crane bound to one warehouse.
    Crane { warehouse_id: String },
    /// Tractor unit that hauls at most one frame.
    FrameTruck { attached_frame_id: Option<String> },
    /// Trailer frame; carries goods but executes nothing on its own.
    Frame { products: BTreeMap<String, u32> },
}

/// Fixed capability flags of an equipment variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Loading, unloading and repositioning.
    pub load_unload: bool,
    /// Ship transport and internal transfer hauls.
    pub haul: bool,
}

impl Capabilities {
    /// Whether a task type falls inside this capability set.
    pub fn supports(&self, task_type: TaskType) -> bool {
        match task_type {
            TaskType::Loading | TaskType::Unloading | TaskType::MoveEquipment => self.load_unload,
            TaskType::ShipTransport | TaskType::InternalTransfer => self.haul,
        }
    }
}

impl EquipmentKind {
    /// Capability set of the variant.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Crane { .. } => Capabilities {
                load_unload: true,
                haul: false,
            },
            Self::FrameTruck { .. } => Capabilities {
                load_unload: false,
                haul: true,
            },
            Self::Frame { .. } => Capabilities::default(),
        }
    }

    /// Short variant label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Crane { .. } => "crane",
            Self::FrameTruck { .. } => "frame_truck",
            Self::Frame { .. } => "frame",
        }
    }
}

/// A piece of yard equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    /// Unique equipment identifier. Empty = generated on registration.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    kind: EquipmentKind,
    position: Position,
    status: EquipmentStatus,
    current_task_id: Option<String>,
    capacity: f64,
    current_load: f64,
}

impl Equipment {
    /// Creates idle, empty equipment.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: EquipmentKind,
        position: Position,
        capacity: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position,
            status: EquipmentStatus::Idle,
            current_task_id: None,
            capacity,
            current_load: 0.0,
        }
    }

    /// Creates a crane serving `warehouse_id`.
    pub fn crane(
        id: impl Into<String>,
        name: impl Into<String>,
        position: Position,
        warehouse_id: impl Into<String>,
    ) -> Self {
        let kind = EquipmentKind::Crane {
            warehouse_id: warehouse_id.into(),
        };
        Self::new(id, name, kind, position, DEFAULT_CRANE_CAPACITY)
    }

    /// Creates a frame truck with no frame attached.
    pub fn frame_truck(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        let kind = EquipmentKind::FrameTruck {
            attached_frame_id: None,
        };
        Self::new(id, name, kind, position, DEFAULT_TRUCK_CAPACITY)
    }

    /// Creates an empty frame.
    pub fn frame(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        let kind = EquipmentKind::Frame {
            products: BTreeMap::new(),
        };
        Self::new(id, name, kind, position, DEFAULT_FRAME_CAPACITY)
    }

    /// Overrides the capacity.
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn kind(&self) -> &EquipmentKind {
        &self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn status(&self) -> EquipmentStatus {
        self.status
    }

    pub fn current_task_id(&self) -> Option<&str> {
        self.current_task_id.as_deref()
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn current_load(&self) -> f64 {
        self.current_load
    }

    pub fn is_idle(&self) -> bool {
        self.status == EquipmentStatus::Idle
    }

    pub fn is_crane(&self) -> bool {
        matches!(self.kind, EquipmentKind::Crane { .. })
    }

    /// Capability set of this equipment.
    pub fn capabilities(&self) -> Capabilities {
        self.kind.capabilities()
    }

    /// Whether this equipment may execute `task_type`.
    pub fn supports(&self, task_type: TaskType) -> bool {
        self.capabilities().supports(task_type)
    }

    /// Frame attached to a frame truck.
    pub fn attached_frame_id(&self) -> Option<&str> {
        match &self.kind {
            EquipmentKind::FrameTruck { attached_frame_id } => attached_frame_id.as_deref(),
            _ => None,
        }
    }

    /// Goods carried by a frame.
    pub fn carried_products(&self) -> Option<&BTreeMap<String, u32>> {
        match &self.kind {
            EquipmentKind::Frame { products } => Some(products),
            _ => None,
        }
    }

    /// Adds `quantity × unit_weight` to the load. Rejected without change if
    /// capacity would be exceeded.
    pub fn load(&mut self, product_id: &str, quantity: u32, unit_weight: f64) -> Result<()> {
        check_weight(quantity, unit_weight)?;
        let total = unit_weight * f64::from(quantity);
        if self.current_load + total > self.capacity {
            return Err(YardError::CapacityExceeded {
                holder_id: self.id.clone(),
                requested: total,
                available: self.capacity - self.current_load,
            });
        }
        if let EquipmentKind::Frame { products } = &mut self.kind {
            *products.entry(product_id.to_string()).or_insert(0) += quantity;
        }
        self.current_load += total;
        Ok(())
    }

    /// Removes `quantity × unit_weight` from the load. Frames also check
    /// their per-product count.
    pub fn unload(&mut self, product_id: &str, quantity: u32, unit_weight: f64) -> Result<()> {
        check_weight(quantity, unit_weight)?;
        let total = unit_weight * f64::from(quantity);
        match &mut self.kind {
            EquipmentKind::Frame { products } => {
                let held = products.get(product_id).copied().unwrap_or(0);
                if held < quantity {
                    return Err(YardError::InsufficientStock {
                        holder_id: self.id.clone(),
                        product_id: product_id.to_string(),
                        requested: quantity,
                        available: held,
                    });
                }
                if held == quantity {
                    products.remove(product_id);
                } else {
                    products.insert(product_id.to_string(), held - quantity);
                }
            }
            _ => {
                if self.current_load < total {
                    return Err(YardError::StateConflict(format!(
                        "{} carries {} t, cannot unload {} t",
                        self.id, self.current_load, total
                    )));
                }
            }
        }
        self.current_load = (self.current_load - total).max(0.0);
        Ok(())
    }

    /// Connects a frame to a frame truck.
    pub fn attach_frame(&mut self, frame_id: &str) -> Result<()> {
        match &mut self.kind {
            EquipmentKind::FrameTruck { attached_frame_id } => {
                if let Some(current) = attached_frame_id {
                    return Err(YardError::StateConflict(format!(
                        "{} already hauls frame {current}",
                        self.id
                    )));
                }
                *attached_frame_id = Some(frame_id.to_string());
                Ok(())
            }
            other => Err(YardError::Validation(format!(
                "{} is a {}, only frame trucks attach frames",
                self.id,
                other.label()
            ))),
        }
    }

    /// Disconnects the attached frame, returning its id.
    pub fn detach_frame(&mut self) -> Result<String> {
        match &mut self.kind {
            EquipmentKind::FrameTruck { attached_frame_id } => attached_frame_id
                .take()
                .ok_or_else(|| YardError::StateConflict(format!("{} hauls no frame", self.id))),
            other => Err(YardError::Validation(format!(
                "{} is a {}, only frame trucks detach frames",
                self.id,
                other.label()
            ))),
        }
    }

    /// Claims the equipment for a task: Idle → Busy in one step.
    pub(crate) fn claim(&mut self, task_id: &str) -> Result<()> {
        if self.status != EquipmentStatus::Idle {
            return Err(YardError::StateConflict(format!(
                "{} is {:?}, not Idle",
                self.id, self.status
            )));
        }
        self.status = EquipmentStatus::Busy;
        self.current_task_id = Some(task_id.to_string());
        Ok(())
    }

    /// Returns the equipment to Idle and clears its task reference.
    pub(crate) fn release(&mut self) {
        self.status = EquipmentStatus::Idle;
        self.current_task_id = None;
    }

    /// Switches between Idle, Maintenance and Error. Busy is reachable
    /// only through [`Equipment::claim`].
    pub(crate) fn set_status(&mut self, status: EquipmentStatus) -> Result<()> {
        if status == EquipmentStatus::Busy {
            return Err(YardError::Validation(
                "Busy is set by task assignment only".into(),
            ));
        }
        if self.status == EquipmentStatus::Busy {
            return Err(YardError::StateConflict(format!(
                "{} is busy with task {}",
                self.id,
                self.current_task_id.as_deref().unwrap_or("?")
            )));
        }
        self.status = status;
        Ok(())
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

fn check_weight(quantity: u32, unit_weight: f64) -> Result<()> {
    if quantity == 0 {
        return Err(YardError::Validation("quantity must be positive".into()));
    }
    if !unit_weight.is_finite() || unit_weight < 0.0 {
        return Err(YardError::Validation(format!(
            "unit weight must be a non-negative number, got {unit_weight}"
        )));
    }
    Ok(())
}
