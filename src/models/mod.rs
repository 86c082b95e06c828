//! Yard domain models.
//!
//! Value types and entities shared by the registry, task store, scheduler
//! and executor.
//!
//! | Type | Role |
//! |------|------|
//! | `Position` | Grid cell, Manhattan metric |
//! | `Product` | Catalog entry: unit weight and volume |
//! | `Warehouse` | Volume-capped stock holder |
//! | `Equipment` | Crane, frame truck or frame with a capability set |
//! | `Task` | Unit of work with a lifecycle and sub-task tree |
//! | `ShipPlan` | Outbound manifest driving ship transport tasks |

mod equipment;
pub(crate) mod id;
mod position;
mod product;
mod ship_plan;
mod task;
mod warehouse;

pub use equipment::{
    Capabilities, Equipment, EquipmentKind, EquipmentStatus, DEFAULT_CRANE_CAPACITY,
    DEFAULT_FRAME_CAPACITY, DEFAULT_TRUCK_CAPACITY,
};
pub use position::Position;
pub use product::Product;
pub use ship_plan::ShipPlan;
pub use task::{Task, TaskMetadata, TaskStatus, TaskType};
pub use warehouse::{Warehouse, WarehouseKind};
