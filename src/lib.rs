//! Logistics yard engine.
//!
//! Models a bounded yard of warehouses and mobile handling equipment, and
//! runs transport tasks against it: grid path planning, capacity-checked
//! inventory, greedy equipment dispatch and a task execution state machine.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Position`, `Product`, `Warehouse`,
//!   `Equipment`, `Task`, `ShipPlan`
//! - **`planner`**: A* shortest routes on the 4-connected grid
//! - **`registry`**: Products, warehouses and equipment with their capacity
//!   invariants
//! - **`store`**: Task trees and ship plans in creation order
//! - **`scheduler`**: Greedy priority dispatch and execution KPIs
//! - **`executor`**: Task lifecycle and per-type effects
//! - **`audit`**: Append-only record of executed effects
//! - **`validation`**: Entity checks and whole-yard invariant audit
//! - **`persistence`**: Best-effort entity snapshot sinks
//! - **`report`**: Status and report snapshots
//! - **`config`**: TOML configuration
//! - **`yard`**: The context object tying it all together
//! - **`shared`**: Lock-protected handle for concurrent callers
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use u_yard::config::YardConfig;
//! use u_yard::models::{Equipment, Position, Product, Warehouse};
//! use u_yard::yard::Yard;
//!
//! let mut yard = Yard::new(YardConfig::default()).unwrap();
//! yard.register_product(Product::new("P1", "Steel", 10.0, 5.0)).unwrap();
//! yard.register_warehouse(Warehouse::terminal("W1", "Quay", Position::new(0, 0), 1000.0)).unwrap();
//! yard.register_warehouse(Warehouse::product("W2", "Store", Position::new(8, 8), 1000.0)).unwrap();
//! yard.register_equipment(Equipment::frame_truck("T1", "Truck", Position::new(4, 4))).unwrap();
//! yard.warehouse_stock_in("W1", "P1", 20).unwrap();
//!
//! let task_id = yard
//!     .create_internal_transfer_task("W1", "W2", BTreeMap::from([("P1".to_string(), 5)]))
//!     .unwrap();
//! yard.optimize_schedule();
//! assert!(yard.execute_task(&task_id).unwrap().is_completed());
//! assert_eq!(yard.registry().warehouse("W2").unwrap().quantity_of("P1"), 5);
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod persistence;
pub mod planner;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod shared;
pub mod store;
pub mod validation;
pub mod yard;

pub use error::{ErrorKind, Result, YardError};
pub use shared::SharedYard;
pub use yard::Yard;
