//! Yard context.
//!
//! [`Yard`] owns every piece of yard state (registry, task store, audit
//! log, persistence sink) and exposes the commands and queries a
//! presentation layer drives. It is an ordinary value: callers create it,
//! pass it around and drop it; nothing is global.
//!
//! Every mutating command follows the same shape: validate, apply through
//! the registry or store, then hand the touched entities to the sink.
//! Rejected commands leave the yard untouched and are logged at `warn`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, AuditPage};
use crate::config::YardConfig;
use crate::error::{Result, YardError};
use crate::executor::{ExecutionContext, ExecutionOutcome, Executor};
use crate::models::{
    Equipment, EquipmentStatus, Position, Product, ShipPlan, Task, TaskMetadata, TaskStatus,
    TaskType, Warehouse, WarehouseKind,
};
use crate::persistence::{EntitySnapshot, NullSink, PersistenceSink};
use crate::planner::GridMap;
use crate::registry::ResourceRegistry;
use crate::report::{PerformanceReport, SystemStatus, YardReport};
use crate::scheduler::{Dispatch, GreedyScheduler};
use crate::store::TaskStore;
use crate::validation::{validate_state, ValidationResult};

/// The yard and everything in it.
pub struct Yard {
    config: YardConfig,
    registry: ResourceRegistry,
    store: TaskStore,
    audit: AuditLog,
    scheduler: GreedyScheduler,
    executor: Executor,
    sink: Box<dyn PersistenceSink>,
}

impl fmt::Debug for Yard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Yard")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("store", &self.store)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

fn rejected(command: &str, err: YardError) -> YardError {
    warn!(command, error = %err, "command rejected");
    err
}

fn persist(sink: &mut dyn PersistenceSink, snapshot: EntitySnapshot<'_>) {
    if let Err(err) = sink.record(snapshot) {
        warn!(entity_id = snapshot.id(), error = %err, "persistence failed");
    }
}

impl Yard {
    /// Creates an empty yard with a grid sized by `config`.
    pub fn new(config: YardConfig) -> Result<Self> {
        config.validate()?;
        let grid = GridMap::new(config.grid_width, config.grid_height);
        info!(
            width = config.grid_width,
            height = config.grid_height,
            "yard created"
        );
        Ok(Self {
            config,
            registry: ResourceRegistry::new(grid),
            store: TaskStore::new(),
            audit: AuditLog::new(),
            scheduler: GreedyScheduler::new(),
            executor: Executor::new(),
            sink: Box::new(NullSink),
        })
    }

    /// Replaces the persistence sink.
    pub fn with_sink(mut self, sink: Box<dyn PersistenceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &YardConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn ship_plan(&self, id: &str) -> Option<&ShipPlan> {
        self.store.ship_plan(id)
    }

    // ======================== Persistence ========================

    fn persist_product(&mut self, id: &str) {
        if let Some(product) = self.registry.product(id) {
            persist(self.sink.as_mut(), EntitySnapshot::Product(product));
        }
    }

    fn persist_warehouse(&mut self, id: &str) {
        if let Some(warehouse) = self.registry.warehouse(id) {
            persist(self.sink.as_mut(), EntitySnapshot::Warehouse(warehouse));
        }
    }

    fn persist_equipment(&mut self, id: &str) {
        if let Some(equipment) = self.registry.equipment(id) {
            persist(self.sink.as_mut(), EntitySnapshot::Equipment(equipment));
        }
    }

    fn persist_task(&mut self, id: &str) {
        if let Some(task) = self.store.get(id) {
            persist(self.sink.as_mut(), EntitySnapshot::Task(task));
        }
    }

    fn persist_ship_plan(&mut self, id: &str) {
        if let Some(plan) = self.store.ship_plan(id) {
            persist(self.sink.as_mut(), EntitySnapshot::ShipPlan(plan));
        }
    }

    // ======================== Entity commands ========================

    /// Registers a product. Returns its id.
    pub fn register_product(&mut self, product: Product) -> Result<String> {
        let id = self
            .registry
            .add_product(product)
            .map_err(|e| rejected("register_product", e))?;
        self.persist_product(&id);
        Ok(id)
    }

    /// Replaces a registered product.
    pub fn update_product(&mut self, product: Product) -> Result<()> {
        let id = product.id.clone();
        self.registry
            .update_product(product)
            .map_err(|e| rejected("update_product", e))?;
        self.persist_product(&id);
        Ok(())
    }

    /// Registers a warehouse. Returns its id.
    pub fn register_warehouse(&mut self, warehouse: Warehouse) -> Result<String> {
        let id = self
            .registry
            .add_warehouse(warehouse)
            .map_err(|e| rejected("register_warehouse", e))?;
        self.persist_warehouse(&id);
        Ok(id)
    }

    /// Registers equipment. Returns its id.
    pub fn register_equipment(&mut self, equipment: Equipment) -> Result<String> {
        let id = self
            .registry
            .add_equipment(equipment)
            .map_err(|e| rejected("register_equipment", e))?;
        self.persist_equipment(&id);
        Ok(id)
    }

    /// Registers a ship plan. Returns its id.
    pub fn register_ship_plan(&mut self, plan: ShipPlan) -> Result<String> {
        self.check_plan(&plan)
            .map_err(|e| rejected("register_ship_plan", e))?;
        let id = self
            .store
            .add_ship_plan(plan)
            .map_err(|e| rejected("register_ship_plan", e))?;
        info!(ship_plan_id = %id, "ship plan registered");
        self.persist_ship_plan(&id);
        Ok(id)
    }

    fn check_plan(&self, plan: &ShipPlan) -> Result<()> {
        if plan.products.is_empty() {
            return Err(YardError::Validation(format!(
                "ship plan {} lists no products",
                plan.id
            )));
        }
        for (product_id, &quantity) in &plan.products {
            self.registry.product_or_err(product_id)?;
            if quantity == 0 {
                return Err(YardError::Validation(format!(
                    "ship plan {} asks for zero units of {product_id}",
                    plan.id
                )));
            }
        }
        Ok(())
    }

    // ======================== Inventory commands ========================

    pub fn warehouse_stock_in(
        &mut self,
        warehouse_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<()> {
        self.registry
            .stock_in(warehouse_id, product_id, quantity)
            .map_err(|e| rejected("warehouse_stock_in", e))?;
        self.persist_warehouse(warehouse_id);
        Ok(())
    }

    pub fn warehouse_stock_out(
        &mut self,
        warehouse_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<()> {
        self.registry
            .stock_out(warehouse_id, product_id, quantity)
            .map_err(|e| rejected("warehouse_stock_out", e))?;
        self.persist_warehouse(warehouse_id);
        Ok(())
    }

    // ======================== Equipment commands ========================

    /// Puts equipment into Idle, Maintenance or Error.
    pub fn set_equipment_status(&mut self, equipment_id: &str, status: EquipmentStatus) -> Result<()> {
        self.registry
            .set_equipment_status(equipment_id, status)
            .map_err(|e| rejected("set_equipment_status", e))?;
        self.persist_equipment(equipment_id);
        Ok(())
    }

    pub fn attach_frame(&mut self, truck_id: &str, frame_id: &str) -> Result<()> {
        self.registry
            .attach_frame(truck_id, frame_id)
            .map_err(|e| rejected("attach_frame", e))?;
        self.persist_equipment(truck_id);
        Ok(())
    }

    /// Detaches the frame of a truck, returning the frame id.
    pub fn detach_frame(&mut self, truck_id: &str) -> Result<String> {
        let frame_id = self
            .registry
            .detach_frame(truck_id)
            .map_err(|e| rejected("detach_frame", e))?;
        self.persist_equipment(truck_id);
        Ok(frame_id)
    }

    /// Moves Idle equipment to `target` along a shortest route and returns
    /// the route.
    pub fn move_equipment(&mut self, equipment_id: &str, target: Position) -> Result<Vec<Position>> {
        let route = self
            .registry
            .move_equipment(equipment_id, target)
            .map_err(|e| rejected("move_equipment", e))?;
        info!(equipment_id, %target, steps = route.len().saturating_sub(1), "equipment moved");
        self.persist_equipment(equipment_id);
        Ok(route)
    }

    // ======================== Task commands ========================

    /// Stores a caller-built task tree after checking every id it names.
    /// Returns the root task id.
    pub fn submit_task(&mut self, task: Task) -> Result<String> {
        self.check_task(&task)
            .map_err(|e| rejected("submit_task", e))?;
        let id = self
            .store
            .insert(task)
            .map_err(|e| rejected("submit_task", e))?;
        if let Some(task) = self.store.get(&id) {
            info!(
                task_id = %id,
                task_type = ?task.task_type,
                priority = task.priority,
                sub_tasks = task.sub_tasks.len(),
                "task created"
            );
        }
        self.persist_task(&id);
        Ok(id)
    }

    fn check_task(&self, task: &Task) -> Result<()> {
        let meta = &task.metadata;
        for (product_id, &quantity) in &meta.products {
            self.registry.product_or_err(product_id)?;
            if quantity == 0 {
                return Err(YardError::Validation(format!(
                    "task asks for zero units of {product_id}"
                )));
            }
        }
        for warehouse_id in [&meta.source_warehouse_id, &meta.target_warehouse_id]
            .into_iter()
            .flatten()
        {
            self.registry.warehouse_or_err(warehouse_id)?;
        }
        if let Some(target) = meta.target_position {
            if !self.registry.grid().contains(target) {
                return Err(YardError::Validation(format!(
                    "target {target} lies outside the grid"
                )));
            }
        }
        task.sub_tasks.iter().try_for_each(|sub| self.check_task(sub))
    }

    /// Builds and stores the task tree for a ship plan, registering the
    /// plan first if it is not known yet.
    ///
    /// The root is a ShipTransport task carrying every product line; under
    /// it, each line gets a Loading sub-task followed by a ShipTransport
    /// sub-task. Returns the root task id.
    pub fn create_ship_transport_task(&mut self, plan: ShipPlan) -> Result<String> {
        self.check_plan(&plan)
            .map_err(|e| rejected("create_ship_transport_task", e))?;
        let plan_id = if !plan.id.is_empty() && self.store.ship_plan(&plan.id).is_some() {
            plan.id.clone()
        } else {
            self.register_ship_plan(plan.clone())?
        };

        let base = TaskMetadata {
            ship_plan_id: Some(plan_id),
            ship_name: (!plan.ship_name.is_empty()).then(|| plan.ship_name.clone()),
            destination: (!plan.destination.is_empty()).then(|| plan.destination.clone()),
            ..Default::default()
        };
        let step = |task_type: TaskType, products: BTreeMap<String, u32>| {
            Task::new("", task_type)
                .with_priority(plan.priority)
                .with_deadline(plan.deadline)
                .with_metadata(TaskMetadata {
                    products,
                    ..base.clone()
                })
        };

        let mut root = step(TaskType::ShipTransport, plan.products.clone());
        for (product_id, &quantity) in &plan.products {
            let line = BTreeMap::from([(product_id.clone(), quantity)]);
            root = root
                .with_sub_task(step(TaskType::Loading, line.clone()))
                .with_sub_task(step(TaskType::ShipTransport, line));
        }
        self.submit_task(root)
    }

    /// Creates a transfer of `products` from one warehouse to another.
    pub fn create_internal_transfer_task(
        &mut self,
        source_id: &str,
        target_id: &str,
        products: BTreeMap<String, u32>,
    ) -> Result<String> {
        if source_id == target_id {
            return Err(rejected(
                "create_internal_transfer_task",
                YardError::Validation(format!("transfer source and target are both {source_id}")),
            ));
        }
        if products.is_empty() {
            return Err(rejected(
                "create_internal_transfer_task",
                YardError::Validation("transfer lists no products".into()),
            ));
        }
        let metadata = TaskMetadata {
            products,
            source_warehouse_id: Some(source_id.to_string()),
            target_warehouse_id: Some(target_id.to_string()),
            ..Default::default()
        };
        let task = Task::new("", TaskType::InternalTransfer)
            .with_priority(self.config.default_priority)
            .with_metadata(metadata);
        self.submit_task(task)
    }

    /// Creates a crane Loading or Unloading task for one product line.
    pub fn create_handling_task(
        &mut self,
        task_type: TaskType,
        product_id: &str,
        quantity: u32,
        priority: Option<i32>,
    ) -> Result<String> {
        if !matches!(task_type, TaskType::Loading | TaskType::Unloading) {
            return Err(rejected(
                "create_handling_task",
                YardError::Validation(format!("{task_type:?} is not a handling task")),
            ));
        }
        let task = Task::new("", task_type)
            .with_priority(priority.unwrap_or(self.config.default_priority))
            .with_metadata(TaskMetadata::single_line(product_id, quantity));
        self.submit_task(task)
    }

    /// Creates a task that moves whichever equipment it is assigned to
    /// `target`.
    pub fn create_move_equipment_task(&mut self, target: Position, priority: Option<i32>) -> Result<String> {
        let metadata = TaskMetadata {
            target_position: Some(target),
            ..Default::default()
        };
        let task = Task::new("", TaskType::MoveEquipment)
            .with_priority(priority.unwrap_or(self.config.default_priority))
            .with_metadata(metadata);
        self.submit_task(task)
    }

    /// Assigns specific equipment to a pending task, claiming it.
    pub fn assign_equipment(&mut self, task_id: &str, equipment_id: &str) -> Result<()> {
        self.try_assign(task_id, equipment_id)
            .map_err(|e| rejected("assign_equipment", e))?;
        info!(task_id, equipment_id, "equipment assigned");
        self.persist_task(task_id);
        self.persist_equipment(equipment_id);
        Ok(())
    }

    fn try_assign(&mut self, task_id: &str, equipment_id: &str) -> Result<()> {
        let task = self.store.get_or_err(task_id)?;
        if task.status() != TaskStatus::Pending {
            return Err(YardError::StateConflict(format!(
                "task {task_id} is {:?}, only Pending tasks take equipment",
                task.status()
            )));
        }
        if let Some(current) = task.assigned_equipment() {
            return Err(YardError::StateConflict(format!(
                "task {task_id} already has equipment {current}"
            )));
        }
        let task_type = task.task_type;
        let equipment = self.registry.equipment_or_err(equipment_id)?;
        if !equipment.supports(task_type) {
            return Err(YardError::Validation(format!(
                "{equipment_id} ({}) cannot run {task_type:?} tasks",
                equipment.kind().label()
            )));
        }

        self.registry.claim_equipment(equipment_id, task_id)?;
        if let Err(err) = self.store.get_mut(task_id).and_then(|t| t.assign(equipment_id)) {
            self.registry.release_equipment(equipment_id)?;
            return Err(err);
        }
        Ok(())
    }

    /// Executes a pending task.
    ///
    /// Effect failures end the task in Failed and come back as
    /// [`ExecutionOutcome::Failed`]; `Err` means the task never started.
    pub fn execute_task(&mut self, task_id: &str) -> Result<ExecutionOutcome> {
        let mut ctx = ExecutionContext {
            registry: &mut self.registry,
            store: &mut self.store,
            audit: &mut self.audit,
        };
        let outcome = self
            .executor
            .execute(&mut ctx, task_id)
            .map_err(|e| rejected("execute_task", e))?;

        let (warehouses, equipment) = self.touched_by(task_id);
        self.persist_task(task_id);
        for id in &warehouses {
            self.persist_warehouse(id);
        }
        for id in &equipment {
            self.persist_equipment(id);
        }
        Ok(outcome)
    }

    /// Warehouses and equipment an executed task may have changed.
    fn touched_by(&self, task_id: &str) -> (Vec<String>, Vec<String>) {
        let Some(task) = self.store.get(task_id) else {
            return (Vec::new(), Vec::new());
        };
        let meta = &task.metadata;
        let mut warehouses: Vec<String> = [&meta.source_warehouse_id, &meta.target_warehouse_id]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        let mut equipment: Vec<String> = task.assigned_equipment().map(str::to_string).into_iter().collect();

        match task.task_type {
            TaskType::ShipTransport => warehouses.extend(
                self.registry
                    .warehouses()
                    .filter(|w| w.kind == WarehouseKind::Product)
                    .map(|w| w.id.clone()),
            ),
            TaskType::Loading | TaskType::Unloading => equipment.extend(
                self.registry
                    .all_equipment()
                    .filter(|e| e.is_crane())
                    .map(|e| e.id.clone()),
            ),
            TaskType::InternalTransfer | TaskType::MoveEquipment => {}
        }
        warehouses.sort();
        warehouses.dedup();
        equipment.sort();
        equipment.dedup();
        (warehouses, equipment)
    }

    /// Cancels a pending task and frees its equipment.
    pub fn cancel_task(&mut self, task_id: &str) -> Result<()> {
        let task = self
            .store
            .get_mut(task_id)
            .map_err(|e| rejected("cancel_task", e))?;
        task.cancel(Utc::now())
            .map_err(|e| rejected("cancel_task", e))?;
        let equipment_id = task.assigned_equipment().map(str::to_string);

        if let Some(equipment_id) = &equipment_id {
            self.registry.release_equipment(equipment_id)?;
            self.persist_equipment(equipment_id);
        }
        info!(task_id, "task cancelled");
        self.persist_task(task_id);
        Ok(())
    }

    /// Runs one greedy scheduling pass over the pending tasks.
    pub fn optimize_schedule(&mut self) -> Vec<Dispatch> {
        let dispatches = self.scheduler.dispatch(&mut self.store, &mut self.registry);
        info!(
            assigned = dispatches.len(),
            pending = self.store.count_by_status(TaskStatus::Pending),
            "scheduling pass finished"
        );
        for dispatch in &dispatches {
            self.persist_task(&dispatch.task_id);
            self.persist_equipment(&dispatch.equipment_id);
        }
        dispatches
    }

    // ======================== Queries ========================

    /// Shortest 4-connected route on the yard grid, empty when unreachable.
    pub fn path_query(&self, start: Position, goal: Position) -> Vec<Position> {
        let route = self.registry.grid().find_path(start, goal);
        debug!(%start, %goal, found = !route.is_empty(), "path query");
        route
    }

    pub fn system_status(&self) -> SystemStatus {
        SystemStatus::collect(&self.registry, &self.store)
    }

    pub fn generate_report(&self) -> YardReport {
        YardReport::collect(
            &self.registry,
            &self.store,
            &self.audit,
            self.config.report_log_tail,
        )
    }

    pub fn performance_report(&self) -> PerformanceReport {
        PerformanceReport::collect(&self.registry, &self.store)
    }

    /// A page of the audit log; `limit` defaults to the configured page size.
    pub fn execution_logs(&self, offset: usize, limit: Option<usize>) -> AuditPage {
        self.audit
            .page(offset, limit.unwrap_or(self.config.log_page_size))
    }

    /// Audits the whole yard against its invariants.
    pub fn check_invariants(&self) -> ValidationResult {
        validate_state(&self.registry, &self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::persistence::PersistenceError;
    use chrono::Duration;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn yard() -> Yard {
        let mut yard = Yard::new(YardConfig::default()).unwrap();
        yard.register_product(Product::new("P1", "Steel", 10.0, 5.0))
            .unwrap();
        yard.register_product(Product::new("P2", "Cement", 20.0, 3.0))
            .unwrap();
        yard.register_warehouse(Warehouse::terminal(
            "TW1",
            "Terminal 1",
            Position::new(0, 0),
            1000.0,
        ))
        .unwrap();
        yard.register_warehouse(Warehouse::product(
            "PW1",
            "Store 1",
            Position::new(10, 10),
            2000.0,
        ))
        .unwrap();
        yard.register_warehouse(Warehouse::temporary(
            "TMP1",
            "Staging",
            Position::new(5, 15),
            500.0,
        ))
        .unwrap();
        yard.register_equipment(Equipment::crane("C1", "Crane 1", Position::new(0, 1), "TW1"))
            .unwrap();
        yard.register_equipment(Equipment::frame_truck("T1", "Truck 1", Position::new(5, 5)))
            .unwrap();
        yard.register_equipment(Equipment::frame_truck("T2", "Truck 2", Position::new(9, 9)))
            .unwrap();
        yard
    }

    fn lines(items: &[(&str, u32)]) -> BTreeMap<String, u32> {
        items.iter().map(|&(p, q)| (p.to_string(), q)).collect()
    }

    #[test]
    fn test_path_query_open_grid() {
        let config = YardConfig {
            grid_width: 5,
            grid_height: 5,
            ..Default::default()
        };
        let yard = Yard::new(config).unwrap();
        let path = yard.path_query(Position::new(0, 0), Position::new(4, 4));
        assert_eq!(path.len(), 9);
        assert_eq!(path[0], Position::new(0, 0));
        assert_eq!(path[8], Position::new(4, 4));
    }

    #[test]
    fn test_warehouse_capacity_rejects_without_change() {
        let mut yard = Yard::new(YardConfig::default()).unwrap();
        yard.register_product(Product::new("P1", "Box", 1.0, 2.0))
            .unwrap();
        yard.register_warehouse(Warehouse::temporary("W1", "Small", Position::new(0, 0), 10.0))
            .unwrap();

        yard.warehouse_stock_in("W1", "P1", 4).unwrap();
        let err = yard.warehouse_stock_in("W1", "P1", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);

        let warehouse = yard.registry().warehouse("W1").unwrap();
        assert_eq!(warehouse.quantity_of("P1"), 4);
        assert!((warehouse.current_volume() - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_register_rejects_prestocked_warehouse() {
        let mut yard = yard();
        let mut json = serde_json::to_value(Warehouse::product(
            "W9",
            "Ghost store",
            Position::new(3, 3),
            10.0,
        ))
        .unwrap();
        json["current_volume"] = serde_json::json!(500.0);
        json["products"] = serde_json::json!({ "GHOST": 3 });
        let ghost: Warehouse = serde_json::from_value(json).unwrap();

        let err = yard.register_warehouse(ghost).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(yard.registry().warehouse("W9").is_none());
        assert!(yard.check_invariants().is_ok());
    }

    #[test]
    fn test_crane_capacity_through_loading_tasks() {
        let mut yard = yard();
        let too_heavy = yard
            .create_handling_task(TaskType::Loading, "P1", 6, None)
            .unwrap();
        let outcome = yard.execute_task(&too_heavy).unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                kind: ErrorKind::CapacityExceeded,
                ..
            }
        ));

        let at_limit = yard
            .create_handling_task(TaskType::Loading, "P1", 5, None)
            .unwrap();
        assert!(yard.execute_task(&at_limit).unwrap().is_completed());
        let crane = yard.registry().equipment("C1").unwrap();
        assert!((crane.current_load() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_earlier_deadline_scheduled_first() {
        let mut yard = yard();
        // Only T1 stays available.
        yard.set_equipment_status("T2", EquipmentStatus::Maintenance)
            .unwrap();
        let now = Utc::now();
        let late = yard
            .submit_task(
                Task::new("LATE", TaskType::ShipTransport)
                    .with_deadline(now + Duration::hours(2)),
            )
            .unwrap();
        let early = yard
            .submit_task(
                Task::new("EARLY", TaskType::ShipTransport)
                    .with_deadline(now + Duration::hours(1)),
            )
            .unwrap();

        let dispatches = yard.optimize_schedule();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].task_id, early);
        assert_eq!(yard.task(&late).unwrap().assigned_equipment(), None);
    }

    #[test]
    fn test_failed_transfer_keeps_target_and_frees_truck() {
        let mut yard = yard();
        yard.warehouse_stock_in("TW1", "P1", 5).unwrap();
        let task_id = yard
            .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 10)]))
            .unwrap();
        yard.optimize_schedule();
        let truck = yard
            .task(&task_id)
            .unwrap()
            .assigned_equipment()
            .unwrap()
            .to_string();

        let outcome = yard.execute_task(&task_id).unwrap();
        assert!(!outcome.is_completed());

        let task = yard.task(&task_id).unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.metadata.failure_kind, Some(ErrorKind::InsufficientStock));
        assert!(task.metadata.failure_reason.is_some());
        assert_eq!(yard.registry().warehouse("PW1").unwrap().quantity_of("P1"), 0);
        assert!(yard.registry().equipment(&truck).unwrap().is_idle());
        assert!(yard.check_invariants().is_ok());
    }

    #[test]
    fn test_no_equipment_assigned_twice() {
        let mut yard = yard();
        for _ in 0..5 {
            yard.create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 1)]))
                .unwrap();
        }
        for _ in 0..3 {
            yard.create_handling_task(TaskType::Loading, "P2", 1, Some(2))
                .unwrap();
        }

        let dispatches = yard.optimize_schedule();
        // Two trucks and one crane.
        assert_eq!(dispatches.len(), 3);
        let distinct: HashSet<&str> = dispatches.iter().map(|d| d.equipment_id.as_str()).collect();
        assert_eq!(distinct.len(), dispatches.len());
        assert!(yard.check_invariants().is_ok());

        // A second pass finds nothing idle.
        assert!(yard.optimize_schedule().is_empty());
    }

    #[test]
    fn test_schedule_is_deterministic() {
        fn run() -> Vec<String> {
            let mut yard = yard();
            for (i, priority) in [1, 3, 2, 3, 1].into_iter().enumerate() {
                yard.submit_task(
                    Task::new(format!("J{i}"), TaskType::InternalTransfer)
                        .with_priority(priority)
                        .with_metadata(TaskMetadata {
                            source_warehouse_id: Some("TW1".into()),
                            target_warehouse_id: Some("PW1".into()),
                            ..Default::default()
                        }),
                )
                .unwrap();
            }
            yard.optimize_schedule()
                .into_iter()
                .map(|d| format!("{}:{}", d.task_id, d.equipment_id))
                .collect()
        }

        let first = run();
        assert_eq!(first, vec!["J1:T1", "J3:T2"]);
        assert_eq!(first, run());
    }

    #[test]
    fn test_ship_plan_end_to_end() {
        let mut yard = yard();
        yard.warehouse_stock_in("PW1", "P1", 30).unwrap();
        yard.warehouse_stock_in("PW1", "P2", 10).unwrap();

        let plan = ShipPlan::new("SP1", Utc::now() + Duration::hours(6))
            .with_product("P1", 20)
            .with_product("P2", 5)
            .with_priority(3)
            .with_ship("Ever Given", "Rotterdam");
        let task_id = yard.create_ship_transport_task(plan).unwrap();

        let task = yard.task(&task_id).unwrap();
        assert_eq!(task.priority, 3);
        assert_eq!(task.tree_size(), 5);
        assert_eq!(task.sub_tasks[0].task_type, TaskType::Loading);
        assert_eq!(task.sub_tasks[1].task_type, TaskType::ShipTransport);
        assert_eq!(task.sub_tasks[1].metadata.products, lines(&[("P1", 20)]));
        assert_eq!(task.metadata.ship_name.as_deref(), Some("Ever Given"));
        assert!(yard.ship_plan("SP1").is_some());

        let dispatches = yard.optimize_schedule();
        assert_eq!(dispatches.len(), 1);
        assert!(yard.execute_task(&task_id).unwrap().is_completed());

        let store = yard.registry().warehouse("PW1").unwrap();
        assert_eq!(store.quantity_of("P1"), 10);
        assert_eq!(store.quantity_of("P2"), 5);
        assert_eq!(yard.audit().len(), 2);

        let report = yard.generate_report();
        assert_eq!(report.performance.completed_tasks, 1);
        assert!((report.performance.success_rate - 100.0).abs() < 1e-10);
        assert_eq!(report.recent_logs.len(), 2);
        assert_eq!(report.system_overview.equipment_status.busy, 0);
    }

    #[test]
    fn test_ship_plan_unknown_product() {
        let mut yard = yard();
        let plan = ShipPlan::new("SP1", Utc::now()).with_product("P9", 1);
        let err = yard.create_ship_transport_task(plan).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(yard.store().is_empty());
        assert!(yard.ship_plan("SP1").is_none());
    }

    #[test]
    fn test_assign_checks_capability_and_status() {
        let mut yard = yard();
        let task_id = yard
            .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 1)]))
            .unwrap();

        let err = yard.assign_equipment(&task_id, "C1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(yard.registry().equipment("C1").unwrap().is_idle());

        yard.assign_equipment(&task_id, "T2").unwrap();
        let err = yard.assign_equipment(&task_id, "T1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let other = yard
            .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 1)]))
            .unwrap();
        let err = yard.assign_equipment(&other, "T2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!(yard.check_invariants().is_ok());
    }

    #[test]
    fn test_cancel_releases_equipment() {
        let mut yard = yard();
        let task_id = yard
            .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 1)]))
            .unwrap();
        yard.assign_equipment(&task_id, "T1").unwrap();
        yard.cancel_task(&task_id).unwrap();

        assert_eq!(yard.task(&task_id).unwrap().status(), TaskStatus::Cancelled);
        assert!(yard.registry().equipment("T1").unwrap().is_idle());
        assert!(yard.cancel_task(&task_id).is_err());
        assert!(yard.execute_task(&task_id).is_err());
        assert!(yard.check_invariants().is_ok());
    }

    #[test]
    fn test_move_equipment_and_move_task() {
        let mut yard = yard();
        let route = yard.move_equipment("T1", Position::new(5, 8)).unwrap();
        assert_eq!(route.len(), 4);
        assert_eq!(
            yard.registry().equipment("T1").unwrap().position(),
            Position::new(5, 8)
        );
        assert!(!yard.registry().grid().is_obstacle(Position::new(5, 5)));

        let task_id = yard
            .create_move_equipment_task(Position::new(0, 5), Some(2))
            .unwrap();
        // Only cranes can run move tasks.
        let dispatches = yard.optimize_schedule();
        assert_eq!(dispatches[0].equipment_id, "C1");
        assert!(yard.execute_task(&task_id).unwrap().is_completed());
        assert_eq!(
            yard.registry().equipment("C1").unwrap().position(),
            Position::new(0, 5)
        );
        assert_eq!(yard.audit().len(), 1);
    }

    #[test]
    fn test_move_task_outside_grid_rejected() {
        let mut yard = yard();
        let err = yard
            .create_move_equipment_task(Position::new(50, 0), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_execution_logs_paging() {
        let mut yard = yard();
        yard.warehouse_stock_in("TW1", "P1", 100).unwrap();
        for _ in 0..3 {
            let id = yard
                .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 1)]))
                .unwrap();
            yard.execute_task(&id).unwrap();
        }
        let page = yard.execution_logs(1, None);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.limit, 50);
        assert_eq!(yard.execution_logs(0, Some(1)).entries.len(), 1);
    }

    #[test]
    fn test_performance_report_by_type() {
        let mut yard = yard();
        yard.warehouse_stock_in("TW1", "P1", 10).unwrap();
        let ok = yard
            .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 5)]))
            .unwrap();
        let bad = yard
            .create_internal_transfer_task("TW1", "PW1", lines(&[("P1", 50)]))
            .unwrap();
        yard.execute_task(&ok).unwrap();
        yard.execute_task(&bad).unwrap();

        let report = yard.performance_report();
        assert_eq!(report.total_tasks, 2);
        let stats = report.task_type_statistics[&TaskType::InternalTransfer];
        assert_eq!((stats.total, stats.completed, stats.failed), (2, 1, 1));
        assert!((report.success_rate - 50.0).abs() < 1e-10);
        assert_eq!(report.equipment_status.len(), 3);
    }

    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl PersistenceSink for RecordingSink {
        fn record(&mut self, snapshot: EntitySnapshot<'_>) -> std::result::Result<(), PersistenceError> {
            self.0.lock().push(snapshot.id().to_string());
            Ok(())
        }
    }

    struct FailingSink;

    impl PersistenceSink for FailingSink {
        fn record(&mut self, _snapshot: EntitySnapshot<'_>) -> std::result::Result<(), PersistenceError> {
            Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "database down",
            )))
        }
    }

    #[test]
    fn test_sink_sees_mutations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut yard = Yard::new(YardConfig::default())
            .unwrap()
            .with_sink(Box::new(RecordingSink(Arc::clone(&seen))));
        yard.register_product(Product::new("P1", "Steel", 1.0, 1.0))
            .unwrap();
        yard.register_warehouse(Warehouse::product("W1", "Store", Position::new(1, 1), 100.0))
            .unwrap();
        yard.warehouse_stock_in("W1", "P1", 3).unwrap();
        assert!(yard.warehouse_stock_in("W1", "P1", 1000).is_err());

        assert_eq!(*seen.lock(), vec!["P1", "W1", "W1"]);
    }

    #[test]
    fn test_sink_failure_does_not_abort() {
        let mut yard = Yard::new(YardConfig::default())
            .unwrap()
            .with_sink(Box::new(FailingSink));
        let id = yard
            .register_product(Product::new("", "Steel", 1.0, 1.0))
            .unwrap();
        assert!(id.starts_with('P'));
        assert!(yard.registry().product(&id).is_some());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = YardConfig {
            grid_width: 0,
            ..Default::default()
        };
        assert!(Yard::new(config).is_err());
    }
}
