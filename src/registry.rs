//! Resource registry.
//!
//! Owns the product catalog, warehouses and equipment, keyed by id and
//! iterated in ascending id order. The registry also owns the yard grid:
//! every registered piece of equipment blocks the cell it stands on.
//!
//! All capacity-bearing state changes go through this type. Each command
//! checks first and mutates only when every check passed, so a rejected
//! command leaves the registry unchanged.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{EntityKind, Result, YardError};
use crate::models::id::ensure_id;
use crate::models::{Equipment, EquipmentKind, EquipmentStatus, Position, Product, Warehouse};
use crate::planner::GridMap;
use crate::validation;

/// Catalog of products, warehouses and equipment.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    grid: GridMap,
    products: BTreeMap<String, Product>,
    warehouses: BTreeMap<String, Warehouse>,
    equipment: BTreeMap<String, Equipment>,
}

impl ResourceRegistry {
    /// Creates an empty registry over `grid`.
    pub fn new(grid: GridMap) -> Self {
        Self {
            grid,
            products: BTreeMap::new(),
            warehouses: BTreeMap::new(),
            equipment: BTreeMap::new(),
        }
    }

    /// The yard grid, with equipment cells marked as obstacles.
    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    // ======================== Registration ========================

    /// Registers a product, generating an id if it has none.
    pub fn add_product(&mut self, mut product: Product) -> Result<String> {
        ensure_id(&mut product.id, "P");
        validation::validate_product(&product)?;
        if self.products.contains_key(&product.id) {
            return Err(duplicate(EntityKind::Product, &product.id));
        }
        info!(product_id = %product.id, name = %product.name, "product registered");
        let id = product.id.clone();
        self.products.insert(id.clone(), product);
        Ok(id)
    }

    /// Replaces an existing product.
    ///
    /// A product that is in stock somewhere keeps its unit volume, and one
    /// carried on a frame keeps its unit weight, since warehouse volumes and
    /// frame loads were accounted with them. Crane loads are weight-only and
    /// do not record which products make them up.
    pub fn update_product(&mut self, product: Product) -> Result<()> {
        validation::validate_product(&product)?;
        let current = self.product_or_err(&product.id)?;
        let volume_changed = (current.volume - product.volume).abs() > f64::EPSILON;
        let weight_changed = (current.weight - product.weight).abs() > f64::EPSILON;
        if volume_changed && self.is_stocked(&product.id) {
            return Err(YardError::StateConflict(format!(
                "product {} is in stock; its unit volume cannot change",
                product.id
            )));
        }
        if weight_changed && self.is_carried(&product.id) {
            return Err(YardError::StateConflict(format!(
                "product {} is carried on a frame; its unit weight cannot change",
                product.id
            )));
        }
        info!(product_id = %product.id, "product updated");
        self.products.insert(product.id.clone(), product);
        Ok(())
    }

    /// Registers a warehouse, generating an id if it has none.
    pub fn add_warehouse(&mut self, mut warehouse: Warehouse) -> Result<String> {
        ensure_id(&mut warehouse.id, "W");
        validation::validate_warehouse(&warehouse, &self.grid)?;
        if self.warehouses.contains_key(&warehouse.id) {
            return Err(duplicate(EntityKind::Warehouse, &warehouse.id));
        }
        info!(
            warehouse_id = %warehouse.id,
            kind = ?warehouse.kind,
            position = %warehouse.position,
            "warehouse registered"
        );
        let id = warehouse.id.clone();
        self.warehouses.insert(id.clone(), warehouse);
        Ok(id)
    }

    /// Registers equipment and blocks its starting cell.
    pub fn add_equipment(&mut self, mut equipment: Equipment) -> Result<String> {
        ensure_id(&mut equipment.id, "E");
        validation::validate_equipment(&equipment, &self.grid)?;
        if self.equipment.contains_key(&equipment.id) {
            return Err(duplicate(EntityKind::Equipment, &equipment.id));
        }
        if let EquipmentKind::Crane { warehouse_id } = equipment.kind() {
            self.warehouse_or_err(warehouse_id)?;
        }
        self.grid.add_obstacle(equipment.position());
        info!(
            equipment_id = %equipment.id,
            kind = equipment.kind().label(),
            position = %equipment.position(),
            "equipment registered"
        );
        let id = equipment.id.clone();
        self.equipment.insert(id.clone(), equipment);
        Ok(id)
    }

    // ======================== Lookup ========================

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    pub fn warehouse(&self, id: &str) -> Option<&Warehouse> {
        self.warehouses.get(id)
    }

    pub fn equipment(&self, id: &str) -> Option<&Equipment> {
        self.equipment.get(id)
    }

    pub fn product_or_err(&self, id: &str) -> Result<&Product> {
        self.products
            .get(id)
            .ok_or_else(|| YardError::not_found(EntityKind::Product, id))
    }

    pub fn warehouse_or_err(&self, id: &str) -> Result<&Warehouse> {
        self.warehouses
            .get(id)
            .ok_or_else(|| YardError::not_found(EntityKind::Warehouse, id))
    }

    pub fn equipment_or_err(&self, id: &str) -> Result<&Equipment> {
        self.equipment
            .get(id)
            .ok_or_else(|| YardError::not_found(EntityKind::Equipment, id))
    }

    /// Products in ascending id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Warehouses in ascending id order.
    pub fn warehouses(&self) -> impl Iterator<Item = &Warehouse> {
        self.warehouses.values()
    }

    /// Equipment in ascending id order.
    pub fn all_equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.values()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn warehouse_count(&self) -> usize {
        self.warehouses.len()
    }

    pub fn equipment_count(&self) -> usize {
        self.equipment.len()
    }

    fn is_stocked(&self, product_id: &str) -> bool {
        self.warehouses
            .values()
            .any(|w| w.quantity_of(product_id) > 0)
    }

    fn is_carried(&self, product_id: &str) -> bool {
        self.equipment
            .values()
            .filter_map(Equipment::carried_products)
            .any(|products| products.contains_key(product_id))
    }

    // ======================== Inventory ========================

    /// Adds stock of a registered product to a warehouse.
    pub fn stock_in(&mut self, warehouse_id: &str, product_id: &str, quantity: u32) -> Result<()> {
        let volume = self.product_or_err(product_id)?.volume;
        let warehouse = self.warehouse_mut(warehouse_id)?;
        warehouse.add_product(product_id, quantity, volume)?;
        debug!(warehouse_id, product_id, quantity, "stock in");
        Ok(())
    }

    /// Removes stock of a registered product from a warehouse.
    pub fn stock_out(&mut self, warehouse_id: &str, product_id: &str, quantity: u32) -> Result<()> {
        let volume = self.product_or_err(product_id)?.volume;
        let warehouse = self.warehouse_mut(warehouse_id)?;
        warehouse.remove_product(product_id, quantity, volume)?;
        debug!(warehouse_id, product_id, quantity, "stock out");
        Ok(())
    }

    /// Moves stock between two warehouses as one step: either both sides
    /// change or neither does.
    pub fn transfer(
        &mut self,
        source_id: &str,
        target_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<()> {
        if source_id == target_id {
            return Err(YardError::Validation(format!(
                "transfer source and target are both {source_id}"
            )));
        }
        let volume = self.product_or_err(product_id)?.volume;
        self.warehouse_or_err(source_id)?
            .check_remove(product_id, quantity, volume)?;
        self.warehouse_or_err(target_id)?
            .check_add(quantity, volume)?;

        self.warehouse_mut(source_id)?
            .remove_product(product_id, quantity, volume)?;
        self.warehouse_mut(target_id)?
            .add_product(product_id, quantity, volume)?;
        debug!(source_id, target_id, product_id, quantity, "stock transferred");
        Ok(())
    }

    /// Loads a registered product onto equipment.
    pub fn load_equipment(&mut self, equipment_id: &str, product_id: &str, quantity: u32) -> Result<()> {
        let weight = self.product_or_err(product_id)?.weight;
        self.equipment_mut(equipment_id)?
            .load(product_id, quantity, weight)
    }

    /// Unloads a registered product from equipment.
    pub fn unload_equipment(
        &mut self,
        equipment_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<()> {
        let weight = self.product_or_err(product_id)?.weight;
        self.equipment_mut(equipment_id)?
            .unload(product_id, quantity, weight)
    }

    // ======================== Equipment state ========================

    /// Claims Idle equipment for a task (Idle → Busy as one step).
    pub fn claim_equipment(&mut self, equipment_id: &str, task_id: &str) -> Result<()> {
        self.equipment_mut(equipment_id)?.claim(task_id)
    }

    /// Returns equipment to Idle and clears its task.
    pub fn release_equipment(&mut self, equipment_id: &str) -> Result<()> {
        self.equipment_mut(equipment_id)?.release();
        Ok(())
    }

    /// Puts equipment into Idle, Maintenance or Error.
    pub fn set_equipment_status(&mut self, equipment_id: &str, status: EquipmentStatus) -> Result<()> {
        self.equipment_mut(equipment_id)?.set_status(status)?;
        info!(equipment_id, ?status, "equipment status changed");
        Ok(())
    }

    /// Attaches a frame to a frame truck.
    pub fn attach_frame(&mut self, truck_id: &str, frame_id: &str) -> Result<()> {
        let frame = self.equipment_or_err(frame_id)?;
        if frame.carried_products().is_none() {
            return Err(YardError::Validation(format!(
                "{frame_id} is a {}, not a frame",
                frame.kind().label()
            )));
        }
        if let Some(holder) = self
            .equipment
            .values()
            .find(|e| e.attached_frame_id() == Some(frame_id))
        {
            return Err(YardError::StateConflict(format!(
                "frame {frame_id} is already hauled by {}",
                holder.id
            )));
        }
        self.equipment_mut(truck_id)?.attach_frame(frame_id)?;
        info!(truck_id, frame_id, "frame attached");
        Ok(())
    }

    /// Detaches the frame from a frame truck, returning its id.
    pub fn detach_frame(&mut self, truck_id: &str) -> Result<String> {
        let frame_id = self.equipment_mut(truck_id)?.detach_frame()?;
        info!(truck_id, frame_id = %frame_id, "frame detached");
        Ok(frame_id)
    }

    /// Moves Idle equipment to `target` along a shortest route.
    pub fn move_equipment(&mut self, equipment_id: &str, target: Position) -> Result<Vec<Position>> {
        let equipment = self.equipment_or_err(equipment_id)?;
        if !equipment.is_idle() {
            return Err(YardError::StateConflict(format!(
                "{equipment_id} is {:?}, only Idle equipment moves on request",
                equipment.status()
            )));
        }
        self.relocate(equipment_id, target)
    }

    /// Moves equipment to `target` regardless of status, keeping its
    /// obstacle cell in step. Returns the route taken.
    pub(crate) fn relocate(&mut self, equipment_id: &str, target: Position) -> Result<Vec<Position>> {
        if !self.grid.contains(target) {
            return Err(YardError::Validation(format!(
                "target {target} lies outside the {}x{} grid",
                self.grid.width(),
                self.grid.height()
            )));
        }
        let from = self.equipment_or_err(equipment_id)?.position();
        if target != from && !self.grid.is_free(target) {
            return Err(YardError::Validation(format!(
                "target {target} is occupied by other equipment"
            )));
        }
        let route = self.grid.find_path_from_occupied(from, target);
        if route.is_empty() {
            return Err(YardError::Validation(format!(
                "no route from {from} to {target}"
            )));
        }
        self.grid.remove_obstacle(from);
        self.grid.add_obstacle(target);
        self.equipment_mut(equipment_id)?.set_position(target);
        info!(equipment_id, %from, %target, steps = route.len() - 1, "equipment moved");
        Ok(route)
    }

    fn warehouse_mut(&mut self, id: &str) -> Result<&mut Warehouse> {
        self.warehouses
            .get_mut(id)
            .ok_or_else(|| YardError::not_found(EntityKind::Warehouse, id))
    }

    fn equipment_mut(&mut self, id: &str) -> Result<&mut Equipment> {
        self.equipment
            .get_mut(id)
            .ok_or_else(|| YardError::not_found(EntityKind::Equipment, id))
    }
}

fn duplicate(entity: EntityKind, id: &str) -> YardError {
    YardError::StateConflict(format!("{entity} {id} is already registered"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn registry() -> ResourceRegistry {
        let mut r = ResourceRegistry::new(GridMap::new(20, 20));
        r.add_product(Product::new("P1", "Steel", 10.0, 2.0)).unwrap();
        r.add_warehouse(Warehouse::terminal("W1", "Terminal", Position::new(0, 0), 10.0))
            .unwrap();
        r.add_warehouse(Warehouse::product("W2", "Store", Position::new(10, 10), 100.0))
            .unwrap();
        r
    }

    #[test]
    fn test_generated_ids() {
        let mut r = registry();
        let id = r.add_product(Product::new("", "Wood", 5.0, 8.0)).unwrap();
        assert!(id.starts_with('P'));
        assert!(r.product(&id).is_some());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut r = registry();
        let err = r
            .add_product(Product::new("P1", "Other", 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(r.product("P1").unwrap().name, "Steel");
        assert_eq!(r.product_count(), 1);
    }

    #[test]
    fn test_equipment_blocks_cell() {
        let mut r = registry();
        r.add_equipment(Equipment::crane("C1", "Crane", Position::new(0, 1), "W1"))
            .unwrap();
        assert!(r.grid().is_obstacle(Position::new(0, 1)));
    }

    #[test]
    fn test_crane_needs_known_warehouse() {
        let mut r = registry();
        let err = r
            .add_equipment(Equipment::crane("C1", "Crane", Position::new(0, 1), "W9"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!r.grid().is_obstacle(Position::new(0, 1)));
    }

    #[test]
    fn test_stock_capacity() {
        let mut r = registry();
        r.stock_in("W1", "P1", 4).unwrap();
        let err = r.stock_in("W1", "P1", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        let w = r.warehouse("W1").unwrap();
        assert_eq!(w.quantity_of("P1"), 4);
        assert!((w.current_volume() - 8.0).abs() < 1e-10);

        assert_eq!(
            r.stock_in("W9", "P1", 1).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            r.stock_in("W1", "P9", 1).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_transfer_atomic() {
        let mut r = registry();
        r.stock_in("W2", "P1", 10).unwrap();
        // W1 holds at most 5 units of P1.
        let err = r.transfer("W2", "W1", "P1", 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(r.warehouse("W2").unwrap().quantity_of("P1"), 10);
        assert_eq!(r.warehouse("W1").unwrap().quantity_of("P1"), 0);

        r.transfer("W2", "W1", "P1", 5).unwrap();
        assert_eq!(r.warehouse("W2").unwrap().quantity_of("P1"), 5);
        assert_eq!(r.warehouse("W1").unwrap().quantity_of("P1"), 5);

        assert_eq!(
            r.transfer("W1", "W1", "P1", 1).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_update_product_volume_guard() {
        let mut r = registry();
        r.update_product(Product::new("P1", "Steel bar", 10.0, 3.0))
            .unwrap();
        r.stock_in("W2", "P1", 1).unwrap();
        let err = r
            .update_product(Product::new("P1", "Steel", 10.0, 1.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        r.update_product(Product::new("P1", "Steel", 12.0, 3.0).with_unit_price(9.0))
            .unwrap();
        assert_eq!(
            r.update_product(Product::new("P9", "Ghost", 1.0, 1.0))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_update_product_weight_guard() {
        let mut r = registry();
        r.add_equipment(Equipment::frame("F1", "Frame", Position::new(5, 6)))
            .unwrap();
        r.load_equipment("F1", "P1", 5).unwrap();

        let err = r
            .update_product(Product::new("P1", "Steel", 1.0, 2.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert!((r.product("P1").unwrap().weight - 10.0).abs() < 1e-10);

        // Renaming keeps the weight and stays allowed.
        r.update_product(Product::new("P1", "Steel coil", 10.0, 2.0))
            .unwrap();

        r.unload_equipment("F1", "P1", 5).unwrap();
        let frame = r.equipment("F1").unwrap();
        assert!(frame.carried_products().unwrap().is_empty());
        assert_eq!(frame.current_load(), 0.0);

        r.update_product(Product::new("P1", "Steel coil", 1.0, 2.0))
            .unwrap();
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "Truck", Position::new(5, 5)))
            .unwrap();
        r.claim_equipment("T1", "TASK1").unwrap();
        let err = r.claim_equipment("T1", "TASK2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(r.equipment("T1").unwrap().current_task_id(), Some("TASK1"));

        r.release_equipment("T1").unwrap();
        r.claim_equipment("T1", "TASK2").unwrap();
    }

    #[test]
    fn test_attach_frame_rules() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "Truck 1", Position::new(5, 5)))
            .unwrap();
        r.add_equipment(Equipment::frame_truck("T2", "Truck 2", Position::new(6, 5)))
            .unwrap();
        r.add_equipment(Equipment::frame("F1", "Frame", Position::new(5, 6)))
            .unwrap();

        assert_eq!(
            r.attach_frame("T1", "T2").unwrap_err().kind(),
            ErrorKind::Validation
        );
        r.attach_frame("T1", "F1").unwrap();
        assert_eq!(
            r.attach_frame("T2", "F1").unwrap_err().kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(r.detach_frame("T1").unwrap(), "F1");
        r.attach_frame("T2", "F1").unwrap();
    }

    #[test]
    fn test_move_equipment() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "Truck", Position::new(0, 5)))
            .unwrap();
        let route = r.move_equipment("T1", Position::new(3, 5)).unwrap();
        assert_eq!(route.len(), 4);
        assert_eq!(r.equipment("T1").unwrap().position(), Position::new(3, 5));
        assert!(r.grid().is_obstacle(Position::new(3, 5)));
        assert!(!r.grid().is_obstacle(Position::new(0, 5)));

        assert_eq!(
            r.move_equipment("T1", Position::new(30, 5)).unwrap_err().kind(),
            ErrorKind::Validation
        );
        r.claim_equipment("T1", "TASK1").unwrap();
        assert_eq!(
            r.move_equipment("T1", Position::new(4, 5)).unwrap_err().kind(),
            ErrorKind::StateConflict
        );
    }

    #[test]
    fn test_move_blocked_by_other_equipment() {
        let mut r = registry();
        r.add_equipment(Equipment::frame_truck("T1", "Truck", Position::new(0, 5)))
            .unwrap();
        r.add_equipment(Equipment::frame_truck("T2", "Truck", Position::new(2, 5)))
            .unwrap();
        let err = r.move_equipment("T1", Position::new(2, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("occupied"));
        assert_eq!(r.equipment("T1").unwrap().position(), Position::new(0, 5));

        // Staying put is a zero-step route, not a collision with itself.
        let route = r.move_equipment("T1", Position::new(0, 5)).unwrap();
        assert_eq!(route, vec![Position::new(0, 5)]);
        assert!(r.grid().is_obstacle(Position::new(0, 5)));
    }
}
