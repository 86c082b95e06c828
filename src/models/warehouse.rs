//! Warehouse model.
//!
//! A warehouse is a fixed storage cell on the grid with a volume capacity.
//! Stock changes only through [`Warehouse::add_product`] and
//! [`Warehouse::remove_product`], which check before they mutate.
//!
//! # Invariant
//! `current_volume == Σ(quantity × unit_volume)` and
//! `0 ≤ current_volume ≤ capacity`. Entries never hold a zero quantity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Position;
use crate::error::{Result, YardError};

/// Relative slack on capacity checks, absorbing rounding in volume sums.
const CAPACITY_TOLERANCE: f64 = 1e-9;

/// Warehouse classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarehouseKind {
    /// Quay-side buffer where goods arrive and leave by ship.
    Terminal,
    /// Finished-goods store; ship transports draw from these.
    Product,
    /// Short-term staging area.
    Temporary,
}

/// A storage location with a volume capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    /// Unique warehouse identifier. Empty = generated on registration.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Variant discriminator.
    pub kind: WarehouseKind,
    /// Grid cell.
    pub position: Position,
    capacity: f64,
    current_volume: f64,
    products: BTreeMap<String, u32>,
}

impl Warehouse {
    /// Creates an empty warehouse.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: WarehouseKind,
        position: Position,
        capacity: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position,
            capacity,
            current_volume: 0.0,
            products: BTreeMap::new(),
        }
    }

    /// Creates a terminal warehouse.
    pub fn terminal(
        id: impl Into<String>,
        name: impl Into<String>,
        position: Position,
        capacity: f64,
    ) -> Self {
        Self::new(id, name, WarehouseKind::Terminal, position, capacity)
    }

    /// Creates a finished-goods warehouse.
    pub fn product(
        id: impl Into<String>,
        name: impl Into<String>,
        position: Position,
        capacity: f64,
    ) -> Self {
        Self::new(id, name, WarehouseKind::Product, position, capacity)
    }

    /// Creates a temporary warehouse.
    pub fn temporary(
        id: impl Into<String>,
        name: impl Into<String>,
        position: Position,
        capacity: f64,
    ) -> Self {
        Self::new(id, name, WarehouseKind::Temporary, position, capacity)
    }

    /// Volume capacity.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Volume currently occupied.
    pub fn current_volume(&self) -> f64 {
        self.current_volume
    }

    /// Free volume.
    pub fn available_capacity(&self) -> f64 {
        self.capacity - self.current_volume
    }

    /// Occupied volume as a percentage of capacity (0 when capacity is 0).
    pub fn utilization_rate(&self) -> f64 {
        if self.capacity > 0.0 {
            self.current_volume / self.capacity * 100.0
        } else {
            0.0
        }
    }

    /// Stock per product id.
    pub fn products(&self) -> &BTreeMap<String, u32> {
        &self.products
    }

    /// Units held of a product (0 if absent).
    pub fn quantity_of(&self, product_id: &str) -> u32 {
        self.products.get(product_id).copied().unwrap_or(0)
    }

    /// Checks whether `quantity` units of `unit_volume` would fit.
    pub fn check_add(&self, quantity: u32, unit_volume: f64) -> Result<()> {
        check_quantity(quantity, unit_volume)?;
        let total = unit_volume * f64::from(quantity);
        let slack = CAPACITY_TOLERANCE * self.capacity.max(1.0);
        if self.current_volume + total > self.capacity + slack {
            return Err(YardError::CapacityExceeded {
                holder_id: self.id.clone(),
                requested: total,
                available: self.available_capacity(),
            });
        }
        Ok(())
    }

    /// Checks whether `quantity` units of a product can be removed.
    pub fn check_remove(&self, product_id: &str, quantity: u32, unit_volume: f64) -> Result<()> {
        check_quantity(quantity, unit_volume)?;
        let held = self.quantity_of(product_id);
        if held < quantity {
            return Err(YardError::InsufficientStock {
                holder_id: self.id.clone(),
                product_id: product_id.to_string(),
                requested: quantity,
                available: held,
            });
        }
        Ok(())
    }

    /// Stocks `quantity` units. Rejected without change if capacity would be exceeded.
    pub fn add_product(&mut self, product_id: &str, quantity: u32, unit_volume: f64) -> Result<()> {
        self.check_add(quantity, unit_volume)?;
        *self.products.entry(product_id.to_string()).or_insert(0) += quantity;
        // A sum that rounds past capacity within the slack is a full warehouse.
        let added = unit_volume * f64::from(quantity);
        self.current_volume = (self.current_volume + added).min(self.capacity);
        Ok(())
    }

    /// Removes `quantity` units. Rejected without change if stock is insufficient.
    pub fn remove_product(
        &mut self,
        product_id: &str,
        quantity: u32,
        unit_volume: f64,
    ) -> Result<()> {
        self.check_remove(product_id, quantity, unit_volume)?;
        if let Some(held) = self.products.get_mut(product_id) {
            *held -= quantity;
            if *held == 0 {
                self.products.remove(product_id);
            }
        }
        // Clamp float drift; an empty warehouse holds exactly zero volume.
        self.current_volume = if self.products.is_empty() {
            0.0
        } else {
            (self.current_volume - unit_volume * f64::from(quantity)).max(0.0)
        };
        Ok(())
    }
}

fn check_quantity(quantity: u32, unit_volume: f64) -> Result<()> {
    if quantity == 0 {
        return Err(YardError::Validation("quantity must be positive".into()));
    }
    if !unit_volume.is_finite() || unit_volume < 0.0 {
        return Err(YardError::Validation(format!(
            "unit volume must be a non-negative number, got {unit_volume}"
        )));
    }
    Ok(())
}
