//! Ship plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An outbound shipping manifest. Read-only input to ship transport tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipPlan {
    /// Unique plan identifier. Empty = generated on registration.
    pub id: String,
    /// Product id → quantity to ship.
    pub products: BTreeMap<String, u32>,
    pub deadline: DateTime<Utc>,
    /// Higher = more urgent.
    pub priority: i32,
    pub ship_name: String,
    pub destination: String,
    pub created_at: DateTime<Utc>,
}

impl ShipPlan {
    /// Creates a plan with priority 1.
    pub fn new(id: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            products: BTreeMap::new(),
            deadline,
            priority: 1,
            ship_name: String::new(),
            destination: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product line (quantities for the same product accumulate).
    pub fn with_product(mut self, product_id: impl Into<String>, quantity: u32) -> Self {
        *self.products.entry(product_id.into()).or_insert(0) += quantity;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_ship(mut self, ship_name: impl Into<String>, destination: impl Into<String>) -> Self {
        self.ship_name = ship_name.into();
        self.destination = destination.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ship_plan_builder() {
        let plan = ShipPlan::new("SP001", Utc::now() + Duration::hours(4))
            .with_product("P3", 20)
            .with_product("P1", 5)
            .with_product("P3", 1)
            .with_priority(2)
            .with_ship("Freighter 001", "Shanghai");

        assert_eq!(plan.products["P3"], 21);
        assert_eq!(plan.products["P1"], 5);
        assert_eq!(plan.priority, 2);
        assert_eq!(plan.destination, "Shanghai");
        let order: Vec<_> = plan.products.keys().cloned().collect();
        assert_eq!(order, vec!["P1".to_string(), "P3".to_string()]);
    }
}
