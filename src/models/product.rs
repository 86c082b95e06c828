//! Product catalog entries.

use serde::{Deserialize, Serialize};

/// A product kind handled in the yard.
///
/// Products are immutable once registered; an update replaces the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier. Empty = generated on registration.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Unit weight (t). Counted against equipment capacity.
    pub weight: f64,
    /// Unit volume (m³). Counted against warehouse capacity.
    pub volume: f64,
    /// Free-form category.
    pub category: String,
    /// Unit price.
    pub unit_price: f64,
}

impl Product {
    /// Creates a product in the `default` category.
    pub fn new(id: impl Into<String>, name: impl Into<String>, weight: f64, volume: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight,
            volume,
            category: "default".to_string(),
            unit_price: 0.0,
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the unit price.
    pub fn with_unit_price(mut self, unit_price: f64) -> Self {
        self.unit_price = unit_price;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_builder() {
        let p = Product::new("P001", "Steel", 10.0, 5.0)
            .with_category("metal")
            .with_unit_price(5000.0);

        assert_eq!(p.id, "P001");
        assert_eq!(p.category, "metal");
        assert!((p.weight - 10.0).abs() < 1e-10);
        assert!((p.unit_price - 5000.0).abs() < 1e-10);
    }

    #[test]
    fn test_default_category() {
        let p = Product::new("P", "Cement", 8.0, 4.0);
        assert_eq!(p.category, "default");
        assert!((p.unit_price - 0.0).abs() < 1e-10);
    }
}
