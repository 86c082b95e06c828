//! Error taxonomy for yard operations.
//!
//! Every registry, store and executor boundary returns [`Result`]. A failed
//! path search is not an error: it is an empty route.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, YardError>;

/// Entity families addressed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Product,
    Warehouse,
    Equipment,
    Task,
    ShipPlan,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Product => "product",
            Self::Warehouse => "warehouse",
            Self::Equipment => "equipment",
            Self::Task => "task",
            Self::ShipPlan => "ship plan",
        };
        f.write_str(name)
    }
}

/// A rejected yard command.
///
/// Commands that return this error leave all state untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum YardError {
    /// Malformed input (negative capacity, position outside the grid, ...).
    #[error("invalid input: {0}")]
    Validation(String),

    /// A warehouse or equipment mutation would break its capacity bound.
    #[error("capacity exceeded on {holder_id}: requested {requested}, available {available}")]
    CapacityExceeded {
        holder_id: String,
        requested: f64,
        available: f64,
    },

    /// Unknown id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// The entity is not in a state that permits the command.
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// A removal asks for more units than are held.
    #[error("insufficient stock of {product_id} in {holder_id}: requested {requested}, available {available}")]
    InsufficientStock {
        holder_id: String,
        product_id: String,
        requested: u32,
        available: u32,
    },
}

/// Plain discriminator of [`YardError`], recorded on failed tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    CapacityExceeded,
    NotFound,
    StateConflict,
    InsufficientStock,
}

impl YardError {
    /// Shorthand for [`YardError::NotFound`].
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
        }
    }
}
