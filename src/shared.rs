//! Thread-safe handle to a [`Yard`].
//!
//! The yard itself is single-threaded. `SharedYard` serializes concurrent
//! callers behind one lock, so claim-and-assign, stock moves and task
//! execution each run as a single step: two callers can never both see
//! the same equipment Idle and claim it.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::executor::ExecutionOutcome;
use crate::report::{SystemStatus, YardReport};
use crate::scheduler::Dispatch;
use crate::yard::Yard;

/// Cloneable, lock-protected yard.
#[derive(Debug, Clone)]
pub struct SharedYard {
    inner: Arc<Mutex<Yard>>,
}

impl SharedYard {
    pub fn new(yard: Yard) -> Self {
        Self {
            inner: Arc::new(Mutex::new(yard)),
        }
    }

    /// Locks the yard for a sequence of commands that must not interleave
    /// with other callers.
    pub fn lock(&self) -> MutexGuard<'_, Yard> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the yard.
    pub fn with<R>(&self, f: impl FnOnce(&mut Yard) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    pub fn assign_equipment(&self, task_id: &str, equipment_id: &str) -> Result<()> {
        self.inner.lock().assign_equipment(task_id, equipment_id)
    }

    pub fn optimize_schedule(&self) -> Vec<Dispatch> {
        self.inner.lock().optimize_schedule()
    }

    pub fn execute_task(&self, task_id: &str) -> Result<ExecutionOutcome> {
        self.inner.lock().execute_task(task_id)
    }

    pub fn warehouse_stock_in(&self, warehouse_id: &str, product_id: &str, quantity: u32) -> Result<()> {
        self.inner
            .lock()
            .warehouse_stock_in(warehouse_id, product_id, quantity)
    }

    pub fn warehouse_stock_out(&self, warehouse_id: &str, product_id: &str, quantity: u32) -> Result<()> {
        self.inner
            .lock()
            .warehouse_stock_out(warehouse_id, product_id, quantity)
    }

    pub fn system_status(&self) -> SystemStatus {
        self.inner.lock().system_status()
    }

    pub fn generate_report(&self) -> YardReport {
        self.inner.lock().generate_report()
    }
}
