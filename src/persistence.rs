//! Persistence sink.
//!
//! The yard reports the current state of an entity after every mutating
//! command. Recording is best-effort: a sink error is logged by the caller
//! and never undoes or aborts the command that triggered it.

use std::io::{self, Write};

use serde::Serialize;
use thiserror::Error;

use crate::models::{Equipment, Product, ShipPlan, Task, Warehouse};

/// Errors raised by a sink.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Borrowed view of an entity to record.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EntitySnapshot<'a> {
    Product(&'a Product),
    Warehouse(&'a Warehouse),
    Equipment(&'a Equipment),
    Task(&'a Task),
    ShipPlan(&'a ShipPlan),
}

impl EntitySnapshot<'_> {
    pub fn id(&self) -> &str {
        match self {
            Self::Product(p) => &p.id,
            Self::Warehouse(w) => &w.id,
            Self::Equipment(e) => &e.id,
            Self::Task(t) => &t.id,
            Self::ShipPlan(s) => &s.id,
        }
    }
}

/// Durably records the current state of an entity.
pub trait PersistenceSink: Send {
    fn record(&mut self, snapshot: EntitySnapshot<'_>) -> Result<(), PersistenceError>;
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PersistenceSink for NullSink {
    fn record(&mut self, _snapshot: EntitySnapshot<'_>) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Writes one JSON object per snapshot, one per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> PersistenceSink for JsonLinesSink<W> {
    fn record(&mut self, snapshot: EntitySnapshot<'_>) -> Result<(), PersistenceError> {
        serde_json::to_writer(&mut self.writer, &snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
