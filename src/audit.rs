//! Execution audit log.
//!
//! Append-only, human-readable record of every executed effect. The core
//! never prunes it; trimming for display is up to the reader.

use serde::{Deserialize, Serialize};

/// Append-only list of effect records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<String>,
}

/// One page of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    pub entries: Vec<String>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The last `n` records, oldest first.
    pub fn tail(&self, n: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Records `offset..offset + limit`, clamped to the log.
    pub fn page(&self, offset: usize, limit: usize) -> AuditPage {
        let start = offset.min(self.entries.len());
        let end = start.saturating_add(limit).min(self.entries.len());
        AuditPage {
            entries: self.entries[start..end].to_vec(),
            total_count: self.entries.len(),
            offset,
            limit,
        }
    }
}
