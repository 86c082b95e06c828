//! Yard configuration.
//!
//! Plain TOML with kebab-case keys. Every key is optional; missing keys
//! take their defaults.
//!
//! ```toml
//! grid-width = 30
//! grid-height = 20
//! default-priority = 1
//! report-log-tail = 20
//! log-page-size = 50
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, YardError};

/// Yard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct YardConfig {
    /// Grid columns.
    pub grid_width: i32,
    /// Grid rows.
    pub grid_height: i32,
    /// Priority given to tasks created without one.
    pub default_priority: i32,
    /// Number of audit records included in a report.
    pub report_log_tail: usize,
    /// Audit page size when the caller gives none.
    pub log_page_size: usize,
}

impl Default for YardConfig {
    fn default() -> Self {
        Self {
            grid_width: 20,
            grid_height: 20,
            default_priority: 1,
            report_log_tail: 20,
            log_page_size: 50,
        }
    }
}

impl YardConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| YardError::Validation(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            YardError::Validation(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_width <= 0 || self.grid_height <= 0 {
            return Err(YardError::Validation(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid_width, self.grid_height
            )));
        }
        if self.log_page_size == 0 {
            return Err(YardError::Validation("log-page-size must be positive".into()));
        }
        Ok(())
    }
}
