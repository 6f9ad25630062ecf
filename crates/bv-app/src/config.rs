//! Application configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration, read from an optional JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Department entity the primary dataset is filtered to.
    pub dept_id: u32,
    /// Employee entity the secondary dataset is filtered to.
    pub emp_id: u32,
    /// Chart title override for the department dataset.
    pub dept_title: Option<String>,
    /// Chart title override for the employee dataset.
    pub emp_title: Option<String>,
    /// Simulated latency of the demo collaborator, in milliseconds.
    pub fetch_latency_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dept_id: 10,
            emp_id: 100,
            dept_title: None,
            emp_title: None,
            fetch_latency_ms: 150,
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Title for the department chart, derived from the id unless overridden.
    pub fn department_title(&self) -> String {
        self.dept_title
            .clone()
            .unwrap_or_else(|| format!("Department {} History", self.dept_id))
    }

    /// Title for the employee chart, derived from the id unless overridden.
    pub fn employee_title(&self) -> String {
        self.emp_title
            .clone()
            .unwrap_or_else(|| format!("Employee {} History", self.emp_id))
    }
}
