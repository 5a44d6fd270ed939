//! Centralized configuration: operator defaults plus the instrument
//! transport settings consumed by transport implementations.

use std::fs;
use std::path::Path;

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};

use crate::types::{ProcessParameters, MONITOR_PERIOD_MS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsuConfig {
    /// VISA-style resource string for the instrument session.
    pub resource: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for PsuConfig {
    fn default() -> Self {
        Self {
            resource: "ASRL/dev/ttyUSB0::INSTR".to_string(),
            baud_rate: 115_200,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub default_parameters: ProcessParameters,
    pub monitor_period_ms: u64,
    pub psu: PsuConfig,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            default_parameters: ProcessParameters::default(),
            monitor_period_ms: MONITOR_PERIOD_MS,
            psu: PsuConfig::default(),
        }
    }
}

impl ProcessConfig {
    /// Loads a JSON config, falling back to defaults when the file is
    /// absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}
