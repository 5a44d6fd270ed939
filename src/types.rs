use embassy_time::Instant;
use serde::{Deserialize, Serialize};

use crate::psu::PsuStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    Disconnected,
    Connected,
    Active,
    Paused,
    Complete,
}

/// Operator-supplied process parameters. Values are taken as given; the
/// calculator's zero-time sentinel and the start guard keep bad ones from
/// ever energizing the output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessParameters {
    pub thickness_um: f64,
    pub area_cm2: f64,
    pub complexity_level: i32,
}

impl Default for ProcessParameters {
    fn default() -> Self {
        Self {
            thickness_um: 10.0,
            area_cm2: 50.0,
            complexity_level: 1,
        }
    }
}

/// Electrical setpoints and run duration derived from the parameters.
/// Always recomputed whole, never patched field by field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComputedTargets {
    pub target_current_a: f64,
    pub target_voltage_v: f64,
    pub estimated_time_sec: f64,
}

impl ComputedTargets {
    /// A run may only start with a positive estimated time; zero is the
    /// sentinel for a calculation that collapsed.
    pub fn startable(&self) -> bool {
        self.estimated_time_sec > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunProgress {
    pub elapsed_sec: u64,
    pub progress_percent: u8,
}

/// One monitoring reading: live measurements plus the device status token.
#[derive(Debug, Clone)]
pub struct Sample {
    pub voltage_v: f64,
    pub current_a: f64,
    pub status: PsuStatus,
    pub received_at: Instant,
}

#[derive(Debug, Clone)]
pub struct SystemState {
    pub parameters: ProcessParameters,
    pub targets: ComputedTargets,
    pub process_state: ProcessState,
    pub progress: RunProgress,
    pub last_sample: Option<Sample>,
    pub last_error: Option<String>,
    pub log_messages: heapless::Vec<String, 100>,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            parameters: ProcessParameters::default(),
            targets: ComputedTargets::default(),
            process_state: ProcessState::Disconnected,
            progress: RunProgress::default(),
            last_sample: None,
            last_error: None,
            log_messages: heapless::Vec::new(),
        }
    }
}

pub const MONITOR_PERIOD_MS: u64 = 1_000;
pub const SAMPLE_WATCHDOG_MS: u64 = 10_000;
pub const OUTPUT_OFF_RETRY_LIMIT: u8 = 5;
