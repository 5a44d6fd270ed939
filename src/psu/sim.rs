//! Built-in instrument simulator: stands in for a bench power supply so
//! the controller can run end to end without hardware. Reproduces the
//! session's observable behavior (connect bookkeeping, setpoint storage,
//! output gating, status tokens) with scriptable faults.

use log::{info, warn};

use crate::psu::protocol::{PsuCommand, PsuStatus};
use crate::psu::traits::PsuTransport;

pub struct SimulatedPsu {
    connected: bool,
    output_on: bool,
    setpoint_v: f64,
    setpoint_a: f64,
    reads: u64,
    reject_commands: u32,
    fail_reads: u32,
    pending_alert: Option<String>,
}

impl SimulatedPsu {
    pub fn new() -> Self {
        Self {
            connected: false,
            output_on: false,
            setpoint_v: 0.0,
            setpoint_a: 0.0,
            reads: 0,
            reject_commands: 0,
            fail_reads: 0,
            pending_alert: None,
        }
    }

    /// NAK the next `count` commands.
    pub fn reject_next_commands(&mut self, count: u32) {
        self.reject_commands = count;
    }

    /// Answer the next `count` reads with a comms failure, tearing the
    /// session down like the real instrument layer does.
    pub fn fail_next_reads(&mut self, count: u32) {
        self.fail_reads = count;
    }

    /// Attach an alert detail to the next active read.
    pub fn raise_alert(&mut self, detail: &str) {
        self.pending_alert = Some(detail.to_string());
    }

    // Deterministic readback ripple so repeated runs log identically.
    fn ripple(&self) -> f64 {
        match self.reads % 4 {
            0 => 0.0,
            1 => 0.002,
            2 => -0.001,
            _ => 0.001,
        }
    }
}

impl PsuTransport for SimulatedPsu {
    fn connect(&mut self) -> bool {
        if !self.connected {
            self.connected = true;
            info!("sim PSU: session opened");
        }
        true
    }

    fn disconnect(&mut self) {
        // The real session forces the output off before closing.
        self.output_on = false;
        self.connected = false;
        info!("sim PSU: session closed");
    }

    fn send_command(&mut self, cmd: &PsuCommand) -> bool {
        if !self.connected {
            warn!("sim PSU: {} with no session", cmd);
            return false;
        }
        if self.reject_commands > 0 {
            self.reject_commands -= 1;
            warn!("sim PSU: NAK for {}", cmd);
            return false;
        }
        match *cmd {
            PsuCommand::Apply {
                voltage_v,
                current_a,
            } => {
                self.setpoint_v = voltage_v;
                self.setpoint_a = current_a;
            }
            PsuCommand::OutputOn => self.output_on = true,
            PsuCommand::OutputOff => self.output_on = false,
        }
        true
    }

    fn read_data(&mut self) -> (f64, f64, PsuStatus) {
        if !self.connected {
            return (0.0, 0.0, PsuStatus::NotConnected);
        }
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            self.disconnect();
            return (0.0, 0.0, PsuStatus::CommsError);
        }
        if !self.output_on {
            return (0.0, 0.0, PsuStatus::OutputOff);
        }
        self.reads += 1;
        let status = match self.pending_alert.take() {
            Some(detail) => PsuStatus::Alert(detail),
            None => PsuStatus::PlatingActive,
        };
        (
            self.setpoint_v + self.ripple(),
            self.setpoint_a + self.ripple() / 10.0,
            status,
        )
    }
}
