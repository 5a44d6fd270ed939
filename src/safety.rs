use embassy_time::{Duration, Instant};
use log::error;

use crate::psu::PsuStatus;
use crate::types::{ProcessState, Sample, SAMPLE_WATCHDOG_MS};

/// Run supervision: catches conditions where the process believes it is
/// plating but the instrument can no longer back that up.
pub struct SafetyController {
    last_sample_received: Option<Instant>,
    watchdog_timeout: Duration,
}

impl SafetyController {
    pub fn new() -> Self {
        Self::with_watchdog(Duration::from_millis(SAMPLE_WATCHDOG_MS))
    }

    pub fn with_watchdog(watchdog_timeout: Duration) -> Self {
        Self {
            last_sample_received: None,
            watchdog_timeout,
        }
    }

    pub fn note_sample(&mut self, sample: &Sample) {
        self.last_sample_received = Some(sample.received_at);
    }

    pub fn reset(&mut self) {
        self.last_sample_received = None;
    }

    /// True when an Active run must be stopped immediately: the device
    /// reports its session gone, or samples stopped arriving entirely.
    pub fn should_emergency_stop(&self, state: ProcessState, latest: Option<&Sample>) -> bool {
        if state != ProcessState::Active {
            return false;
        }

        if let Some(sample) = latest {
            if sample.status == PsuStatus::NotConnected {
                error!("SAFETY: device session dropped mid-run");
                return true;
            }
        }

        if let Some(received) = self.last_sample_received {
            if Instant::now().duration_since(received) > self.watchdog_timeout {
                error!("SAFETY: sample watchdog timeout during plating");
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: PsuStatus, received_at: Instant) -> Sample {
        Sample {
            voltage_v: 0.0,
            current_a: 0.0,
            status,
            received_at,
        }
    }

    #[test]
    fn healthy_run_is_left_alone() {
        let mut safety = SafetyController::new();
        let reading = sample(PsuStatus::PlatingActive, Instant::now());
        safety.note_sample(&reading);
        assert!(!safety.should_emergency_stop(ProcessState::Active, Some(&reading)));
    }

    #[test]
    fn session_drop_mid_run_trips_the_stop() {
        let safety = SafetyController::new();
        let reading = sample(PsuStatus::NotConnected, Instant::now());
        assert!(safety.should_emergency_stop(ProcessState::Active, Some(&reading)));
        // Outside an active run the same token is unremarkable.
        assert!(!safety.should_emergency_stop(ProcessState::Connected, Some(&reading)));
    }

    #[test]
    fn stale_samples_trip_the_watchdog() {
        let mut safety = SafetyController::with_watchdog(Duration::from_micros(1));
        let old = sample(PsuStatus::PlatingActive, Instant::from_ticks(0));
        safety.note_sample(&old);
        // Let the clock advance well past the tiny watchdog window.
        std::thread::sleep(core::time::Duration::from_millis(2));
        let fresh = sample(PsuStatus::PlatingActive, Instant::now());
        assert!(safety.should_emergency_stop(ProcessState::Active, Some(&fresh)));

        safety.reset();
        assert!(!safety.should_emergency_stop(ProcessState::Active, Some(&fresh)));
    }
}
