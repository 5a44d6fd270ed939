use std::sync::Arc;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::Instant;
use log::{error, info};

use crate::types::{ComputedTargets, ProcessParameters, ProcessState, RunProgress, Sample, SystemState};

/// Display-facing mirror of the process. The controller writes it after
/// every dispatched event; presentation code only ever reads snapshots
/// through the shared handle.
pub struct StateManager {
    state: Arc<Mutex<CriticalSectionRawMutex, SystemState>>,
}

impl StateManager {
    pub fn new(parameters: ProcessParameters, targets: ComputedTargets) -> Self {
        let initial = SystemState {
            parameters,
            targets,
            ..SystemState::default()
        };
        Self {
            state: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get_state_handle(&self) -> Arc<Mutex<CriticalSectionRawMutex, SystemState>> {
        Arc::clone(&self.state)
    }

    pub async fn update_process_state(&self, process_state: ProcessState) {
        let mut state = self.state.lock().await;
        if state.process_state != process_state {
            info!(
                "process state changed: {:?} -> {:?}",
                state.process_state, process_state
            );
            let message = format!("State: {:?}", process_state);
            state.process_state = process_state;
            Self::push_log(&mut state, message);
        }
    }

    pub async fn update_targets(&self, parameters: ProcessParameters, targets: ComputedTargets) {
        let mut state = self.state.lock().await;
        state.parameters = parameters;
        state.targets = targets;
    }

    pub async fn update_progress(&self, progress: RunProgress) {
        let mut state = self.state.lock().await;
        state.progress = progress;
    }

    pub async fn update_sample(&self, sample: Sample) {
        let mut state = self.state.lock().await;
        let message = format!(
            "Read: {:.2} V, {:.3} A, {}",
            sample.voltage_v, sample.current_a, sample.status
        );
        state.last_sample = Some(sample);
        Self::push_log(&mut state, message);
    }

    pub async fn set_error(&self, error: Option<String>) {
        let mut state = self.state.lock().await;
        if let Some(ref message) = error {
            error!("{}", message);
            let entry = format!("ERROR: {}", message);
            Self::push_log(&mut state, entry);
        }
        state.last_error = error;
    }

    pub async fn add_log(&self, message: String) {
        let mut state = self.state.lock().await;
        Self::push_log(&mut state, message);
    }

    fn push_log(state: &mut SystemState, message: String) {
        let entry = format!("[{}s] {}", Instant::now().as_secs(), message);
        if state.log_messages.len() >= 100 {
            state.log_messages.remove(0);
        }
        let _ = state.log_messages.push(entry);
    }
}
