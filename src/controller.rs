use std::sync::Arc;

use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Duration, Timer};
use log::{debug, error, info};
use serde::Deserialize;

use crate::config::ProcessConfig;
use crate::plating_states::{PlatingStateMachine, ProcessEvent};
use crate::psu::{PowerSupply, PsuLink};
use crate::safety::SafetyController;
use crate::state::StateManager;
use crate::types::{ProcessParameters, ProcessState};

/// Operator-facing command surface; presentation layers deserialize into
/// this and queue it on the control channel.
#[derive(Debug, Clone, Deserialize)]
pub enum ControlCommand {
    #[serde(rename = "connect")]
    Connect,
    #[serde(rename = "disconnect")]
    Disconnect,
    #[serde(rename = "start_plating")]
    StartPlating,
    #[serde(rename = "pause_plating")]
    PausePlating,
    #[serde(rename = "abort_plating")]
    AbortPlating,
    #[serde(rename = "set_parameters")]
    SetParameters {
        thickness_um: f64,
        area_cm2: f64,
        complexity_level: i32,
    },
}

pub type ControlCommandChannel = Channel<CriticalSectionRawMutex, ControlCommand, 8>;

/// Owns the state machine and drives it from operator commands and the
/// monitoring timer on one cooperative task.
pub struct PlatingController {
    machine: PlatingStateMachine,
    state_manager: StateManager,
    safety: SafetyController,
    psu: PsuLink,
    control_channel: Arc<ControlCommandChannel>,
    monitor_period: Duration,
}

impl PlatingController {
    pub fn new(
        config: &ProcessConfig,
        psu: PsuLink,
        control_channel: Arc<ControlCommandChannel>,
    ) -> Self {
        let machine = PlatingStateMachine::new(config.default_parameters, config.monitor_period_ms);
        let state_manager = StateManager::new(machine.parameters(), machine.targets());
        Self {
            machine,
            state_manager,
            safety: SafetyController::new(),
            psu,
            control_channel,
            monitor_period: Duration::from_millis(config.monitor_period_ms),
        }
    }

    pub fn state_manager(&self) -> &StateManager {
        &self.state_manager
    }

    /// Runs the control loop forever. Commands and monitor ticks are arms
    /// of one select, so no two transitions ever interleave and leaving
    /// Active synchronously stops the sampling.
    pub async fn run(&mut self) {
        info!("plating controller started");
        loop {
            let command_fut = self.control_channel.receive();
            let tick_fut = Timer::after(self.monitor_period);
            match select(command_fut, tick_fut).await {
                Either::First(command) => self.handle_control_command(command).await,
                Either::Second(()) => {
                    if self.machine.state() == ProcessState::Active {
                        self.monitor_tick().await;
                    } else {
                        self.idle_tick().await;
                    }
                }
            }
        }
    }

    async fn handle_control_command(&mut self, command: ControlCommand) {
        debug!("control command: {:?}", command);
        let event = match command {
            ControlCommand::Connect => ProcessEvent::Connect,
            ControlCommand::Disconnect => ProcessEvent::Disconnect,
            ControlCommand::StartPlating => ProcessEvent::Start,
            ControlCommand::PausePlating => ProcessEvent::Pause,
            ControlCommand::AbortPlating => ProcessEvent::Abort,
            ControlCommand::SetParameters {
                thickness_um,
                area_cm2,
                complexity_level,
            } => ProcessEvent::EditParameters(ProcessParameters {
                thickness_um,
                area_cm2,
                complexity_level,
            }),
        };
        self.dispatch(event).await;
    }

    async fn monitor_tick(&mut self) {
        let sample = self.psu.read_data().await;
        self.safety.note_sample(&sample);
        if self
            .safety
            .should_emergency_stop(self.machine.state(), Some(&sample))
        {
            error!("EMERGENCY: stopping run");
            self.state_manager
                .add_log("EMERGENCY: stopping run".to_string())
                .await;
            self.dispatch(ProcessEvent::Abort).await;
            return;
        }
        self.state_manager.update_sample(sample.clone()).await;
        self.dispatch(ProcessEvent::Tick(sample)).await;
    }

    async fn idle_tick(&mut self) {
        if self.machine.output_off_pending() {
            self.machine.retry_output_off(&mut self.psu).await;
        }
    }

    async fn dispatch(&mut self, event: ProcessEvent) {
        match self.machine.dispatch(event, &mut self.psu).await {
            Ok(outcome) => {
                self.state_manager.set_error(None).await;
                if let Some(alert) = outcome.alert {
                    self.state_manager.add_log(alert).await;
                }
                if let Some(transition) = outcome.transition {
                    if transition.to != ProcessState::Active {
                        self.safety.reset();
                    }
                }
            }
            Err(err) => {
                self.state_manager.set_error(Some(err.to_string())).await;
            }
        }
        self.refresh_snapshot().await;
    }

    async fn refresh_snapshot(&mut self) {
        self.state_manager
            .update_process_state(self.machine.state())
            .await;
        self.state_manager
            .update_targets(self.machine.parameters(), self.machine.targets())
            .await;
        self.state_manager
            .update_progress(self.machine.progress())
            .await;
    }
}
