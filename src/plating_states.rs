use core::fmt;

use log::{debug, error, info, warn};

use crate::calculator;
use crate::psu::{PowerSupply, PsuCommand, PsuStatus};
use crate::types::{
    ComputedTargets, ProcessParameters, ProcessState, RunProgress, Sample,
    OUTPUT_OFF_RETRY_LIMIT,
};

/// Event fed into the state machine. `Tick` arrives only from the
/// monitoring loop; everything else originates with the operator.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Connect,
    Disconnect,
    Start,
    Pause,
    Abort,
    Tick(Sample),
    EditParameters(ProcessParameters),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ProcessState,
    pub to: ProcessState,
}

/// What a dispatched event produced beyond the state itself.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub transition: Option<StateTransition>,
    /// Device-reported alert; the run keeps going.
    pub alert: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// The device refused the connection attempt.
    ConnectFailed,
    /// The device NAK'd a command; the transition was rolled back.
    CommandRejected(PsuCommand),
    /// Targets are not startable (zero or collapsed estimated time).
    TargetsNotReady,
    /// The event is not legal in the current state.
    InvalidTransition {
        state: ProcessState,
        event: &'static str,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::ConnectFailed => write!(f, "connection to power supply failed"),
            ProcessError::CommandRejected(cmd) => {
                write!(f, "power supply rejected command: {}", cmd)
            }
            ProcessError::TargetsNotReady => {
                write!(f, "computed targets are invalid; check thickness and area")
            }
            ProcessError::InvalidTransition { state, event } => {
                write!(f, "'{}' is not valid while {:?}", event, state)
            }
        }
    }
}

impl std::error::Error for ProcessError {}

/// Plating process state machine.
///
/// All process mutation funnels through [`dispatch`](Self::dispatch):
/// operator commands, parameter edits and monitoring ticks are events,
/// and every device command is tied to a transition. A transition either
/// fully commits (state updated, command acknowledged) or fully fails
/// with the state unchanged; the only exceptions are the best-effort
/// output disables on abort, completion and comms loss.
pub struct PlatingStateMachine {
    state: ProcessState,
    parameters: ProcessParameters,
    targets: ComputedTargets,
    progress: RunProgress,
    tick_secs: u64,
    /// Nonzero when a committed transition could not confirm the output
    /// off; counted down by the retry path.
    output_off_retries: u8,
}

impl PlatingStateMachine {
    pub fn new(parameters: ProcessParameters, monitor_period_ms: u64) -> Self {
        let targets = calculator::compute_targets(&parameters);
        Self {
            state: ProcessState::Disconnected,
            parameters,
            targets,
            progress: RunProgress::default(),
            tick_secs: (monitor_period_ms / 1000).max(1),
            output_off_retries: 0,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn parameters(&self) -> ProcessParameters {
        self.parameters
    }

    pub fn targets(&self) -> ComputedTargets {
        self.targets
    }

    pub fn progress(&self) -> RunProgress {
        self.progress
    }

    pub async fn dispatch<P: PowerSupply>(
        &mut self,
        event: ProcessEvent,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        match event {
            ProcessEvent::Connect => self.handle_connect(psu).await,
            ProcessEvent::Disconnect => self.handle_disconnect(psu).await,
            ProcessEvent::Start => self.handle_start(psu).await,
            ProcessEvent::Pause => self.handle_pause(psu).await,
            ProcessEvent::Abort => self.handle_abort(psu).await,
            ProcessEvent::Tick(sample) => self.handle_tick(sample, psu).await,
            ProcessEvent::EditParameters(parameters) => Ok(self.handle_edit(parameters)),
        }
    }

    async fn handle_connect<P: PowerSupply>(
        &mut self,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        if self.state != ProcessState::Disconnected {
            return Err(self.invalid("connect"));
        }
        if !psu.connect().await {
            error!("power supply connection failed");
            return Err(ProcessError::ConnectFailed);
        }
        info!("power supply connected");
        Ok(self.transition(ProcessState::Connected))
    }

    async fn handle_disconnect<P: PowerSupply>(
        &mut self,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        match self.state {
            ProcessState::Connected | ProcessState::Complete => {
                psu.disconnect().await;
                self.progress = RunProgress::default();
                info!("power supply disconnected");
                Ok(self.transition(ProcessState::Disconnected))
            }
            _ => Err(self.invalid("disconnect")),
        }
    }

    async fn handle_start<P: PowerSupply>(
        &mut self,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        let resuming = match self.state {
            ProcessState::Connected => false,
            ProcessState::Paused => true,
            _ => return Err(self.invalid("start")),
        };
        if !self.targets.startable() {
            warn!("start refused: estimated time is not positive");
            return Err(ProcessError::TargetsNotReady);
        }
        let apply = PsuCommand::Apply {
            voltage_v: self.targets.target_voltage_v,
            current_a: self.targets.target_current_a,
        };
        if !psu.send_command(apply).await {
            return Err(ProcessError::CommandRejected(apply));
        }
        if !psu.send_command(PsuCommand::OutputOn).await {
            return Err(ProcessError::CommandRejected(PsuCommand::OutputOn));
        }
        if resuming {
            info!("plating resumed at {}s elapsed", self.progress.elapsed_sec);
        } else {
            self.progress = RunProgress::default();
            info!(
                "plating started: {:.2} V, {:.3} A, estimated {:.0}s",
                self.targets.target_voltage_v,
                self.targets.target_current_a,
                self.targets.estimated_time_sec
            );
        }
        Ok(self.transition(ProcessState::Active))
    }

    async fn handle_pause<P: PowerSupply>(
        &mut self,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        if self.state != ProcessState::Active {
            return Err(self.invalid("pause"));
        }
        // The output must be confirmed off before the machine claims
        // Paused; a rejected disable leaves the run Active.
        if !psu.send_command(PsuCommand::OutputOff).await {
            error!("pause failed: output disable rejected, still plating");
            return Err(ProcessError::CommandRejected(PsuCommand::OutputOff));
        }
        info!("plating paused at {}s elapsed", self.progress.elapsed_sec);
        Ok(self.transition(ProcessState::Paused))
    }

    async fn handle_abort<P: PowerSupply>(
        &mut self,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        match self.state {
            ProcessState::Active | ProcessState::Paused | ProcessState::Complete => {}
            _ => return Err(self.invalid("abort")),
        }
        // Best effort: the abort commits even if the disable is rejected.
        if psu.send_command(PsuCommand::OutputOff).await {
            self.output_off_retries = 0;
        } else {
            warn!("abort: output disable rejected, scheduling retries");
            self.output_off_retries = OUTPUT_OFF_RETRY_LIMIT;
        }
        self.progress = RunProgress::default();
        info!("plating aborted, progress reset");
        Ok(self.transition(ProcessState::Connected))
    }

    async fn handle_tick<P: PowerSupply>(
        &mut self,
        sample: Sample,
        psu: &mut P,
    ) -> Result<DispatchOutcome, ProcessError> {
        if self.state != ProcessState::Active {
            // The monitoring loop stops outside Active; a straggler tick
            // is dropped rather than mutating a settled state.
            debug!("tick ignored in state {:?}", self.state);
            return Ok(DispatchOutcome::default());
        }

        if sample.status.is_comms_failure() {
            error!("comms failure during monitoring: {}", sample.status);
            // The session is already gone; the disable is a formality.
            let _ = psu.send_command(PsuCommand::OutputOff).await;
            self.progress = RunProgress::default();
            return Ok(self.transition(ProcessState::Disconnected));
        }

        let mut outcome = DispatchOutcome::default();
        if sample.status.is_alert() {
            warn!("device alert during plating: {}", sample.status);
            outcome.alert = Some(sample.status.to_string());
        } else if sample.status == PsuStatus::ReadFail {
            warn!("measurement read failed this tick");
        }

        self.progress.elapsed_sec += self.tick_secs;
        self.progress.progress_percent = if self.targets.estimated_time_sec > 0.0 {
            let percent =
                self.progress.elapsed_sec as f64 / self.targets.estimated_time_sec * 100.0;
            (percent as u64).min(100) as u8
        } else {
            0
        };

        if self.progress.elapsed_sec as f64 >= self.targets.estimated_time_sec {
            if psu.send_command(PsuCommand::OutputOff).await {
                self.output_off_retries = 0;
            } else {
                warn!("completion: output disable rejected, scheduling retries");
                self.output_off_retries = OUTPUT_OFF_RETRY_LIMIT;
            }
            self.progress.progress_percent = 100;
            info!("plating complete after {}s", self.progress.elapsed_sec);
            outcome.transition = self.transition(ProcessState::Complete).transition;
        }

        Ok(outcome)
    }

    fn handle_edit(&mut self, parameters: ProcessParameters) -> DispatchOutcome {
        self.parameters = parameters;
        // Recompute synchronously; readers never observe stale targets.
        self.targets = calculator::compute_targets(&self.parameters);
        debug!(
            "targets recomputed: {:.3} A, {:.2} V, {:.0}s",
            self.targets.target_current_a,
            self.targets.target_voltage_v,
            self.targets.estimated_time_sec
        );
        if self.state == ProcessState::Active {
            // Display-only while a run is active: the energized setpoints
            // stay whatever the last start applied until a restart.
            warn!("parameters edited mid-run; device setpoints unchanged until restart");
        }
        DispatchOutcome::default()
    }

    /// True while a rejected output disable is awaiting retry.
    pub fn output_off_pending(&self) -> bool {
        self.output_off_retries > 0
    }

    /// Retries a previously rejected output disable. Called on idle ticks
    /// until it succeeds or the attempt budget runs out.
    pub async fn retry_output_off<P: PowerSupply>(&mut self, psu: &mut P) {
        if self.output_off_retries == 0 {
            return;
        }
        if psu.send_command(PsuCommand::OutputOff).await {
            info!("deferred output disable confirmed");
            self.output_off_retries = 0;
            return;
        }
        self.output_off_retries -= 1;
        if self.output_off_retries == 0 {
            error!("output disable still rejected; manual intervention required");
        }
    }

    fn transition(&mut self, to: ProcessState) -> DispatchOutcome {
        let from = self.state;
        self.state = to;
        DispatchOutcome {
            transition: Some(StateTransition { from, to }),
            alert: None,
        }
    }

    fn invalid(&self, event: &'static str) -> ProcessError {
        ProcessError::InvalidTransition {
            state: self.state,
            event,
        }
    }
}
