//! Device capability contracts and the channel plumbing between the
//! controller and the worker that owns the instrument session.

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};

use crate::psu::protocol::{PsuCommand, PsuStatus};
use crate::types::Sample;

/// Device capability consumed by the process state machine: connect and
/// disconnect the instrument, issue one command at a time, read one
/// combined measurement + status sample.
#[allow(async_fn_in_trait)]
pub trait PowerSupply {
    async fn connect(&mut self) -> bool;
    async fn disconnect(&mut self);
    /// Returns true when the device acknowledged the command.
    async fn send_command(&mut self, cmd: PsuCommand) -> bool;
    async fn read_data(&mut self) -> Sample;
}

/// Blocking instrument session owned by the PSU worker task.
///
/// Implementations hold all wire state. A `read_data` that hits a comms
/// failure tears its own session down and reports the comms-error token;
/// callers never see transport-level errors directly.
pub trait PsuTransport: Send {
    fn connect(&mut self) -> bool;
    fn disconnect(&mut self);
    fn send_command(&mut self, cmd: &PsuCommand) -> bool;
    fn read_data(&mut self) -> (f64, f64, PsuStatus);
}

/// Request sent to the PSU worker.
#[derive(Debug, Clone)]
pub enum PsuRequest {
    Connect,
    Disconnect,
    Command(PsuCommand),
    ReadData,
}

/// Reply from the PSU worker, exactly one per request.
#[derive(Debug, Clone)]
pub enum PsuReply {
    Connected(bool),
    Disconnected,
    CommandResult(bool),
    Data(Sample),
}

pub type PsuRequestChannel = Channel<CriticalSectionRawMutex, PsuRequest, 4>;
pub type PsuReplyChannel = Channel<CriticalSectionRawMutex, PsuReply, 4>;
