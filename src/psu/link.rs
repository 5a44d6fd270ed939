//! Channel-backed client and worker for the instrument session. The
//! worker owns the blocking transport; the controller talks to it through
//! request/reply channels so device I/O never runs on the control path.

use std::sync::Arc;

use embassy_time::Instant;
use log::{error, info, warn};

use crate::psu::protocol::{PsuCommand, PsuStatus};
use crate::psu::traits::{
    PowerSupply, PsuReply, PsuReplyChannel, PsuRequest, PsuRequestChannel, PsuTransport,
};
use crate::types::Sample;

/// Client half of the worker boundary. One request is in flight at a
/// time: the controller is the only requester and awaits each reply.
#[derive(Clone)]
pub struct PsuLink {
    requests: Arc<PsuRequestChannel>,
    replies: Arc<PsuReplyChannel>,
}

impl PsuLink {
    pub fn new(requests: Arc<PsuRequestChannel>, replies: Arc<PsuReplyChannel>) -> Self {
        Self { requests, replies }
    }

    async fn round_trip(&mut self, request: PsuRequest) -> PsuReply {
        self.requests.send(request).await;
        self.replies.receive().await
    }
}

impl PowerSupply for PsuLink {
    async fn connect(&mut self) -> bool {
        match self.round_trip(PsuRequest::Connect).await {
            PsuReply::Connected(ok) => ok,
            other => {
                warn!("PSU link: unexpected reply to connect: {:?}", other);
                false
            }
        }
    }

    async fn disconnect(&mut self) {
        match self.round_trip(PsuRequest::Disconnect).await {
            PsuReply::Disconnected => {}
            other => warn!("PSU link: unexpected reply to disconnect: {:?}", other),
        }
    }

    async fn send_command(&mut self, cmd: PsuCommand) -> bool {
        match self.round_trip(PsuRequest::Command(cmd)).await {
            PsuReply::CommandResult(acked) => acked,
            other => {
                warn!("PSU link: unexpected reply to {}: {:?}", cmd, other);
                false
            }
        }
    }

    async fn read_data(&mut self) -> Sample {
        match self.round_trip(PsuRequest::ReadData).await {
            PsuReply::Data(sample) => sample,
            other => {
                warn!("PSU link: unexpected reply to read: {:?}", other);
                Sample {
                    voltage_v: 0.0,
                    current_a: 0.0,
                    status: PsuStatus::ReadFail,
                    received_at: Instant::now(),
                }
            }
        }
    }
}

/// Services instrument requests against the transport for the life of the
/// executor.
pub async fn run_psu_worker<T: PsuTransport>(
    mut transport: T,
    requests: Arc<PsuRequestChannel>,
    replies: Arc<PsuReplyChannel>,
) {
    info!("PSU worker started");
    loop {
        let reply = match requests.receive().await {
            PsuRequest::Connect => PsuReply::Connected(transport.connect()),
            PsuRequest::Disconnect => {
                transport.disconnect();
                PsuReply::Disconnected
            }
            PsuRequest::Command(cmd) => {
                let acked = transport.send_command(&cmd);
                if !acked {
                    error!("PSU rejected command: {}", cmd);
                }
                PsuReply::CommandResult(acked)
            }
            PsuRequest::ReadData => {
                let (voltage_v, current_a, status) = transport.read_data();
                PsuReply::Data(Sample {
                    voltage_v,
                    current_a,
                    status,
                    received_at: Instant::now(),
                })
            }
        };
        replies.send(reply).await;
    }
}
