//! The emulated controller on the far end of a byte stream.
//!
//! [`EmulatedController`] decodes host commands with [`DeviceCodec`], drives
//! an [`EspressoMachine`] and answers the way the firmware does: a status
//! frame for every poll, a short acknowledgement line for extraction
//! commands and an echo for anything else. The simulation clock follows
//! tokio time, so paused-clock tests stay deterministic.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use brewlink_core::Result;
use brewlink_protocol::{Command, DeviceCodec, DeviceReply};

use crate::machine::{EspressoMachine, MachineProfile};

/// Lines printed when the stream opens, before any command.
pub const BOOT_BANNER: [&str; 2] = ["ESPRESSO CONTROLLER READY", "SERIAL 115200 8N1"];

/// Controller firmware stand-in.
#[derive(Debug)]
pub struct EmulatedController {
    machine: EspressoMachine,
    last_tick: Instant,
    banner: bool,
}

impl EmulatedController {
    pub fn new(profile: MachineProfile) -> Self {
        Self::with_machine(EspressoMachine::new(profile))
    }

    /// Continue from an existing machine, e.g. across reconnects.
    pub fn with_machine(machine: EspressoMachine) -> Self {
        Self {
            machine,
            last_tick: Instant::now(),
            banner: true,
        }
    }

    /// Skip the boot banner.
    pub fn without_banner(mut self) -> Self {
        self.banner = false;
        self
    }

    pub fn machine(&self) -> &EspressoMachine {
        &self.machine
    }

    /// Answer one command.
    pub fn handle(&mut self, command: &Command) -> DeviceReply {
        self.tick();

        match command {
            Command::ReadStatus => DeviceReply::Status(self.machine.snapshot()),
            Command::StartExtraction => match self.machine.start_extraction() {
                Ok(_) => DeviceReply::Line("EXTRACT START OK".to_string()),
                Err(e) => {
                    debug!(error = %e, "Start rejected");
                    DeviceReply::Line(format!("EXTRACT START BUSY ({})", self.machine.state()))
                }
            },
            Command::StopExtraction => match self.machine.stop_extraction() {
                Ok(_) => DeviceReply::Line("EXTRACT STOP OK".to_string()),
                Err(e) => {
                    debug!(error = %e, "Stop rejected");
                    DeviceReply::Line(format!("EXTRACT STOP IGNORED ({})", self.machine.state()))
                }
            },
            Command::Raw(text) => DeviceReply::Line(format!("ECHO {text}")),
        }
    }

    /// Serve `stream` until the host closes it, then hand the machine back.
    ///
    /// # Errors
    ///
    /// Decode failures (an oversized command) and write failures end the
    /// session with the error.
    pub async fn serve<S>(mut self, stream: S) -> Result<EspressoMachine>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, DeviceCodec::new());
        self.last_tick = Instant::now();

        if self.banner {
            for line in BOOT_BANNER {
                framed.feed(DeviceReply::Line(line.to_string())).await?;
            }
            framed.flush().await?;
        }
        info!(firmware = %self.machine.profile().firmware_version, "Emulator serving");

        while let Some(command) = framed.next().await {
            let command = match command {
                Ok(command) => command,
                Err(e) => {
                    warn!(error = %e, "Emulator dropped the session");
                    return Err(e);
                }
            };

            let reply = self.handle(&command);
            framed.send(reply).await?;
        }

        self.tick();
        info!(uptime_ms = self.machine.uptime().as_millis() as u64, "Host closed the stream");
        Ok(self.machine)
    }

    fn tick(&mut self) {
        let now = Instant::now();
        self.machine.advance(now.duration_since(self.last_tick));
        self.last_tick = now;
    }
}
