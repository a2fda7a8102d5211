//! Serial link management for the espresso controller.
//!
//! This crate owns the host side of the link: opening and closing the
//! channel, the read loop that turns raw chunks into [`MachineStatus`]
//! records and log lines, the periodic telemetry poll and the write path for
//! operator commands.
//!
//! # Architecture
//!
//! ```text
//! ConnectionController<C: Channel>
//!     │
//!     ├─> read task ──── ReadHalf ──> TextDecoder ─┬─> LineLogBuffer ─> tracing
//!     │                                            └─> StreamParser ──> LinkObserver
//!     │
//!     ├─> PollScheduler ──┐
//!     │                   ├─> CommandSender ── WriteHalf ──> channel
//!     └─> send_raw / start / stop ┘
//! ```
//!
//! [`MachineStatus`]: brewlink_core::MachineStatus

pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod mock;
pub mod pipeline;
pub mod poll;
pub mod reader;
pub mod sender;
pub mod serial;

pub use channel::Channel;
pub use config::{BufferSettings, LinkConfig, Parity, PollSettings, SerialSettings};
pub use controller::ConnectionController;
pub use error::LinkError;
pub use events::{EventForwarder, LinkEvent, LinkObserver, NoopObserver, StopReason, event_channel};
pub use mock::{MockChannel, MockDevice, MockProbe};
pub use pipeline::{ChunkPipeline, ProcessedChunk};
pub use poll::PollScheduler;
pub use reader::{ReadLoopHandle, ReadOutcome, SERIAL_LOG_TARGET};
pub use sender::CommandSender;
pub use serial::{PortInfo, SerialChannel, list_ports};
