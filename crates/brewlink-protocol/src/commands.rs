//! Host-to-controller commands.

use std::fmt;

use brewlink_core::constants::{EXTRACT_START, EXTRACT_STOP, POLL_REQUEST, RAW_COMMAND_TERMINATOR};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A request the host can write to the controller.
///
/// Control commands are fixed literals written without a line ending. Raw
/// text is written as typed, followed by `\n`.
///
/// # Example
///
/// ```
/// use brewlink_protocol::Command;
///
/// assert_eq!(Command::ReadStatus.to_wire(), "102@READ@ALL#43433");
/// assert_eq!(Command::Raw("AT".into()).to_wire(), "AT\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command", content = "text")]
pub enum Command {
    /// Telemetry poll.
    ReadStatus,
    StartExtraction,
    StopExtraction,
    /// Free-form text typed by the operator.
    Raw(String),
}

impl Command {
    /// The exact text written to the channel.
    pub fn to_wire(&self) -> String {
        match self {
            Command::ReadStatus => POLL_REQUEST.to_string(),
            Command::StartExtraction => EXTRACT_START.to_string(),
            Command::StopExtraction => EXTRACT_STOP.to_string(),
            Command::Raw(text) => format!("{text}{RAW_COMMAND_TERMINATOR}"),
        }
    }

    /// Wire bytes, ready for a single write.
    pub fn encode(&self) -> Bytes {
        Bytes::from(self.to_wire())
    }

    /// True for the periodic poll, which is logged at a lower level.
    pub fn is_poll(&self) -> bool {
        matches!(self, Command::ReadStatus)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::ReadStatus => write!(f, "ReadStatus"),
            Command::StartExtraction => write!(f, "StartExtraction"),
            Command::StopExtraction => write!(f, "StopExtraction"),
            Command::Raw(text) => write!(f, "Raw({text:?})"),
        }
    }
}
