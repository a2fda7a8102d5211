//! Tokio codec for the controller side of the serial link.
//!
//! `DeviceCodec` lets anything that plays the espresso controller (the
//! emulator, a loopback test peer) sit on a `Framed` stream:
//! - [`Decoder`]: extracts host [`Command`]s from the byte stream
//! - [`Encoder<DeviceReply>`]: writes status frames and log lines
//!
//! ```text
//! host bytes -> Decoder -> Command
//! DeviceReply -> Encoder -> "102@READ@...#<checksum>" | "<line>\r\n"
//! ```
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use brewlink_core::MachineStatus;
//! use brewlink_protocol::{Command, DeviceCodec, DeviceReply};
//! use futures::{SinkExt, StreamExt};
//! use tokio_util::codec::Framed;
//!
//! # async fn example(stream: tokio::io::DuplexStream) -> brewlink_core::Result<()> {
//! let mut framed = Framed::new(stream, DeviceCodec::new());
//!
//! while let Some(command) = framed.next().await {
//!     if command? == Command::ReadStatus {
//!         framed.send(DeviceReply::Status(MachineStatus::default())).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Host command recognition
//!
//! Control literals are recognised wherever they appear; bytes before them
//! that do not end a line are discarded as noise. Any other text is returned
//! as [`Command::Raw`] once its `\n` arrives (a trailing `\r` is stripped and
//! blank lines are skipped).

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use brewlink_core::constants::{EXTRACT_START, EXTRACT_STOP, POLL_REQUEST};
use brewlink_core::{Error, MachineStatus, Result};

use crate::commands::Command;
use crate::frame::encode_status_frame;

/// Default maximum size of an undelimited command, in bytes.
///
/// Host commands are short; anything larger is line noise.
const DEFAULT_MAX_COMMAND_SIZE: usize = 4 * 1024;

/// Literals the controller acts on, paired with the command they carry.
static CONTROL_LITERALS: [(&str, Command); 3] = [
    (POLL_REQUEST, Command::ReadStatus),
    (EXTRACT_START, Command::StartExtraction),
    (EXTRACT_STOP, Command::StopExtraction),
];

/// Something the controller writes back to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceReply {
    /// A status frame, written with a checksum suffix.
    Status(MachineStatus),

    /// A line of debug output, written with `\r\n`.
    Line(String),
}

/// Checksum appended to emitted status frames: the byte sum of the payload
/// modulo 65536, in decimal. The host does not verify it.
pub fn payload_checksum(payload: &str) -> u16 {
    payload
        .bytes()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(byte)))
}

/// Tokio codec for the controller end of the link.
#[derive(Debug)]
pub struct DeviceCodec {
    max_command_size: usize,
}

impl Default for DeviceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceCodec {
    pub fn new() -> Self {
        Self::with_max_command_size(DEFAULT_MAX_COMMAND_SIZE)
    }

    pub fn with_max_command_size(max_command_size: usize) -> Self {
        Self { max_command_size }
    }

    pub fn max_command_size(&self) -> usize {
        self.max_command_size
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl Decoder for DeviceCodec {
    type Item = Command;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        loop {
            let bytes: &[u8] = &src[..];
            let literal = CONTROL_LITERALS
                .iter()
                .filter_map(|(text, command)| {
                    find(bytes, text.as_bytes()).map(|pos| (pos, text.len(), command))
                })
                .min_by_key(|(pos, _, _)| *pos);
            let newline = bytes.iter().position(|&b| b == b'\n');

            match (literal, newline) {
                (Some((pos, len, command)), newline) if newline.is_none_or(|nl| pos < nl) => {
                    let _ = src.split_to(pos + len);
                    return Ok(Some(command.clone()));
                }
                (_, Some(nl)) => {
                    let line = src.split_to(nl + 1);
                    let line = &line[..nl];
                    let line = line.strip_suffix(b"\r").unwrap_or(line);
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Ok(Some(Command::Raw(String::from_utf8_lossy(line).into_owned())));
                }
                _ => {
                    if src.len() > self.max_command_size {
                        let size = src.len();
                        src.clear();
                        return Err(Error::FrameTooLarge {
                            size,
                            max: self.max_command_size,
                        });
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Command>> {
        match self.decode(src)? {
            Some(command) => Ok(Some(command)),
            None => {
                // An unterminated tail at hang-up is noise.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<DeviceReply> for DeviceCodec {
    type Error = Error;

    fn encode(&mut self, reply: DeviceReply, dst: &mut BytesMut) -> Result<()> {
        match reply {
            DeviceReply::Status(status) => {
                let checksum = payload_checksum(&status.to_csv());
                dst.put_slice(encode_status_frame(&status, &checksum.to_string()).as_bytes());
            }
            DeviceReply::Line(text) => {
                dst.reserve(text.len() + 2);
                dst.put_slice(text.as_bytes());
                dst.put_slice(b"\r\n");
            }
        }
        Ok(())
    }
}
