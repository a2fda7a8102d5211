//! Status frame extraction.
//!
//! A status frame on the wire looks like:
//!
//! ```text
//! 102@READ@<csv payload>#<checksum>
//! ```
//!
//! Serial reads deliver arbitrary slices of this text: a frame may be split
//! across reads, a read may carry several frames, and a frame may be
//! preceded by line noise or by the abandoned start of an earlier frame.
//!
//! # Extraction rule
//!
//! 1. Find the first marker in the buffer. None: nothing to do.
//! 2. Find the first `#` after that marker. None: the frame is incomplete.
//! 3. Resynchronise on the *last* marker that starts before that `#`.
//!    Anything between the first marker and it is an abandoned fragment.
//! 4. The text between that marker and `#` is the payload. With fewer than
//!    27 fields it is not a frame; scanning resumes after its `#`.
//! 5. On success the caller discards everything up to and including `#`.
//!
//! The checksum after `#` is not verified; its digits are left in the buffer
//! and skipped as noise by the next extraction.

use brewlink_core::MachineStatus;
use brewlink_core::constants::{FRAME_TERMINATOR, STATUS_MARKER};

use crate::parser::StatusParser;

/// A status decoded from the front of a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFrame {
    pub status: MachineStatus,

    /// Byte offset of the marker the frame was decoded from.
    pub start: usize,

    /// Bytes to discard from the front of the buffer (through `#`).
    pub consumed: usize,
}

/// Stateless frame extractor over a text buffer.
///
/// # Example
///
/// ```
/// use brewlink_protocol::FrameParser;
///
/// let fields = vec!["1"; 26].join(",");
/// let buffer = format!("noise102@READ@{fields},FW#12");
///
/// let frame = FrameParser::extract(&buffer).unwrap();
/// assert_eq!(frame.start, 5);
/// assert_eq!(&buffer[frame.consumed..], "12");
/// assert_eq!(frame.status.firmware_version, "FW");
/// ```
pub struct FrameParser;

impl FrameParser {
    /// Extract the oldest complete frame in `buffer`.
    ///
    /// Returns `None` when the buffer holds no marker, when the frame after
    /// the first marker is not terminated yet, or when every terminated
    /// candidate is too short to decode.
    pub fn extract(buffer: &str) -> Option<ExtractedFrame> {
        let mut search_from = 0;

        loop {
            let first = search_from + buffer[search_from..].find(STATUS_MARKER)?;
            let body = first + STATUS_MARKER.len();
            let terminator = body + buffer[body..].find(FRAME_TERMINATOR)?;
            let start = buffer[..terminator].rfind(STATUS_MARKER)?;
            let payload = &buffer[start + STATUS_MARKER.len()..terminator];

            if let Ok(status) = StatusParser::parse(payload) {
                return Some(ExtractedFrame {
                    status,
                    start,
                    consumed: terminator + FRAME_TERMINATOR.len_utf8(),
                });
            }

            search_from = terminator + FRAME_TERMINATOR.len_utf8();
        }
    }
}

/// Build the wire form of a status frame.
///
/// ```
/// use brewlink_core::MachineStatus;
/// use brewlink_protocol::{FrameParser, encode_status_frame};
///
/// let status = MachineStatus { liquid_adc: 7, ..Default::default() };
/// let wire = encode_status_frame(&status, "1234");
///
/// assert!(wire.starts_with("102@READ@0,"));
/// assert!(wire.ends_with("#1234"));
/// assert_eq!(FrameParser::extract(&wire).unwrap().status, status);
/// ```
pub fn encode_status_frame(status: &MachineStatus, checksum: &str) -> String {
    format!("{STATUS_MARKER}{}{FRAME_TERMINATOR}{checksum}", status.to_csv())
}
