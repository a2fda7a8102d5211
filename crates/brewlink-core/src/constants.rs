//! Wire-level constants for the espresso controller serial protocol.
//!
//! The controller speaks a line-agnostic ASCII protocol over a serial link.
//! Status responses look like:
//!
//! ```text
//! 102@READ@<26 numeric fields>,<firmware>#<checksum>
//! ```
//!
//! Where:
//! - `102@READ@` - Status frame marker
//! - `<fields>` - Comma separated values, positional (see [`crate::MachineStatus`])
//! - `#` - Frame terminator
//! - `<checksum>` - Trailing digits, not verified by the host
//!
//! Requests sent by the host are fixed literals ([`POLL_REQUEST`],
//! [`EXTRACT_START`], [`EXTRACT_STOP`]) or free text terminated by
//! [`RAW_COMMAND_TERMINATOR`].
//!
//! # Usage
//!
//! ```
//! use brewlink_core::constants::*;
//!
//! assert!(POLL_REQUEST.starts_with(STATUS_MARKER));
//! assert_eq!(STATUS_FIELD_COUNT, NUMERIC_FIELD_COUNT + 1);
//! ```

// ============================================================================
// Frame Markers
// ============================================================================

/// Marker that opens every status frame.
///
/// The host resynchronises on this marker: garbage or half-received frames
/// before the last marker preceding a terminator are discarded.
pub const STATUS_MARKER: &str = "102@READ@";

/// Terminator that closes a status frame's CSV payload.
pub const FRAME_TERMINATOR: char = '#';

/// Separator between fields of a status payload.
pub const FIELD_SEPARATOR: char = ',';

// ============================================================================
// Host Requests
// ============================================================================

/// Telemetry poll request, sent by the poll scheduler.
///
/// The trailing `43433` is the checksum expected by the controller for this
/// exact literal.
pub const POLL_REQUEST: &str = "102@READ@ALL#43433";

/// Start an extraction cycle.
pub const EXTRACT_START: &str = "102@EXTRACT@START#";

/// Stop the running extraction cycle.
pub const EXTRACT_STOP: &str = "102@EXTRACT@STOP#";

/// Line terminator appended to free-form text commands.
pub const RAW_COMMAND_TERMINATOR: &str = "\n";

// ============================================================================
// Status Layout
// ============================================================================

/// Number of numeric fields at the head of a status payload.
pub const NUMERIC_FIELD_COUNT: usize = 26;

/// Minimum number of fields a status payload must carry to be decoded.
///
/// 26 numeric values plus the firmware version string.
pub const STATUS_FIELD_COUNT: usize = 27;

// ============================================================================
// Buffer Limits
// ============================================================================

/// Characters the parse buffer may hold before it is truncated.
pub const PARSE_BUFFER_MAX_CHARS: usize = 10_000;

/// Characters kept from the tail of the parse buffer after truncation.
///
/// Large enough to retain one partial frame.
pub const PARSE_BUFFER_RETAIN_CHARS: usize = 1_000;

/// Characters the line log buffer may hold without seeing a line ending.
pub const LOG_BUFFER_MAX_CHARS: usize = 2_000;

/// Size of a single read from the channel, in bytes.
pub const READ_CHUNK_SIZE: usize = 4 * 1024;

// ============================================================================
// Timing
// ============================================================================

/// Interval between telemetry polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

// ============================================================================
// Serial Line Settings
// ============================================================================

/// Default baud rate of the controller's UART.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Data bits per character (8N1).
pub const DEFAULT_DATA_BITS: u8 = 8;

/// Stop bits per character (8N1).
pub const DEFAULT_STOP_BITS: u8 = 1;

/// Device description reported when the port exposes no USB identity.
pub const GENERIC_DEVICE_INFO: &str = "Generic Serial Device";
