pub mod buffer;
pub mod codec;
pub mod commands;
pub mod field;
pub mod frame;
pub mod line_log;
pub mod parser;
pub mod stream_parser;
pub mod text;

pub use buffer::{BufferLimits, ParseBuffer};
pub use codec::{DeviceCodec, DeviceReply};
pub use commands::Command;
pub use frame::{ExtractedFrame, FrameParser, encode_status_frame};
pub use line_log::{LineLogBuffer, LogEntry};
pub use parser::StatusParser;
pub use stream_parser::{DrainStatuses, FeedSummary, StreamParser};
pub use text::TextDecoder;
