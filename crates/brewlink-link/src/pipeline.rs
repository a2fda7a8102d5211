//! Per-chunk processing on the read path.
//!
//! One raw chunk goes through, in order: UTF-8 decoding, the line log buffer,
//! the stream parser (all complete frames drained, then the buffer cap). The
//! result is handed back to the read loop, which logs and notifies.

use brewlink_core::MachineStatus;
use brewlink_protocol::{LineLogBuffer, LogEntry, StreamParser, TextDecoder};

use crate::config::BufferSettings;

/// Everything one chunk produced.
#[derive(Debug, Default, PartialEq)]
pub struct ProcessedChunk {
    /// The chunk as text (split characters are carried to the next chunk).
    pub text: String,

    /// Decoded statuses, oldest first.
    pub statuses: Vec<MachineStatus>,

    /// Completed log lines and overflow flushes.
    pub log_entries: Vec<LogEntry>,

    /// Characters dropped by the parse buffer cap.
    pub truncated: Option<usize>,
}

/// Owns the read-side buffers of one connection.
#[derive(Debug)]
pub struct ChunkPipeline {
    decoder: TextDecoder,
    log: LineLogBuffer,
    parser: StreamParser,
}

impl ChunkPipeline {
    pub fn new(settings: &BufferSettings) -> Self {
        Self {
            decoder: TextDecoder::new(),
            log: LineLogBuffer::with_max_chars(settings.log_max_chars),
            parser: StreamParser::with_limits(settings.parse_limits()),
        }
    }

    /// Run one chunk through every stage.
    pub fn process(&mut self, bytes: &[u8]) -> ProcessedChunk {
        let text = self.decoder.decode(bytes);
        self.run(text)
    }

    /// Flush a character left incomplete when the stream ended. It comes
    /// out as `U+FFFD`; the result is empty if nothing was pending.
    pub fn finish(&mut self) -> ProcessedChunk {
        let text = self.decoder.finish();
        if text.is_empty() {
            return ProcessedChunk::default();
        }
        self.run(text)
    }

    fn run(&mut self, text: String) -> ProcessedChunk {
        let log_entries = self.log.push(&text);
        let summary = self.parser.feed(&text);
        let statuses = self.parser.drain_statuses().collect();

        ProcessedChunk {
            text,
            statuses,
            log_entries,
            truncated: summary.truncated,
        }
    }

    #[cfg(test)]
    fn parse_backlog(&self) -> &str {
        self.parser.buffered()
    }

    #[cfg(test)]
    fn log_backlog(&self) -> &str {
        self.log.pending()
    }
}
