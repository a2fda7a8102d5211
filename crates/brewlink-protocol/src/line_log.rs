//! Line splitting for the human-readable serial log.
//!
//! The controller interleaves status frames with free-form debug output. The
//! log buffer turns the raw text into lines for display. It is independent of
//! frame extraction and never affects what gets decoded.

use brewlink_core::constants::LOG_BUFFER_MAX_CHARS;

/// One unit of log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A complete, non-empty line without its line ending.
    Line(String),

    /// Buffered text flushed because it grew past the cap without a line ending.
    Overflow(String),
}

impl LogEntry {
    pub fn text(&self) -> &str {
        match self {
            LogEntry::Line(text) | LogEntry::Overflow(text) => text,
        }
    }
}

/// Accumulates text and emits complete lines.
///
/// Lines end at `\r\n`, `\n` or `\r`. Empty lines are dropped. When an
/// append contains no line ending and the buffer exceeds its cap, the whole
/// buffer is flushed once as [`LogEntry::Overflow`] and reset.
///
/// # Example
///
/// ```
/// use brewlink_protocol::{LineLogBuffer, LogEntry};
///
/// let mut log = LineLogBuffer::new();
/// assert!(log.push("boiler ").is_empty());
///
/// let entries = log.push("ready\r\nheat");
/// assert_eq!(entries, vec![LogEntry::Line("boiler ready".into())]);
/// assert_eq!(log.pending(), "heat");
/// ```
#[derive(Debug)]
pub struct LineLogBuffer {
    buffer: String,
    max_chars: usize,
}

impl Default for LineLogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineLogBuffer {
    pub fn new() -> Self {
        Self::with_max_chars(LOG_BUFFER_MAX_CHARS)
    }

    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            buffer: String::new(),
            max_chars,
        }
    }

    /// Append text and return the entries it completes.
    pub fn push(&mut self, text: &str) -> Vec<LogEntry> {
        self.buffer.push_str(text);

        let mut entries = Vec::new();
        let bytes = self.buffer.as_bytes();
        let mut line_start = 0;
        let mut found_ending = false;
        let mut index = 0;

        while index < bytes.len() {
            let ending_len = match bytes[index] {
                b'\r' if bytes.get(index + 1) == Some(&b'\n') => 2,
                b'\r' | b'\n' => 1,
                _ => {
                    index += 1;
                    continue;
                }
            };

            let line = &self.buffer[line_start..index];
            if !line.is_empty() {
                entries.push(LogEntry::Line(line.to_string()));
            }
            found_ending = true;
            index += ending_len;
            line_start = index;
        }

        if found_ending {
            self.buffer.drain(..line_start);
        } else if self.buffer.len() > self.max_chars && self.buffer.chars().count() > self.max_chars
        {
            entries.push(LogEntry::Overflow(std::mem::take(&mut self.buffer)));
        }

        entries
    }

    /// Text after the last line ending.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
