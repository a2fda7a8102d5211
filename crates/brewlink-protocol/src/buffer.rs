//! Bounded text accumulator for frame extraction.
//!
//! The parse buffer holds characters that have not yet been consumed as part
//! of a frame: at most one trailing partial frame plus any noise that has
//! not been trimmed yet. When it grows past [`BufferLimits::max_chars`]
//! without a frame being found, it keeps only the last
//! [`BufferLimits::retain_chars`] characters, enough to hold one partial
//! frame.
//!
//! Limits are counted in characters, not bytes.

use brewlink_core::constants::{PARSE_BUFFER_MAX_CHARS, PARSE_BUFFER_RETAIN_CHARS};
use serde::{Deserialize, Serialize};

/// Truncation thresholds for a [`ParseBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferLimits {
    /// Size above which the buffer is truncated.
    pub max_chars: usize,

    /// Size of the tail kept after truncation.
    pub retain_chars: usize,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            max_chars: PARSE_BUFFER_MAX_CHARS,
            retain_chars: PARSE_BUFFER_RETAIN_CHARS,
        }
    }
}

/// Text accumulator with truncate-to-tail overflow semantics.
///
/// # Example
///
/// ```
/// use brewlink_protocol::{BufferLimits, ParseBuffer};
///
/// let mut buffer = ParseBuffer::new(BufferLimits { max_chars: 8, retain_chars: 3 });
/// buffer.push_str("0123456789");
///
/// assert_eq!(buffer.enforce_limit(), Some(7));
/// assert_eq!(buffer.as_str(), "789");
/// ```
#[derive(Debug, Default)]
pub struct ParseBuffer {
    data: String,
    limits: BufferLimits,
}

impl ParseBuffer {
    pub fn new(limits: BufferLimits) -> Self {
        Self {
            data: String::new(),
            limits,
        }
    }

    pub fn limits(&self) -> BufferLimits {
        self.limits
    }

    pub fn push_str(&mut self, text: &str) {
        self.data.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of characters currently held.
    pub fn char_len(&self) -> usize {
        self.data.chars().count()
    }

    /// Drop the first `len` bytes.
    ///
    /// `len` must fall on a character boundary; frame consumption always ends
    /// just after the ASCII terminator so this holds for every caller.
    pub fn consume(&mut self, len: usize) {
        let len = len.min(self.data.len());
        self.data.drain(..len);
    }

    /// Truncate to the retained tail if the buffer is over its cap.
    ///
    /// Returns the number of characters discarded, or `None` if the buffer was
    /// within limits.
    pub fn enforce_limit(&mut self) -> Option<usize> {
        // A string can't hold more chars than bytes.
        if self.data.len() <= self.limits.max_chars {
            return None;
        }

        let chars = self.char_len();
        if chars <= self.limits.max_chars {
            return None;
        }

        let discard = chars - self.limits.retain_chars.min(chars);
        let cut = self
            .data
            .char_indices()
            .nth(discard)
            .map_or(self.data.len(), |(index, _)| index);
        self.data.drain(..cut);
        Some(discard)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = BufferLimits::default();
        assert_eq!(limits.max_chars, 10_000);
        assert_eq!(limits.retain_chars, 1_000);
    }

    #[test]
    fn test_consume_prefix() {
        let mut buffer = ParseBuffer::default();
        buffer.push_str("abc#def");
        buffer.consume(4);
        assert_eq!(buffer.as_str(), "def");

        buffer.consume(100);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_at_cap_not_truncated() {
        let mut buffer = ParseBuffer::default();
        buffer.push_str(&"x".repeat(10_000));
        assert_eq!(buffer.enforce_limit(), None);
        assert_eq!(buffer.char_len(), 10_000);
    }

    #[test]
    fn test_over_cap_keeps_exact_tail() {
        let mut buffer = ParseBuffer::default();
        let noise: String = (0..10_001).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        buffer.push_str(&noise);

        assert_eq!(buffer.enforce_limit(), Some(9_001));
        assert_eq!(buffer.as_str(), &noise[9_001..]);
        assert_eq!(buffer.char_len(), 1_000);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let mut buffer = ParseBuffer::new(BufferLimits {
            max_chars: 4,
            retain_chars: 2,
        });
        // 4 chars, 8 bytes: within limit.
        buffer.push_str("éééé");
        assert_eq!(buffer.enforce_limit(), None);

        buffer.push_str("ü");
        assert_eq!(buffer.enforce_limit(), Some(3));
        assert_eq!(buffer.as_str(), "éü");
    }
}
