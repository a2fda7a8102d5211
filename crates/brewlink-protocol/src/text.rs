//! Streaming UTF-8 decoding of serial chunks.
//!
//! A serial read can end in the middle of a multi-byte character. The
//! decoder holds back an incomplete trailing sequence until the next chunk
//! completes it, so a frame split at any byte offset decodes to the same
//! text as the unsplit frame. Invalid sequences become `U+FFFD`.

/// Incremental UTF-8 decoder.
///
/// # Example
///
/// ```
/// use brewlink_protocol::TextDecoder;
///
/// let mut decoder = TextDecoder::new();
/// let euro = "€".as_bytes();
///
/// assert_eq!(decoder.decode(&euro[..1]), "");
/// assert_eq!(decoder.decode(&euro[1..]), "€");
/// ```
#[derive(Debug, Default)]
pub struct TextDecoder {
    /// Bytes of an incomplete trailing sequence (at most 3).
    pending: Vec<u8>,
}

impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning every complete character.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let owned;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            owned = joined;
            &owned
        };

        let mut out = String::with_capacity(input.len());
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[bad..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flush a dangling partial sequence as `U+FFFD`.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut decoder = TextDecoder::new();
        assert_eq!(decoder.decode(b"102@READ@"), "102@READ@");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_split_multibyte_every_offset() {
        let text = "temp 93°C ☕ ok";
        let bytes = text.as_bytes();

        for split in 0..=bytes.len() {
            let mut decoder = TextDecoder::new();
            let mut out = decoder.decode(&bytes[..split]);
            out.push_str(&decoder.decode(&bytes[split..]));
            assert_eq!(out, text, "split at {split}");
            assert_eq!(decoder.pending_len(), 0);
        }
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = TextDecoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_finish_flushes_partial() {
        let mut decoder = TextDecoder::new();
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.finish(), "");
    }
}
