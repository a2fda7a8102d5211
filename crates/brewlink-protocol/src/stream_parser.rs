//! Stream parser for status frames.
//!
//! This module provides a stateful parser that accumulates decoded serial
//! text and extracts every complete status frame from it, in arrival order.
//! It owns the [`ParseBuffer`] and applies the buffer cap after each feed.
//!
//! # Usage
//!
//! ```
//! use brewlink_protocol::StreamParser;
//!
//! let fields = vec!["0"; 26].join(",");
//! let frame = format!("102@READ@{fields},FW2.1#4321");
//! let (head, tail) = frame.split_at(20);
//!
//! let mut parser = StreamParser::new();
//! parser.feed(head);
//! assert!(parser.next_status().is_none());
//!
//! parser.feed(tail);
//! let status = parser.next_status().unwrap();
//! assert_eq!(status.firmware_version, "FW2.1");
//! ```

use std::collections::VecDeque;

use brewlink_core::MachineStatus;

use crate::buffer::{BufferLimits, ParseBuffer};
use crate::frame::FrameParser;

/// Statuses are usually drained one or two at a time.
const INITIAL_STATUS_QUEUE_CAPACITY: usize = 4;

/// What a single [`StreamParser::feed`] call produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Frames decoded and queued.
    pub frames: usize,

    /// Characters dropped by the buffer cap, if it tripped.
    pub truncated: Option<usize>,
}

/// Stateful stream parser for status frames.
///
/// Each [`feed`](StreamParser::feed) appends text, extracts frames until no
/// complete frame is left, then enforces the buffer cap. Decoded statuses
/// queue up until taken with [`next_status`](StreamParser::next_status) or
/// [`drain_statuses`](StreamParser::drain_statuses).
#[derive(Debug)]
pub struct StreamParser {
    buffer: ParseBuffer,
    statuses: VecDeque<MachineStatus>,
    truncations: u64,
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamParser {
    pub fn new() -> Self {
        Self::with_limits(BufferLimits::default())
    }

    pub fn with_limits(limits: BufferLimits) -> Self {
        Self {
            buffer: ParseBuffer::new(limits),
            statuses: VecDeque::with_capacity(INITIAL_STATUS_QUEUE_CAPACITY),
            truncations: 0,
        }
    }

    /// Feed decoded text into the parser.
    ///
    /// Multiple frames may be extracted from a single call. They are queued
    /// oldest first.
    ///
    /// ```
    /// use brewlink_protocol::StreamParser;
    ///
    /// let fields = vec!["1"; 26].join(",");
    /// let chunk = format!("102@READ@{fields},A#1102@READ@{fields},B#2");
    ///
    /// let mut parser = StreamParser::new();
    /// let summary = parser.feed(&chunk);
    ///
    /// assert_eq!(summary.frames, 2);
    /// assert_eq!(parser.statuses_available(), 2);
    /// ```
    pub fn feed(&mut self, text: &str) -> FeedSummary {
        self.buffer.push_str(text);

        let mut frames = 0;
        while let Some(frame) = FrameParser::extract(self.buffer.as_str()) {
            self.buffer.consume(frame.consumed);
            self.statuses.push_back(frame.status);
            frames += 1;
        }

        let truncated = self.buffer.enforce_limit();
        if truncated.is_some() {
            self.truncations += 1;
        }

        FeedSummary { frames, truncated }
    }

    /// Take the oldest decoded status.
    pub fn next_status(&mut self) -> Option<MachineStatus> {
        self.statuses.pop_front()
    }

    /// Returns number of statuses ready for extraction.
    pub fn statuses_available(&self) -> usize {
        self.statuses.len()
    }

    /// Returns an iterator that drains all currently queued statuses.
    ///
    /// It does not parse more of the buffer; call [`feed()`] first.
    ///
    /// [`feed()`]: StreamParser::feed
    pub fn drain_statuses(&mut self) -> DrainStatuses<'_> {
        DrainStatuses { parser: self }
    }

    /// Text not yet consumed by a frame.
    pub fn buffered(&self) -> &str {
        self.buffer.as_str()
    }

    /// How many times the buffer cap has tripped since creation.
    pub fn truncations(&self) -> u64 {
        self.truncations
    }

    /// Discard buffered text and queued statuses.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.statuses.clear();
    }
}

/// Iterator returned by [`StreamParser::drain_statuses`].
#[derive(Debug)]
pub struct DrainStatuses<'a> {
    parser: &'a mut StreamParser,
}

impl Iterator for DrainStatuses<'_> {
    type Item = MachineStatus;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_status()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.parser.statuses_available();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DrainStatuses<'_> {}
