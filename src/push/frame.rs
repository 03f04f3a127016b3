//! Incremental decoder for `text/event-stream` bodies.
//!
//! Network chunks split frames at arbitrary byte offsets, so the decoder
//! buffers partial lines and only emits complete frames:
//!
//! ```rust
//! use contavisite::push::frame::SseDecoder;
//!
//! let mut decoder = SseDecoder::new();
//! assert!(decoder.feed(b"event: views:upd").is_empty());
//! let frames = decoder.feed(b"ated\ndata: {\"count\":43}\n\n");
//! let frame = frames[0].as_ref().unwrap();
//! assert_eq!(frame.event, "views:updated");
//! assert_eq!(frame.data, r#"{"count":43}"#);
//! ```
//!
//! Buffering is bounded. A line longer than [`MAX_LINE`] or a frame whose
//! data exceeds [`MAX_FRAME`] is reported as [`PushError::Malformed`] and
//! the rest of that frame is skipped.

use crate::error::PushError;

/// Event name of frames without an `event:` field.
pub const DEFAULT_EVENT: &str = "message";

/// Longest line the decoder buffers, in bytes.
pub const MAX_LINE: usize = 64 * 1024;

/// Largest total `data:` payload of one frame, in bytes.
pub const MAX_FRAME: usize = 256 * 1024;

/// A complete event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    data_len: usize,
    // skipping an oversized frame until its terminating blank line
    discarding: bool,
    // the current line had content while discarding
    skipped_line: bool,
}

impl SseDecoder {
    /// Creates a decoder with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the frames it completed, plus one error
    /// for each frame dropped for being oversized.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<SseFrame, PushError>> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if self.discarding {
                    if !self.skipped_line {
                        self.discarding = false;
                    }
                    self.skipped_line = false;
                    continue;
                }
                let mut line = std::mem::take(&mut self.line);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if let Some(frame) = self.process_line(&String::from_utf8_lossy(&line)) {
                    frames.push(Ok(frame));
                }
                if self.data_len > MAX_FRAME {
                    frames.push(Err(self.overflow(false, "frame data", MAX_FRAME)));
                }
            } else if self.discarding {
                if byte != b'\r' {
                    self.skipped_line = true;
                }
            } else if self.line.len() >= MAX_LINE {
                frames.push(Err(self.overflow(true, "line", MAX_LINE)));
            } else {
                self.line.push(byte);
            }
        }
        frames
    }

    /// Bytes currently held for incomplete lines and frames.
    pub fn buffered_bytes(&self) -> usize {
        self.line.len() + self.data_len
    }

    fn overflow(&mut self, mid_line: bool, what: &str, limit: usize) -> PushError {
        self.line.clear();
        self.event = None;
        self.data.clear();
        self.data_len = 0;
        self.discarding = true;
        self.skipped_line = mid_line;
        PushError::Malformed(format!("event {what} exceeds {limit} bytes"))
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_len += value.len();
                self.data.push(value.to_string());
            }
            // id and retry only matter for reconnects, which are not attempted
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        self.data_len = 0;
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
        })
    }
}
