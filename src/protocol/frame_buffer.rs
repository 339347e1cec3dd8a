//! Reassembly of the control byte stream into frames.
//!
//! The control transport delivers raw socket reads, which may split a
//! frame across chunks or coalesce several frames into one. The
//! [`FrameBuffer`] accumulates chunks, carves out slices of exactly the
//! declared frame length, and decodes each one.
//!
//! Decode failures are reported per frame so the caller can drop the
//! bad frame and keep the stream alive. The one unrecoverable case is a
//! declared length smaller than the header itself: the next frame
//! boundary is unknowable, so the buffer clears itself and reports the
//! error.

use bytes::{Bytes, BytesMut};

use super::frame::{DecodeError, Frame};
use super::wire_format::{unpack_header, HEADER_SIZE};

/// Initial capacity of the reassembly buffer, sized for a handful of
/// maximum-length frames.
const INITIAL_CAPACITY: usize = 32 * 1024;

/// Buffer for accumulating inbound chunks and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    /// Create an empty frame buffer.
    pub fn new() -> Self {
        Self { buffer: BytesMut::with_capacity(INITIAL_CAPACITY) }
    }

    /// Push one received chunk and decode every frame it completes.
    ///
    /// Returns one entry per complete frame, in stream order; an `Err`
    /// entry is a frame that was carved out but failed to decode.
    /// Partial trailing data stays buffered for the next push.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Frame, DecodeError>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        // A decode failure has already consumed its frame's bytes, so
        // extraction just keeps going; the unrecoverable short-length
        // case empties the buffer, which ends the loop by itself.
        while let Some(result) = self.try_extract_one() {
            frames.push(result);
        }
        frames
    }

    /// Try to carve and decode a single frame from the front of the buffer.
    ///
    /// Returns `None` when more data is needed. A decode failure has
    /// already consumed the frame's bytes, except for the unrecoverable
    /// short-length case, which drops the whole buffer.
    fn try_extract_one(&mut self) -> Option<Result<Frame, DecodeError>> {
        if self.buffer.len() < HEADER_SIZE {
            return None;
        }

        let word = u16::from_le_bytes([self.buffer[0], self.buffer[1]]);
        let (_, declared) = unpack_header(word);

        if declared < HEADER_SIZE {
            // The stream cannot be resynchronized past a bogus length.
            self.buffer.clear();
            return Some(Err(DecodeError::Truncated(declared)));
        }
        if self.buffer.len() < declared {
            return None;
        }

        let framed: Bytes = self.buffer.split_to(declared).freeze();
        Some(Frame::decode(framed))
    }

    /// Number of buffered bytes awaiting a complete frame.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard all buffered data.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
