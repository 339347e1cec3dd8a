//! Error types for netsdr-client.

use thiserror::Error;

use crate::protocol::{DecodeError, MessageType};

/// Main error type for all receiver-client operations.
#[derive(Debug, Error)]
pub enum NetSdrError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation required an open control channel.
    #[error("not connected")]
    NotConnected,

    /// The control connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// No reply to a control request within the allotted window.
    #[error("timed out waiting for control response")]
    Timeout,

    /// A pending control request was cancelled by disconnect.
    #[error("request cancelled")]
    Cancelled,

    /// Inbound frame failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Attempt to encode a frame the 13-bit length field cannot carry.
    #[error("frame of {len} bytes cannot be encoded (limit {max})")]
    EncodeTooLong { len: usize, max: usize },

    /// Encode called with a message type outside the function's family.
    #[error("message type {0:?} is not valid here")]
    InvalidMessageType(MessageType),

    /// Sample width outside 1..=32.
    #[error("invalid sample width {0}, must be 1..=32")]
    InvalidSampleWidth(u8),
}

/// Result type alias using NetSdrError.
pub type Result<T> = std::result::Result<T, NetSdrError>;
