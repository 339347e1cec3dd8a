//! Protocol layer: wire format, frame reassembly, decoded frames.
//!
//! - 16-bit packed length/type header encoding/decoding
//! - [`FrameBuffer`] for accumulating partial stream reads
//! - [`Frame`] sum type with typed accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{DecodeError, Frame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    encode_control, encode_data, iq_sample_rate_params, receiver_frequency_params,
    receiver_state_params, unpack_header, ControlItemCode, MessageType, HEADER_SIZE,
    MAX_DATA_FRAME_SIZE, MAX_FRAME_SIZE,
};
