//! Decoded frame representation.
//!
//! [`Frame::decode`] turns one framed buffer (a datagram, or a slice the
//! [`FrameBuffer`](super::FrameBuffer) carved out of the control stream)
//! into a tagged variant. Bodies are `bytes::Bytes`, so sub-slicing the
//! input is zero-copy.

use bytes::Bytes;
use thiserror::Error;

use super::wire_format::{unpack_header, ControlItemCode, MessageType, HEADER_SIZE};

/// Offset of the body in frames that carry an item code or sequence
/// number sub-header.
const SUB_HEADER_END: usize = 4;

/// Failure modes when decoding a received frame.
///
/// None of these are fatal to a session: the frame is dropped, a log
/// event is emitted, and the stream continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Buffer shorter than the 2-byte header.
    #[error("frame shorter than the 2-byte header")]
    Empty,

    /// Declared length differs from the actual buffer length.
    #[error("declared length {declared} does not match buffer length {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Item code outside the closed known set.
    #[error("unknown control item code {0:#06x}")]
    UnknownItemCode(u16),

    /// Frame too short for the sub-header its type requires.
    #[error("{0}-byte frame is too short for its sub-header")]
    Truncated(usize),
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Control exchange: set/current/range/ack with an item code.
    Control {
        /// One of the four control message types.
        ty: MessageType,
        /// The control item the exchange refers to.
        item: ControlItemCode,
        /// Item parameters (may be empty).
        body: Bytes,
    },
    /// `DataItem0`: sample bytes tagged with an item code.
    DataWithItem {
        /// The control item the data belongs to.
        item: ControlItemCode,
        /// Sample bytes.
        body: Bytes,
    },
    /// `DataItem1`: sample bytes tagged with a sequence number.
    DataWithSeq {
        /// 16-bit counter used to detect loss on the datagram channel.
        seq: u16,
        /// Sample bytes.
        body: Bytes,
    },
    /// `DataItem2` / `DataItem3`: sample bytes with no sub-header.
    DataBare {
        /// Which of the two bare data types this is.
        ty: MessageType,
        /// Sample bytes.
        body: Bytes,
    },
}

impl Frame {
    /// Decode one framed buffer.
    ///
    /// The buffer must hold exactly one frame: the declared length in
    /// the header has to match `buf.len()` (with the zero-length field
    /// of a maximum-size data frame standing for 8194).
    pub fn decode(buf: Bytes) -> Result<Frame, DecodeError> {
        if buf.len() < HEADER_SIZE {
            return Err(DecodeError::Empty);
        }
        let word = u16::from_le_bytes([buf[0], buf[1]]);
        let (ty, declared) = unpack_header(word);
        if declared != buf.len() {
            return Err(DecodeError::LengthMismatch { declared, actual: buf.len() });
        }

        match ty {
            MessageType::SetControlItem
            | MessageType::CurrentControlItem
            | MessageType::ControlItemRange
            | MessageType::Ack => {
                let item = read_item_code(&buf)?;
                Ok(Frame::Control { ty, item, body: buf.slice(SUB_HEADER_END..) })
            }
            MessageType::DataItem0 => {
                let item = read_item_code(&buf)?;
                Ok(Frame::DataWithItem { item, body: buf.slice(SUB_HEADER_END..) })
            }
            MessageType::DataItem1 => {
                if buf.len() < SUB_HEADER_END {
                    return Err(DecodeError::Truncated(buf.len()));
                }
                let seq = u16::from_le_bytes([buf[2], buf[3]]);
                Ok(Frame::DataWithSeq { seq, body: buf.slice(SUB_HEADER_END..) })
            }
            MessageType::DataItem2 | MessageType::DataItem3 => {
                Ok(Frame::DataBare { ty, body: buf.slice(HEADER_SIZE..) })
            }
        }
    }

    /// The message type this frame was decoded from.
    pub fn message_type(&self) -> MessageType {
        match self {
            Frame::Control { ty, .. } | Frame::DataBare { ty, .. } => *ty,
            Frame::DataWithItem { .. } => MessageType::DataItem0,
            Frame::DataWithSeq { .. } => MessageType::DataItem1,
        }
    }

    /// Whether this is a data frame (sample bytes in the body).
    #[inline]
    pub fn is_data(&self) -> bool {
        self.message_type().is_data()
    }

    /// The item code, for the frame types that carry one.
    pub fn item_code(&self) -> Option<ControlItemCode> {
        match self {
            Frame::Control { item, .. } | Frame::DataWithItem { item, .. } => Some(*item),
            _ => None,
        }
    }

    /// The sequence number, for `DataItem1` frames.
    pub fn sequence_number(&self) -> Option<u16> {
        match self {
            Frame::DataWithSeq { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// The frame body.
    pub fn body(&self) -> &Bytes {
        match self {
            Frame::Control { body, .. }
            | Frame::DataWithItem { body, .. }
            | Frame::DataWithSeq { body, .. }
            | Frame::DataBare { body, .. } => body,
        }
    }

    /// Consume the frame, keeping only the body.
    pub fn into_body(self) -> Bytes {
        match self {
            Frame::Control { body, .. }
            | Frame::DataWithItem { body, .. }
            | Frame::DataWithSeq { body, .. }
            | Frame::DataBare { body, .. } => body,
        }
    }
}

fn read_item_code(buf: &Bytes) -> Result<ControlItemCode, DecodeError> {
    if buf.len() < SUB_HEADER_END {
        return Err(DecodeError::Truncated(buf.len()));
    }
    let code = u16::from_le_bytes([buf[2], buf[3]]);
    ControlItemCode::from_code(code).ok_or(DecodeError::UnknownItemCode(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_control, encode_data};

    #[test]
    fn decode_control_round_trip() {
        let params = vec![0u8; 7500];
        let bytes = encode_control(MessageType::Ack, ControlItemCode::ReceiverState, &params).unwrap();

        let frame = Frame::decode(bytes).unwrap();
        match &frame {
            Frame::Control { ty, item, body } => {
                assert_eq!(*ty, MessageType::Ack);
                assert_eq!(*item, ControlItemCode::ReceiverState);
                assert_eq!(body.len(), 7500);
                assert!(body.iter().all(|&b| b == 0));
            }
            other => panic!("expected control frame, got {other:?}"),
        }
        assert_eq!(frame.sequence_number(), None);
    }

    #[test]
    fn decode_every_control_type() {
        for ty in [
            MessageType::SetControlItem,
            MessageType::CurrentControlItem,
            MessageType::ControlItemRange,
            MessageType::Ack,
        ] {
            let bytes = encode_control(ty, ControlItemCode::RFFilter, &[0x01, 0x02]).unwrap();
            let frame = Frame::decode(bytes).unwrap();
            assert_eq!(frame.message_type(), ty);
            assert_eq!(frame.item_code(), Some(ControlItemCode::RFFilter));
            assert_eq!(&frame.body()[..], &[0x01, 0x02]);
        }
    }

    #[test]
    fn decode_data_with_item() {
        let mut raw = encode_control(MessageType::SetControlItem, ControlItemCode::ADModes, &[9])
            .unwrap()
            .to_vec();
        // Rewrite the type bits to DataItem0, keeping length and item code.
        let word = u16::from_le_bytes([raw[0], raw[1]]) & 0x1FFF | (4 << 13);
        raw[..2].copy_from_slice(&word.to_le_bytes());

        let frame = Frame::decode(Bytes::from(raw)).unwrap();
        match frame {
            Frame::DataWithItem { item, body } => {
                assert_eq!(item, ControlItemCode::ADModes);
                assert_eq!(&body[..], &[9]);
            }
            other => panic!("expected DataWithItem, got {other:?}"),
        }
    }

    #[test]
    fn decode_data_with_seq() {
        let mut params = 0x1234u16.to_le_bytes().to_vec();
        params.extend_from_slice(&[0xAA, 0xBB]);
        let bytes = encode_data(MessageType::DataItem1, &params).unwrap();

        let frame = Frame::decode(bytes).unwrap();
        match &frame {
            Frame::DataWithSeq { seq, body } => {
                assert_eq!(*seq, 0x1234);
                assert_eq!(&body[..], &[0xAA, 0xBB]);
            }
            other => panic!("expected DataWithSeq, got {other:?}"),
        }
        assert_eq!(frame.sequence_number(), Some(0x1234));
        assert_eq!(frame.item_code(), None);
    }

    #[test]
    fn decode_bare_data() {
        for ty in [MessageType::DataItem2, MessageType::DataItem3] {
            let bytes = encode_data(ty, &[1, 2, 3]).unwrap();
            let frame = Frame::decode(bytes).unwrap();
            match &frame {
                Frame::DataBare { ty: got, body } => {
                    assert_eq!(*got, ty);
                    assert_eq!(&body[..], &[1, 2, 3]);
                }
                other => panic!("expected DataBare, got {other:?}"),
            }
            assert!(frame.is_data());
        }
    }

    #[test]
    fn decode_minimum_bare_data_frame() {
        let bytes = encode_data(MessageType::DataItem2, &[]).unwrap();
        assert_eq!(bytes.len(), 2);
        let frame = Frame::decode(bytes).unwrap();
        assert!(frame.body().is_empty());
    }

    #[test]
    fn decode_maximum_data_frame() {
        let params = vec![0x55u8; 8192];
        let bytes = encode_data(MessageType::DataItem3, &params).unwrap();
        assert_eq!(bytes.len(), 8194);
        let frame = Frame::decode(bytes).unwrap();
        assert_eq!(frame.body().len(), 8192);
    }

    #[test]
    fn decode_rejects_short_buffers() {
        assert_eq!(Frame::decode(Bytes::new()), Err(DecodeError::Empty));
        assert_eq!(Frame::decode(Bytes::from_static(&[0x04])), Err(DecodeError::Empty));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let bytes = encode_control(MessageType::Ack, ControlItemCode::ReceiverState, &[7, 8, 9])
            .unwrap()
            .to_vec();

        let mut truncated = bytes.clone();
        truncated.pop();
        assert!(matches!(
            Frame::decode(Bytes::from(truncated)),
            Err(DecodeError::LengthMismatch { declared: 7, actual: 6 })
        ));

        let mut extended = bytes;
        extended.push(0);
        assert!(matches!(
            Frame::decode(Bytes::from(extended)),
            Err(DecodeError::LengthMismatch { declared: 7, actual: 8 })
        ));
    }

    #[test]
    fn decode_rejects_unknown_item_code() {
        // Well-formed control frame with a code outside the closed set.
        let word: u16 = 6 | (MessageType::SetControlItem as u16) << 13;
        let mut raw = word.to_le_bytes().to_vec();
        raw.extend_from_slice(&0x0042u16.to_le_bytes());
        raw.extend_from_slice(&[0xFF, 0xFF]);
        assert_eq!(
            Frame::decode(Bytes::from(raw)),
            Err(DecodeError::UnknownItemCode(0x0042))
        );

        // Same for DataItem0.
        let word: u16 = 6 | (MessageType::DataItem0 as u16) << 13;
        let mut raw = word.to_le_bytes().to_vec();
        raw.extend_from_slice(&0x0042u16.to_le_bytes());
        raw.extend_from_slice(&[0xFF, 0xFF]);
        assert_eq!(
            Frame::decode(Bytes::from(raw)),
            Err(DecodeError::UnknownItemCode(0x0042))
        );
    }

    #[test]
    fn decode_rejects_missing_sub_header() {
        // A 3-byte control frame cannot hold its 2-byte item code.
        let word: u16 = 3 | (MessageType::Ack as u16) << 13;
        let mut raw = word.to_le_bytes().to_vec();
        raw.push(0x18);
        assert_eq!(Frame::decode(Bytes::from(raw)), Err(DecodeError::Truncated(3)));

        // Same for the DataItem1 sequence number.
        let word: u16 = 3 | (MessageType::DataItem1 as u16) << 13;
        let mut raw = word.to_le_bytes().to_vec();
        raw.push(0x00);
        assert_eq!(Frame::decode(Bytes::from(raw)), Err(DecodeError::Truncated(3)));
    }
}
