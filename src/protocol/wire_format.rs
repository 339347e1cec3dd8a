//! Wire format encoding and decoding.
//!
//! Every frame starts with a packed 16-bit little-endian header word:
//! the top 3 bits carry the message type, the low 13 bits the total
//! frame length in bytes, header included. Control frames follow with a
//! 16-bit item code; `DataItem0` carries an item code, `DataItem1` a
//! sequence number, `DataItem2`/`DataItem3` go straight to the body.
//!
//! ```text
//! ┌───────────────────┬───────────────────┬──────────┐
//! │ Header (2B LE)    │ Sub-header (0/2B) │ Body     │
//! │ type:3 length:13  │ item code or seq  │          │
//! └───────────────────┴───────────────────┴──────────┘
//! ```
//!
//! A data frame of exactly 8194 bytes is encoded with a zero length
//! field; that is the one total the 13-bit field cannot carry.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{NetSdrError, Result};

/// Header size in bytes (the packed length/type word).
pub const HEADER_SIZE: usize = 2;

/// Maximum total frame length expressible in the 13-bit length field.
pub const MAX_FRAME_SIZE: usize = 8191;

/// Maximum total length of a data frame, encoded with a zero length field.
pub const MAX_DATA_FRAME_SIZE: usize = 8194;

/// Bit position of the message type within the header word.
const TYPE_SHIFT: u16 = 13;

/// Mask of the 13-bit length field.
const LENGTH_MASK: u16 = 0x1FFF;

/// Message type carried in the top 3 bits of the header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Host sets a control item value.
    SetControlItem = 0,
    /// Host requests (or receiver reports) the current value of an item.
    CurrentControlItem = 1,
    /// Host requests (or receiver reports) the valid range of an item.
    ControlItemRange = 2,
    /// Acknowledgement of a control exchange.
    Ack = 3,
    /// Data frame carrying an item code sub-header.
    DataItem0 = 4,
    /// Data frame carrying a sequence number sub-header.
    DataItem1 = 5,
    /// Data frame with no sub-header.
    DataItem2 = 6,
    /// Data frame with no sub-header.
    DataItem3 = 7,
}

impl MessageType {
    /// Decode from the top 3 header bits. Total: every 3-bit value maps.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => MessageType::SetControlItem,
            1 => MessageType::CurrentControlItem,
            2 => MessageType::ControlItemRange,
            3 => MessageType::Ack,
            4 => MessageType::DataItem0,
            5 => MessageType::DataItem1,
            6 => MessageType::DataItem2,
            _ => MessageType::DataItem3,
        }
    }

    /// Data-frame types carry sample bytes rather than control parameters.
    #[inline]
    pub fn is_data(self) -> bool {
        self as u8 >= MessageType::DataItem0 as u8
    }
}

/// 16-bit control item identifiers.
///
/// The set is closed: a received frame carrying any other code fails
/// decode with [`DecodeError::UnknownItemCode`](super::DecodeError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ControlItemCode {
    /// Placeholder for frames that carry no item code.
    None = 0x0000,
    /// Run/idle state of the receiver.
    ReceiverState = 0x0018,
    /// NCO center frequency of a receiver channel.
    ReceiverFrequency = 0x0020,
    /// RF filter selection of a receiver channel.
    RFFilter = 0x0044,
    /// A/D converter modes of a receiver channel.
    ADModes = 0x008A,
    /// Output sample rate of the I/Q stream.
    IQOutputDataSampleRate = 0x00B8,
}

impl ControlItemCode {
    /// Look up a wire code. Returns `None` for codes outside the set.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(ControlItemCode::None),
            0x0018 => Some(ControlItemCode::ReceiverState),
            0x0020 => Some(ControlItemCode::ReceiverFrequency),
            0x0044 => Some(ControlItemCode::RFFilter),
            0x008A => Some(ControlItemCode::ADModes),
            0x00B8 => Some(ControlItemCode::IQOutputDataSampleRate),
            _ => None,
        }
    }

    /// The 16-bit wire code.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Pack the header word for a frame of `total_len` bytes.
fn pack_header(ty: MessageType, total_len: usize) -> Result<[u8; HEADER_SIZE]> {
    let field = if ty.is_data() && total_len == MAX_DATA_FRAME_SIZE {
        0
    } else if total_len <= MAX_FRAME_SIZE {
        total_len as u16
    } else {
        let max = if ty.is_data() { MAX_DATA_FRAME_SIZE } else { MAX_FRAME_SIZE };
        return Err(NetSdrError::EncodeTooLong { len: total_len, max });
    };
    let word = field | ((ty as u16) << TYPE_SHIFT);
    Ok(word.to_le_bytes())
}

/// Unpack a header word into message type and declared total length.
pub fn unpack_header(word: u16) -> (MessageType, usize) {
    let ty = MessageType::from_bits((word >> TYPE_SHIFT) as u8);
    let mut len = (word & LENGTH_MASK) as usize;
    if ty.is_data() && len == 0 {
        len = MAX_DATA_FRAME_SIZE;
    }
    (ty, len)
}

/// Encode a control frame: header ‖ item code ‖ params.
///
/// `ty` must be one of the control types (`SetControlItem`,
/// `CurrentControlItem`, `ControlItemRange`, `Ack`). The total frame
/// length must not exceed [`MAX_FRAME_SIZE`].
pub fn encode_control(ty: MessageType, item: ControlItemCode, params: &[u8]) -> Result<Bytes> {
    if ty.is_data() {
        return Err(NetSdrError::InvalidMessageType(ty));
    }
    let total = HEADER_SIZE + 2 + params.len();
    let header = pack_header(ty, total)?;
    let mut buf = BytesMut::with_capacity(total);
    buf.put_slice(&header);
    buf.put_u16_le(item.code());
    buf.put_slice(params);
    Ok(buf.freeze())
}

/// Encode a data frame: header ‖ params.
///
/// `ty` must be one of the data types (`DataItem0`..`DataItem3`). The
/// total frame length must be at most [`MAX_DATA_FRAME_SIZE`]; a total
/// of exactly 8194 is written with a zero length field. Totals of 8192
/// and 8193 bytes are not expressible and are rejected.
pub fn encode_data(ty: MessageType, params: &[u8]) -> Result<Bytes> {
    if !ty.is_data() {
        return Err(NetSdrError::InvalidMessageType(ty));
    }
    let total = HEADER_SIZE + params.len();
    let header = pack_header(ty, total)?;
    let mut buf = BytesMut::with_capacity(total);
    buf.put_slice(&header);
    buf.put_slice(params);
    Ok(buf.freeze())
}

/// Receiver-state parameter block.
///
/// Layout per the NetSDR control-item definition: data-channel selector
/// `0x80` (complex I/Q), run/idle byte (`0x02` run, `0x01` idle),
/// capture mode (`0x80` for 24-bit samples, `0x00` for 16-bit), FIFO
/// block count (unused in contiguous mode).
pub fn receiver_state_params(run: bool, sample_width: u8) -> [u8; 4] {
    let state = if run { 0x02 } else { 0x01 };
    let mode = if sample_width == 24 { 0x80 } else { 0x00 };
    [0x80, state, mode, 0x00]
}

/// Receiver-frequency parameter block: channel selector followed by a
/// 40-bit little-endian frequency in Hz.
pub fn receiver_frequency_params(channel: u8, hz: i64) -> [u8; 6] {
    let le = hz.to_le_bytes();
    [channel, le[0], le[1], le[2], le[3], le[4]]
}

/// I/Q output sample-rate parameter block: channel selector (ignored by
/// the receiver, sent as zero) followed by a 32-bit little-endian rate.
pub fn iq_sample_rate_params(rate: u32) -> [u8; 5] {
    let le = rate.to_le_bytes();
    [0x00, le[0], le[1], le[2], le[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_bits_round_trip() {
        for bits in 0u8..8 {
            let ty = MessageType::from_bits(bits);
            assert_eq!(ty as u8, bits);
        }
    }

    #[test]
    fn data_types_partitioned() {
        assert!(!MessageType::SetControlItem.is_data());
        assert!(!MessageType::Ack.is_data());
        assert!(MessageType::DataItem0.is_data());
        assert!(MessageType::DataItem3.is_data());
    }

    #[test]
    fn item_code_round_trip() {
        for code in [0x0000, 0x0018, 0x0020, 0x0044, 0x008A, 0x00B8] {
            let item = ControlItemCode::from_code(code).unwrap();
            assert_eq!(item.code(), code);
        }
    }

    #[test]
    fn item_code_outside_set() {
        assert_eq!(ControlItemCode::from_code(0x0001), None);
        assert_eq!(ControlItemCode::from_code(0x00B9), None);
        assert_eq!(ControlItemCode::from_code(0xFFFF), None);
    }

    #[test]
    fn minimal_control_frame_layout() {
        let bytes = encode_control(MessageType::Ack, ControlItemCode::ReceiverState, &[]).unwrap();
        // 4 | (3 << 13) = 0x6004, little-endian, then the item code.
        assert_eq!(&bytes[..], &[0x04, 0x60, 0x18, 0x00]);
    }

    #[test]
    fn large_control_frame() {
        let params = vec![0u8; 7500];
        let bytes = encode_control(MessageType::Ack, ControlItemCode::ReceiverState, &params).unwrap();
        assert_eq!(bytes.len(), 7504);

        let word = u16::from_le_bytes([bytes[0], bytes[1]]);
        let (ty, len) = unpack_header(word);
        assert_eq!(ty, MessageType::Ack);
        assert_eq!(len, 7504);

        assert_eq!(&bytes[2..4], &[0x18, 0x00]);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn large_data_frame() {
        let params = vec![0u8; 7500];
        let bytes = encode_data(MessageType::DataItem2, &params).unwrap();
        assert_eq!(bytes.len(), 7502);

        let word = u16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(word & LENGTH_MASK, 7502);
        assert_eq!(word >> TYPE_SHIFT, 6);
    }

    #[test]
    fn length_field_matches_total_length() {
        for n in [0usize, 1, 100, 8187] {
            let bytes =
                encode_control(MessageType::SetControlItem, ControlItemCode::RFFilter, &vec![0; n])
                    .unwrap();
            let word = u16::from_le_bytes([bytes[0], bytes[1]]);
            assert_eq!((word & LENGTH_MASK) as usize, bytes.len());
        }
    }

    #[test]
    fn max_data_frame_uses_zero_length_field() {
        let params = vec![0xABu8; MAX_DATA_FRAME_SIZE - HEADER_SIZE];
        let bytes = encode_data(MessageType::DataItem1, &params).unwrap();
        assert_eq!(bytes.len(), MAX_DATA_FRAME_SIZE);

        let word = u16::from_le_bytes([bytes[0], bytes[1]]);
        assert_eq!(word & LENGTH_MASK, 0);

        let (ty, len) = unpack_header(word);
        assert_eq!(ty, MessageType::DataItem1);
        assert_eq!(len, MAX_DATA_FRAME_SIZE);
    }

    #[test]
    fn control_frame_too_long() {
        let params = vec![0u8; MAX_FRAME_SIZE - 3];
        let err = encode_control(MessageType::Ack, ControlItemCode::None, &params).unwrap_err();
        match err {
            NetSdrError::EncodeTooLong { len, max } => {
                assert_eq!(len, MAX_FRAME_SIZE + 1);
                assert_eq!(max, MAX_FRAME_SIZE);
            }
            other => panic!("expected EncodeTooLong, got {other:?}"),
        }
    }

    #[test]
    fn data_frame_inexpressible_totals() {
        // Totals of 8192 and 8193 fall in the gap between the 13-bit
        // field and the zero-length escape.
        for n in [8190usize, 8191] {
            assert!(encode_data(MessageType::DataItem2, &vec![0; n]).is_err());
        }
        // One past the escape is plainly too long.
        assert!(encode_data(MessageType::DataItem2, &vec![0; 8193]).is_err());
        // The escape itself is fine.
        assert!(encode_data(MessageType::DataItem2, &vec![0; 8192]).is_ok());
    }

    #[test]
    fn encode_rejects_wrong_type_family() {
        assert!(matches!(
            encode_control(MessageType::DataItem0, ControlItemCode::None, &[]),
            Err(NetSdrError::InvalidMessageType(MessageType::DataItem0))
        ));
        assert!(matches!(
            encode_data(MessageType::Ack, &[]),
            Err(NetSdrError::InvalidMessageType(MessageType::Ack))
        ));
    }

    #[test]
    fn receiver_state_blocks() {
        assert_eq!(receiver_state_params(true, 16), [0x80, 0x02, 0x00, 0x00]);
        assert_eq!(receiver_state_params(false, 16), [0x80, 0x01, 0x00, 0x00]);
        assert_eq!(receiver_state_params(true, 24), [0x80, 0x02, 0x80, 0x00]);
    }

    #[test]
    fn frequency_block_is_40_bit_le() {
        let params = receiver_frequency_params(0, 14_000_000);
        assert_eq!(params, [0x00, 0x80, 0x9F, 0xD5, 0x00, 0x00]);

        let params = receiver_frequency_params(2, 0x01_2345_6789);
        assert_eq!(params, [0x02, 0x89, 0x67, 0x45, 0x23, 0x01]);
    }

    #[test]
    fn sample_rate_block() {
        assert_eq!(iq_sample_rate_params(2_000_000), [0x00, 0x80, 0x84, 0x1E, 0x00]);
    }
}
