//! # netsdr-client
//!
//! Async client for NetSDR-style software-defined-radio receivers.
//!
//! The receiver is driven over two channels:
//!
//! - **Control** (reliable, ordered): set/query control items (receiver
//!   state, tuning frequency, sample rate, RF filter, A/D modes) in a
//!   strict one-request-at-a-time discipline.
//! - **Data** (unreliable datagrams): unsolicited I/Q sample frames,
//!   pushed by the receiver once streaming has been started.
//!
//! ## Example
//!
//! ```ignore
//! use netsdr_client::{Session, TcpControlTransport, UdpDataTransport};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> netsdr_client::Result<()> {
//!     let control = TcpControlTransport::new("192.168.1.100:50000");
//!     let data = UdpDataTransport::new("0.0.0.0:60000");
//!     let (tx, mut rx) = mpsc::channel(64);
//!
//!     let mut session = Session::new(control, data, tx);
//!     session.connect().await?;
//!     session.change_frequency(14_000_000, 0).await?;
//!     session.start_iq().await?;
//!
//!     while let Some(frame) = rx.recv().await {
//!         for sample in frame.samples()? {
//!             // feed the DSP chain
//!             let _ = sample;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod samples;
pub mod transport;

mod session;

pub use error::{NetSdrError, Result};
pub use protocol::{
    encode_control, encode_data, ControlItemCode, DecodeError, Frame, FrameBuffer, MessageType,
    HEADER_SIZE, MAX_DATA_FRAME_SIZE, MAX_FRAME_SIZE,
};
pub use samples::{samples, Samples};
pub use session::{
    IqFrame, Session, SessionConfig, DEFAULT_RESPONSE_TIMEOUT, DEFAULT_SAMPLE_WIDTH,
};
pub use transport::{
    ControlTransport, DataTransport, MockControlTransport, MockDataTransport, TcpControlTransport,
    UdpDataTransport,
};
