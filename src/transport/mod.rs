//! Transport capabilities consumed by the session.
//!
//! The control channel is a reliable ordered byte stream; the data
//! channel is an unreliable datagram receiver. Opening either hands
//! back the receive side of an `mpsc` channel: one `Bytes` per received
//! chunk or datagram. The channel closing means the transport stopped.

mod mock;
mod tcp;
mod udp;

pub use mock::{MockControlHandle, MockControlTransport, MockDataHandle, MockDataTransport};
pub use tcp::TcpControlTransport;
pub use udp::UdpDataTransport;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Reliable ordered control channel to the receiver.
///
/// Chunk boundaries carry no meaning: a received chunk may hold part of
/// a frame, a whole frame, or several frames.
#[allow(async_fn_in_trait)]
pub trait ControlTransport: Send {
    /// Open the channel and return the inbound chunk stream.
    async fn connect(&mut self) -> Result<mpsc::Receiver<Bytes>>;

    /// Close the channel. Safe to call repeatedly.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the channel is currently open.
    fn connected(&self) -> bool;

    /// Write one encoded frame. Fails when not connected.
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Unreliable datagram receiver for the sample stream.
#[allow(async_fn_in_trait)]
pub trait DataTransport: Send {
    /// Bind and start receiving; one `Bytes` per datagram.
    async fn start_listening(&mut self) -> Result<mpsc::Receiver<Bytes>>;

    /// Stop receiving. Idempotent and safe without a prior start.
    async fn stop_listening(&mut self) -> Result<()>;
}
