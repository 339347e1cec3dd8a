//! UDP data transport.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::DataTransport;
use crate::error::Result;
use crate::protocol::MAX_DATA_FRAME_SIZE;

/// Capacity of the inbound datagram channel.
const DATAGRAM_CHANNEL_CAPACITY: usize = 256;

/// Datagram receiver bound to a local UDP port.
///
/// `start_listening` binds the socket and spawns a receive loop that
/// forwards one `Bytes` per datagram; `stop_listening` tears the loop
/// down, which also closes the datagram channel.
pub struct UdpDataTransport {
    bind_addr: String,
    local_addr: Option<SocketAddr>,
    listener: Option<JoinHandle<()>>,
}

impl UdpDataTransport {
    /// Create a transport that will bind to `bind_addr` (host:port).
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self { bind_addr: bind_addr.into(), local_addr: None, listener: None }
    }

    /// The address actually bound, once listening. Useful when binding
    /// to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl DataTransport for UdpDataTransport {
    async fn start_listening(&mut self) -> Result<mpsc::Receiver<Bytes>> {
        if let Some(task) = self.listener.take() {
            task.abort();
        }

        let socket = UdpSocket::bind(&self.bind_addr).await?;
        self.local_addr = Some(socket.local_addr()?);

        let (tx, rx) = mpsc::channel(DATAGRAM_CHANNEL_CAPACITY);
        self.listener = Some(tokio::spawn(recv_loop(socket, tx)));
        Ok(rx)
    }

    async fn stop_listening(&mut self) -> Result<()> {
        if let Some(task) = self.listener.take() {
            task.abort();
        }
        Ok(())
    }
}

/// Forward datagrams into the channel until the socket fails or the
/// receiver goes away.
async fn recv_loop(socket: UdpSocket, tx: mpsc::Sender<Bytes>) {
    let mut buf = vec![0u8; MAX_DATA_FRAME_SIZE];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, _peer)) => {
                if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("data socket receive failed: {}", e);
                break;
            }
        }
    }
}
