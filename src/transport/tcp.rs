//! TCP control transport.

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::ControlTransport;
use crate::error::{NetSdrError, Result};

/// Capacity of the inbound chunk channel.
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Read buffer size for the receive loop.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Control channel over a TCP connection to the receiver.
///
/// `connect` splits the stream: the write half stays here for `send`,
/// the read half moves into a spawned loop that forwards every socket
/// read as one chunk. EOF or a read error ends the loop and closes the
/// chunk channel.
pub struct TcpControlTransport {
    addr: String,
    conn: Option<Conn>,
}

struct Conn {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

impl TcpControlTransport {
    /// Create a transport that will connect to `addr` (host:port).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), conn: None }
    }
}

impl ControlTransport for TcpControlTransport {
    async fn connect(&mut self) -> Result<mpsc::Receiver<Bytes>> {
        if let Some(conn) = self.conn.take() {
            close(conn).await;
        }

        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();

        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_loop(read_half, tx));
        self.conn = Some(Conn { writer, reader });
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            close(conn).await;
        }
        Ok(())
    }

    fn connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let conn = self.conn.as_mut().ok_or(NetSdrError::NotConnected)?;
        conn.writer.write_all(bytes).await?;
        conn.writer.flush().await?;
        Ok(())
    }
}

async fn close(mut conn: Conn) {
    let _ = conn.writer.shutdown().await;
    conn.reader.abort();
}

/// Forward raw socket reads into the chunk channel until EOF or error.
async fn read_loop(mut reader: OwnedReadHalf, tx: mpsc::Sender<Bytes>) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("control connection closed by peer");
                break;
            }
            Ok(n) => {
                if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("control socket read failed: {}", e);
                break;
            }
        }
    }
}
