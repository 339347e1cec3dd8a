//! Scripted in-memory transports for tests.
//!
//! Both mocks record every call through a shared handle and let the
//! test inject inbound traffic. The control mock can also acknowledge
//! every outbound request automatically, which is enough to drive a
//! session through its connect handshake without a real receiver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{ControlTransport, DataTransport};
use crate::error::{NetSdrError, Result};
use crate::protocol::{encode_control, Frame, MessageType};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct ControlInner {
    sent: Mutex<Vec<Bytes>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    chunk_tx: Mutex<Option<mpsc::Sender<Bytes>>>,
    auto_ack: AtomicBool,
}

/// Control transport that records calls and optionally acks every send.
pub struct MockControlTransport {
    inner: Arc<ControlInner>,
    connected: bool,
}

/// Test-side handle to a [`MockControlTransport`].
#[derive(Clone)]
pub struct MockControlHandle {
    inner: Arc<ControlInner>,
}

impl MockControlTransport {
    /// Create a mock (auto-ack on) and its test handle.
    pub fn new() -> (Self, MockControlHandle) {
        let inner = Arc::new(ControlInner::default());
        inner.auto_ack.store(true, Ordering::SeqCst);
        let handle = MockControlHandle { inner: inner.clone() };
        (Self { inner, connected: false }, handle)
    }
}

impl ControlTransport for MockControlTransport {
    async fn connect(&mut self) -> Result<mpsc::Receiver<Bytes>> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        *self.inner.chunk_tx.lock().unwrap() = Some(tx);
        self.connected = true;
        Ok(rx)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        // Dropping the sender closes the chunk stream.
        *self.inner.chunk_tx.lock().unwrap() = None;
        self.connected = false;
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(NetSdrError::NotConnected);
        }
        self.inner.sent.lock().unwrap().push(Bytes::copy_from_slice(bytes));

        if self.inner.auto_ack.load(Ordering::SeqCst) {
            if let Ok(Frame::Control { item, .. }) = Frame::decode(Bytes::copy_from_slice(bytes)) {
                let reply = encode_control(MessageType::Ack, item, &[])?;
                let tx = self.inner.chunk_tx.lock().unwrap().clone();
                if let Some(tx) = tx {
                    let _ = tx.try_send(reply);
                }
            }
        }
        Ok(())
    }
}

impl MockControlHandle {
    /// Turn the automatic ack reply on or off.
    pub fn set_auto_ack(&self, on: bool) {
        self.inner.auto_ack.store(on, Ordering::SeqCst);
    }

    /// Inject one inbound chunk, as if the socket had read it.
    pub fn push_chunk(&self, bytes: impl Into<Bytes>) {
        let tx = self.inner.chunk_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.try_send(bytes.into());
        }
    }

    /// Close the inbound stream without a disconnect call, as a failed
    /// peer would.
    pub fn drop_connection(&self) {
        *self.inner.chunk_tx.lock().unwrap() = None;
    }

    /// Every frame sent so far, in order.
    pub fn sent(&self) -> Vec<Bytes> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Number of `connect` calls observed.
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Number of `disconnect` calls observed.
    pub fn disconnects(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct DataInner {
    starts: AtomicUsize,
    stops: AtomicUsize,
    datagram_tx: Mutex<Option<mpsc::Sender<Bytes>>>,
}

/// Data transport that records calls and replays injected datagrams.
pub struct MockDataTransport {
    inner: Arc<DataInner>,
}

/// Test-side handle to a [`MockDataTransport`].
#[derive(Clone)]
pub struct MockDataHandle {
    inner: Arc<DataInner>,
}

impl MockDataTransport {
    /// Create a mock and its test handle.
    pub fn new() -> (Self, MockDataHandle) {
        let inner = Arc::new(DataInner::default());
        let handle = MockDataHandle { inner: inner.clone() };
        (Self { inner }, handle)
    }
}

impl DataTransport for MockDataTransport {
    async fn start_listening(&mut self) -> Result<mpsc::Receiver<Bytes>> {
        self.inner.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        *self.inner.datagram_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn stop_listening(&mut self) -> Result<()> {
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        *self.inner.datagram_tx.lock().unwrap() = None;
        Ok(())
    }
}

impl MockDataHandle {
    /// Inject one inbound datagram.
    pub fn push_datagram(&self, bytes: impl Into<Bytes>) {
        let tx = self.inner.datagram_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.try_send(bytes.into());
        }
    }

    /// Number of `start_listening` calls observed.
    pub fn starts(&self) -> usize {
        self.inner.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop_listening` calls observed.
    pub fn stops(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }
}
