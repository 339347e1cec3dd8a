//! Receiver session: serialized control exchanges and the sample stream.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::error::{NetSdrError, Result};
use crate::protocol::{
    encode_control, iq_sample_rate_params, receiver_frequency_params, receiver_state_params,
    ControlItemCode, Frame, FrameBuffer, MessageType,
};
use crate::samples::{samples, Samples};
use crate::transport::{ControlTransport, DataTransport};

/// Default window to wait for a control response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Default sample width in bits.
pub const DEFAULT_SAMPLE_WIDTH: u8 = 16;

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long to wait for the reply to a control request.
    pub response_timeout: Duration,
    /// Bit width of the samples carried in data frames.
    pub sample_width: u8,
    /// Receiver channel the session probes and tunes by default.
    pub channel: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            sample_width: DEFAULT_SAMPLE_WIDTH,
            channel: 0,
        }
    }
}

/// One decoded data frame, delivered to the session's consumer.
#[derive(Debug, Clone)]
pub struct IqFrame {
    /// Sequence number, zero for frame types that carry none.
    pub sequence: u16,
    /// Sample width the session was configured with.
    pub sample_width: u8,
    /// Raw sample bytes.
    pub body: Bytes,
}

impl IqFrame {
    /// Iterate the packed samples of this frame.
    pub fn samples(&self) -> Result<Samples<'_>> {
        samples(self.sample_width, &self.body)
    }
}

/// The single pending-response slot: at most one control request is in
/// flight, and the next inbound control frame fulfills it. The control
/// loop fails the waiter with `ConnectionClosed` when the transport
/// drops out from under it.
type PendingSlot = Arc<Mutex<Option<oneshot::Sender<Result<Frame>>>>>;

/// Client session for a NetSDR-style receiver.
///
/// Owns the control and data transports exclusively. Control requests
/// are serialized: each is sent and its reply awaited before the next
/// goes out. While streaming, datagrams are decoded and forwarded to
/// the consumer channel supplied at construction. A session is bound to
/// its transports for life; to start over, build a new one.
pub struct Session<C, D> {
    control: C,
    data: D,
    config: SessionConfig,
    sink: mpsc::Sender<IqFrame>,
    connected: Arc<AtomicBool>,
    iq_started: Arc<AtomicBool>,
    pending: PendingSlot,
    dropped_frames: Arc<AtomicU64>,
    /// Bumped on every connect/disconnect so a stale control loop
    /// cannot force down a newer connection.
    epoch: Arc<AtomicU64>,
}

impl<C: ControlTransport, D: DataTransport> Session<C, D> {
    /// Create a session with default configuration.
    pub fn new(control: C, data: D, sink: mpsc::Sender<IqFrame>) -> Self {
        Self::with_config(control, data, sink, SessionConfig::default())
    }

    /// Create a session with explicit configuration.
    pub fn with_config(control: C, data: D, sink: mpsc::Sender<IqFrame>, config: SessionConfig) -> Self {
        Self {
            control,
            data,
            config,
            sink,
            connected: Arc::new(AtomicBool::new(false)),
            iq_started: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(Mutex::new(None)),
            dropped_frames: Arc::new(AtomicU64::new(0)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether the control channel is open.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether streaming was last toggled on.
    pub fn iq_started(&self) -> bool {
        self.iq_started.load(Ordering::SeqCst)
    }

    /// Frames dropped so far because they failed to decode or arrived
    /// on the wrong channel.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Open the control channel and probe the receiver.
    ///
    /// Idempotent: a connected session is left untouched. The probe
    /// sequence queries receiver state, RF filter, and A/D modes, each
    /// reply awaited before the next request goes out.
    pub async fn connect(&mut self) -> Result<()> {
        if self.connected() {
            return Ok(());
        }

        let chunks = self.control.connect().await?;
        self.connected.store(true, Ordering::SeqCst);
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::spawn(control_loop(
            chunks,
            self.pending.clone(),
            self.connected.clone(),
            self.iq_started.clone(),
            self.dropped_frames.clone(),
            self.epoch.clone(),
            epoch,
        ));
        tracing::debug!("control channel open, probing receiver");

        let channel = self.config.channel;
        self.request(MessageType::CurrentControlItem, ControlItemCode::ReceiverState, &[])
            .await?;
        self.request(MessageType::CurrentControlItem, ControlItemCode::RFFilter, &[channel])
            .await?;
        self.request(MessageType::CurrentControlItem, ControlItemCode::ADModes, &[channel])
            .await?;
        Ok(())
    }

    /// Close the control channel.
    ///
    /// Always safe: every call closes the transport again, any waiter
    /// on the pending slot is cancelled, and `iq_started` is left as it
    /// was.
    pub async fn disconnect(&mut self) -> Result<()> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        self.pending.lock().unwrap().take();
        self.control.disconnect().await?;
        Ok(())
    }

    /// Start the I/Q stream. No-op when not connected or already started.
    pub async fn start_iq(&mut self) -> Result<()> {
        if !self.connected() || self.iq_started() {
            return Ok(());
        }

        let params = receiver_state_params(true, self.config.sample_width);
        self.request(MessageType::SetControlItem, ControlItemCode::ReceiverState, &params)
            .await?;

        let datagrams = self.data.start_listening().await?;
        tokio::spawn(data_pump(
            datagrams,
            self.sink.clone(),
            self.config.sample_width,
            self.dropped_frames.clone(),
        ));
        self.iq_started.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop the I/Q stream. No-op when not connected.
    ///
    /// The data transport is always told to stop, even without a prior
    /// start; the idle request is only sent when streaming was on.
    pub async fn stop_iq(&mut self) -> Result<()> {
        if !self.connected() {
            return Ok(());
        }

        self.data.stop_listening().await?;
        if self.iq_started() {
            let params = receiver_state_params(false, self.config.sample_width);
            self.request(MessageType::SetControlItem, ControlItemCode::ReceiverState, &params)
                .await?;
        }
        self.iq_started.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Tune `channel` to `hz`. No-op when not connected.
    pub async fn change_frequency(&mut self, hz: i64, channel: u8) -> Result<()> {
        if !self.connected() {
            return Ok(());
        }
        let params = receiver_frequency_params(channel, hz);
        self.request(MessageType::SetControlItem, ControlItemCode::ReceiverFrequency, &params)
            .await?;
        Ok(())
    }

    /// Set the I/Q output sample rate. No-op when not connected.
    pub async fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        if !self.connected() {
            return Ok(());
        }
        let params = iq_sample_rate_params(rate);
        self.request(MessageType::SetControlItem, ControlItemCode::IQOutputDataSampleRate, &params)
            .await?;
        Ok(())
    }

    /// Send one control request and wait for the matching reply.
    async fn request(&mut self, ty: MessageType, item: ControlItemCode, params: &[u8]) -> Result<Frame> {
        let bytes = encode_control(ty, item, params)?;

        let (tx, rx) = oneshot::channel();
        *self.pending.lock().unwrap() = Some(tx);

        if let Err(e) = self.control.send(&bytes).await {
            self.pending.lock().unwrap().take();
            return Err(e);
        }

        match timeout(self.config.response_timeout, rx).await {
            Ok(Ok(result)) => result,
            // The slot was dropped by an explicit disconnect.
            Ok(Err(_)) => Err(NetSdrError::Cancelled),
            Err(_) => {
                self.pending.lock().unwrap().take();
                Err(NetSdrError::Timeout)
            }
        }
    }
}

/// Reassemble control chunks into frames and fulfill the pending slot.
///
/// Runs until the chunk channel closes. A close observed while this
/// loop is still the session's current one means the transport went
/// down on its own: the session is forced to `Disconnected` and any
/// waiter fails with `ConnectionClosed`.
async fn control_loop(
    mut chunks: mpsc::Receiver<Bytes>,
    pending: PendingSlot,
    connected: Arc<AtomicBool>,
    iq_started: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    epoch: Arc<AtomicU64>,
    my_epoch: u64,
) {
    let mut framer = FrameBuffer::new();
    while let Some(chunk) = chunks.recv().await {
        for result in framer.push(&chunk) {
            match result {
                Ok(frame) if !frame.is_data() => {
                    let waiter = pending.lock().unwrap().take();
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(Ok(frame));
                        }
                        None => {
                            tracing::debug!(ty = ?frame.message_type(), "control frame with no pending request, dropping");
                        }
                    }
                }
                Ok(frame) => {
                    tracing::debug!(ty = ?frame.message_type(), "data frame on the control channel, dropping");
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::warn!("dropping undecodable control frame: {}", e);
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    if epoch.load(Ordering::SeqCst) == my_epoch {
        tracing::warn!("control connection lost");
        connected.store(false, Ordering::SeqCst);
        iq_started.store(false, Ordering::SeqCst);
        if let Some(tx) = pending.lock().unwrap().take() {
            let _ = tx.send(Err(NetSdrError::ConnectionClosed));
        }
    } else {
        tracing::debug!("control loop superseded, exiting");
    }
}

/// Decode datagrams and forward data frames to the consumer.
async fn data_pump(
    mut datagrams: mpsc::Receiver<Bytes>,
    sink: mpsc::Sender<IqFrame>,
    sample_width: u8,
    dropped: Arc<AtomicU64>,
) {
    while let Some(datagram) = datagrams.recv().await {
        match Frame::decode(datagram) {
            Ok(frame) if frame.is_data() => {
                let iq = IqFrame {
                    sequence: frame.sequence_number().unwrap_or(0),
                    sample_width,
                    body: frame.into_body(),
                };
                if sink.send(iq).await.is_err() {
                    tracing::debug!("data consumer gone, stopping pump");
                    break;
                }
            }
            Ok(frame) => {
                tracing::debug!(ty = ?frame.message_type(), "control frame on the data channel, dropping");
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!("dropping undecodable datagram: {}", e);
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
    tracing::debug!("data stream closed");
}
