//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The two reader couplings over the Telnet codec.
//!
//! [`TelnetStream`] is the inline variant: no task, every `read` drives
//! the state machine itself until a data byte is ready or the transport
//! would block. [`TelnetConnection`] is the spawned variant: a dedicated
//! reader task pumps the transport through the codec into a bounded ring
//! that the caller drains at leisure.
//!
//! In both variants, negotiation replies generated by the codec are
//! written to the peer serialized against application writes — a single
//! owner serializes the inline variant, a write-half mutex the spawned
//! one.

use crate::codec::{TelnetCodec, TelnetEncoder};
use crate::error::{Result, TelnetError};
use crate::event::TelnetEvent;
use crate::frame::TelnetFrame;
use crate::handlers::HandlerRegistry;
use crate::options::TelnetOption;
use crate::ring::RingBuffer;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

/// Common surface of the two reader couplings.
#[async_trait]
pub trait TelnetRead {
    /// Reads decoded application bytes, waiting for at least one.
    /// Returns `Ok(0)` at end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Bytes deliverable without touching the transport. Never performs
    /// I/O.
    fn available(&self) -> usize;
}

// ############################################################################
// Inline variant
// ############################################################################

/// An inline Telnet endpoint: the caller's own `read` calls drive the
/// state machine.
///
/// # Example
///
/// ```no_run
/// use retronet_telnet::{TelnetRead, TelnetStream};
/// use tokio::net::TcpStream;
///
/// # async fn example() -> retronet_telnet::Result<()> {
/// let tcp = TcpStream::connect("bbs.example.org:23").await?;
/// let mut telnet = TelnetStream::new(tcp);
/// telnet.negotiate().await?;
/// let mut buf = [0u8; 256];
/// let n = telnet.read(&mut buf).await?;
/// # Ok(())
/// # }
/// ```
pub struct TelnetStream<T> {
    framed: Framed<T, TelnetCodec>,
    ready: VecDeque<u8>,
    events: VecDeque<TelnetEvent>,
    eof: bool,
}

impl<T> TelnetStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a transport with the default option handlers.
    pub fn new(transport: T) -> Self {
        Self::with_handlers(transport, HandlerRegistry::default())
    }

    /// Wraps a transport with a caller-supplied handler registry.
    pub fn with_handlers(transport: T, handlers: HandlerRegistry) -> Self {
        TelnetStream {
            framed: Framed::new(transport, TelnetCodec::with_handlers(handlers)),
            ready: VecDeque::new(),
            events: VecDeque::new(),
            eof: false,
        }
    }

    /// Sends the initial negotiation requests the handler registry asks
    /// for.
    pub async fn negotiate(&mut self) -> Result<()> {
        self.framed.codec_mut().start_negotiation();
        self.flush_replies().await
    }

    /// Requests enabling `option` on our side. Fails with
    /// [`TelnetError::Negotiation`] when no handler supports it.
    pub async fn enable_local(&mut self, option: TelnetOption) -> Result<()> {
        self.framed.codec_mut().request_enable_local(option)?;
        self.flush_replies().await
    }

    /// Requests that the peer enable `option`. Fails with
    /// [`TelnetError::Negotiation`] when no handler supports it.
    pub async fn enable_remote(&mut self, option: TelnetOption) -> Result<()> {
        self.framed.codec_mut().request_enable_remote(option)?;
        self.flush_replies().await
    }

    /// Whether `option` is active on our side.
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.framed.codec().is_enabled_local(option)
    }

    /// Whether `option` is active on the peer's side.
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.framed.codec().is_enabled_remote(option)
    }

    /// Writes application bytes, escaping IAC as needed.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.framed.send(data).await
    }

    /// Sends a single command frame.
    pub async fn send_frame(&mut self, frame: TelnetFrame) -> Result<()> {
        self.framed.send(frame).await
    }

    /// Sends a subnegotiation to the peer.
    pub async fn send_subnegotiation(
        &mut self,
        option: TelnetOption,
        payload: impl Into<Bytes>,
    ) -> Result<()> {
        self.framed
            .send(TelnetFrame::Subnegotiate(option, payload.into()))
            .await
    }

    /// The next non-data event, if one is queued. Events queue up while
    /// `read` skips past them.
    pub fn poll_event(&mut self) -> Option<TelnetEvent> {
        self.events.pop_front()
    }

    async fn flush_replies(&mut self) -> Result<()> {
        while self.framed.codec().has_pending() {
            for frame in self.framed.codec_mut().take_pending() {
                trace!("reply {frame}");
                self.framed.feed(frame).await?;
            }
        }
        // The codec encodes several item types; name one for the flush.
        SinkExt::<TelnetFrame>::flush(&mut self.framed).await
    }
}

#[async_trait]
impl<T> TelnetRead for TelnetStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if !self.ready.is_empty() {
                let take = self.ready.len().min(buf.len());
                for slot in buf.iter_mut().take(take) {
                    *slot = self.ready.pop_front().unwrap_or_default();
                }
                return Ok(take);
            }
            if self.eof {
                return Ok(0);
            }
            match self.framed.next().await {
                Some(Ok(TelnetEvent::Data(byte))) => {
                    self.ready.push_back(byte);
                    self.flush_replies().await?;
                }
                Some(Ok(event)) => {
                    debug!("event {event:?}");
                    self.events.push_back(event);
                    self.flush_replies().await?;
                }
                Some(Err(error)) => return Err(error),
                None => {
                    self.eof = true;
                    return Ok(0);
                }
            }
        }
    }

    fn available(&self) -> usize {
        self.ready.len()
    }
}

// ############################################################################
// Spawned variant
// ############################################################################

/// Control requests forwarded to the reader task, which owns the
/// negotiation state.
#[derive(Debug)]
enum ControlMessage {
    EnableLocal(TelnetOption),
    DisableLocal(TelnetOption),
    EnableRemote(TelnetOption),
    DisableRemote(TelnetOption),
    StartSubnegotiation(TelnetOption),
    Close,
}

/// A Telnet endpoint with a dedicated reader task.
///
/// The task decodes the inbound stream and appends application bytes to a
/// bounded ring ([`crate::RING_CAPACITY`] bytes); `read` drains the ring.
/// When the ring is full the reader task waits, pushing backpressure into
/// the transport. Negotiation state lives in the task; callers steer it
/// through a control channel.
///
/// [`TelnetConnection::close`] is idempotent. After a close, reads drain
/// the ring and then return `Ok(0)`.
pub struct TelnetConnection<T> {
    ring: Arc<RingBuffer>,
    writer: Arc<tokio::sync::Mutex<FramedWrite<WriteHalf<T>, TelnetEncoder>>>,
    control: mpsc::Sender<ControlMessage>,
    reader_handle: Option<JoinHandle<()>>,
    closed: AtomicBool,
}

impl<T> TelnetConnection<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Splits the transport and spawns the reader task, sending any
    /// initial negotiation the handler registry asks for.
    pub fn spawn(transport: T, handlers: HandlerRegistry) -> Self {
        let (read_half, write_half) = tokio::io::split(transport);
        let mut codec = TelnetCodec::with_handlers(handlers);
        codec.start_negotiation();

        let framed_read = FramedRead::new(read_half, codec);
        let writer = Arc::new(tokio::sync::Mutex::new(FramedWrite::new(
            write_half,
            TelnetEncoder,
        )));
        let ring = Arc::new(RingBuffer::new());
        let (control_tx, control_rx) = mpsc::channel(16);

        let reader_handle = tokio::spawn(reader_task(
            framed_read,
            writer.clone(),
            ring.clone(),
            control_rx,
        ));

        TelnetConnection {
            ring,
            writer,
            control: control_tx,
            reader_handle: Some(reader_handle),
            closed: AtomicBool::new(false),
        }
    }

    /// Reads decoded application bytes from the ring.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.ring.read(buf).await?)
    }

    /// Bytes buffered in the ring. Never performs I/O.
    #[must_use]
    pub fn available(&self) -> usize {
        self.ring.available()
    }

    /// Writes application bytes, serialized against negotiation replies.
    pub async fn write_all(&self, data: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TelnetError::Closed);
        }
        let mut writer = self.writer.lock().await;
        for &byte in data {
            writer.feed(TelnetFrame::Data(byte)).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    /// Sends a single command frame.
    pub async fn send_frame(&self, frame: TelnetFrame) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TelnetError::Closed);
        }
        let mut writer = self.writer.lock().await;
        writer.send(frame).await
    }

    /// Asks the reader task to negotiate enabling `option` locally.
    pub async fn enable_local(&self, option: TelnetOption) -> Result<()> {
        self.send_control(ControlMessage::EnableLocal(option)).await
    }

    /// Asks the reader task to negotiate disabling `option` locally.
    pub async fn disable_local(&self, option: TelnetOption) -> Result<()> {
        self.send_control(ControlMessage::DisableLocal(option)).await
    }

    /// Asks the reader task to negotiate enabling `option` on the peer.
    pub async fn enable_remote(&self, option: TelnetOption) -> Result<()> {
        self.send_control(ControlMessage::EnableRemote(option)).await
    }

    /// Asks the reader task to negotiate disabling `option` on the peer.
    pub async fn disable_remote(&self, option: TelnetOption) -> Result<()> {
        self.send_control(ControlMessage::DisableRemote(option)).await
    }

    /// Asks the reader task to start a local subnegotiation for `option`.
    pub async fn start_subnegotiation(&self, option: TelnetOption) -> Result<()> {
        self.send_control(ControlMessage::StartSubnegotiation(option))
            .await
    }

    async fn send_control(&self, message: ControlMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TelnetError::Closed);
        }
        self.control
            .send(message)
            .await
            .map_err(|_| TelnetError::Closed)
    }
}

impl<T> TelnetConnection<T> {
    /// Closes the connection.
    ///
    /// Idempotent: the first call stops the reader task and wakes blocked
    /// readers and writers; later calls do nothing. Bytes already decoded
    /// stay readable until the ring drains, after which reads return
    /// `Ok(0)`. Close never holds the ring lock and the write lock at
    /// once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("closing telnet connection");
        // Closing the ring aborts a reader task blocked on a full ring;
        // the control message reaches it when it is idle in select.
        self.ring.close();
        let _ = self.control.try_send(ControlMessage::Close);
    }

    /// Waits for the reader task to finish after a close.
    pub async fn join(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.await;
        }
    }
}

impl<T> Drop for TelnetConnection<T> {
    fn drop(&mut self) {
        self.close();
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl<T> TelnetRead for TelnetConnection<T>
where
    T: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        TelnetConnection::read(self, buf).await
    }

    fn available(&self) -> usize {
        TelnetConnection::available(self)
    }
}

/// The reader task: pump the transport through the codec into the ring,
/// flushing negotiation replies through the shared writer.
async fn reader_task<T>(
    mut framed: FramedRead<ReadHalf<T>, TelnetCodec>,
    writer: Arc<tokio::sync::Mutex<FramedWrite<WriteHalf<T>, TelnetEncoder>>>,
    ring: Arc<RingBuffer>,
    mut control: mpsc::Receiver<ControlMessage>,
) where
    T: AsyncRead + AsyncWrite,
{
    // Initial negotiation queued by spawn.
    if let Err(error) = flush_pending(&mut framed, &writer).await {
        warn!("could not send initial negotiation: {error}");
    }

    loop {
        tokio::select! {
            decoded = framed.next() => match decoded {
                Some(Ok(TelnetEvent::Data(byte))) => {
                    if ring.write_all(&[byte]).await.is_err() {
                        // The caller closed; stop pumping.
                        break;
                    }
                }
                Some(Ok(event)) => {
                    trace!("event {event:?}");
                    if let Err(error) = flush_pending(&mut framed, &writer).await {
                        ring.fail(to_io_error(error));
                        break;
                    }
                }
                Some(Err(error)) => {
                    ring.fail(to_io_error(error));
                    break;
                }
                None => break,
            },
            message = control.recv() => match message {
                Some(ControlMessage::EnableLocal(option)) => {
                    if let Err(error) = framed.decoder_mut().request_enable_local(option) {
                        warn!("{error}");
                    }
                    if let Err(error) = flush_pending(&mut framed, &writer).await {
                        ring.fail(to_io_error(error));
                        break;
                    }
                }
                Some(ControlMessage::DisableLocal(option)) => {
                    framed.decoder_mut().request_disable_local(option);
                    if let Err(error) = flush_pending(&mut framed, &writer).await {
                        ring.fail(to_io_error(error));
                        break;
                    }
                }
                Some(ControlMessage::EnableRemote(option)) => {
                    if let Err(error) = framed.decoder_mut().request_enable_remote(option) {
                        warn!("{error}");
                    }
                    if let Err(error) = flush_pending(&mut framed, &writer).await {
                        ring.fail(to_io_error(error));
                        break;
                    }
                }
                Some(ControlMessage::DisableRemote(option)) => {
                    framed.decoder_mut().request_disable_remote(option);
                    if let Err(error) = flush_pending(&mut framed, &writer).await {
                        ring.fail(to_io_error(error));
                        break;
                    }
                }
                Some(ControlMessage::StartSubnegotiation(option)) => {
                    framed.decoder_mut().start_subnegotiation(option);
                    if let Err(error) = flush_pending(&mut framed, &writer).await {
                        ring.fail(to_io_error(error));
                        break;
                    }
                }
                Some(ControlMessage::Close) | None => break,
            },
        }

        // Data bytes can also leave replies queued (a negotiation decoded
        // just before them); drain opportunistically.
        if framed.decoder().has_pending() {
            if let Err(error) = flush_pending(&mut framed, &writer).await {
                ring.fail(to_io_error(error));
                break;
            }
        }
    }

    ring.close();
    debug!("telnet reader task terminated");
}

async fn flush_pending<T>(
    framed: &mut FramedRead<ReadHalf<T>, TelnetCodec>,
    writer: &Arc<tokio::sync::Mutex<FramedWrite<WriteHalf<T>, TelnetEncoder>>>,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite,
{
    let frames = framed.decoder_mut().take_pending();
    if frames.is_empty() {
        return Ok(());
    }
    let mut writer = writer.lock().await;
    for frame in frames {
        trace!("reply {frame}");
        writer.feed(frame).await?;
    }
    writer.flush().await?;
    Ok(())
}

fn to_io_error(error: TelnetError) -> std::io::Error {
    match error {
        TelnetError::Io(error) => error,
        other => std::io::Error::other(other.to_string()),
    }
}
