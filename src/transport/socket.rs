//! # Socket Layer
//!
//! Owns the TCP stream of one connection on a dedicated I/O task.
//!
//! The task connects with a bounded timeout, then loops over three sources:
//! cancellation, queued writes and socket reads. Inbound bytes are forwarded
//! as [`SocketEvent::Data`] exactly as read, with no regard for packet
//! boundaries.
//!
//! Writes submitted before the socket is connected wait in the write queue
//! and are flushed in submission order once it is. Writes submitted after
//! the layer has closed are dropped.

use crate::error::{constants, ProtocolError, Result};
use crate::utils::timeout::with_timeout_error;
use bytes::{Bytes, BytesMut};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

/// What the I/O task reports upstream.
#[derive(Debug)]
pub enum SocketEvent {
    Connected,
    Data(Bytes),
    /// Connecting failed, or the open socket errored.
    Failed(ProtocolError),
    /// The peer closed the stream.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SocketStatus {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
}

impl SocketStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SocketStatus::Idle,
            1 => SocketStatus::Connecting,
            2 => SocketStatus::Connected,
            _ => SocketStatus::Disconnected,
        }
    }
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_buffer_size: usize,
}

/// Handle to the I/O task. Cloning shares the same socket.
#[derive(Debug, Clone)]
pub struct SocketLayer {
    writes: mpsc::UnboundedSender<Bytes>,
    status: Arc<AtomicU8>,
    cancel: CancellationToken,
}

impl SocketLayer {
    /// Creates the layer in the idle state. Writes are accepted and queued
    /// from this point on.
    pub fn new(cancel: CancellationToken) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (writes, queue) = mpsc::unbounded_channel();
        let layer = Self {
            writes,
            status: Arc::new(AtomicU8::new(SocketStatus::Idle as u8)),
            cancel,
        };
        (layer, queue)
    }

    pub fn status(&self) -> SocketStatus {
        SocketStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: SocketStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Spawns the I/O task. Events are delivered on `events` until the layer
    /// closes.
    pub fn connect(
        &self,
        options: SocketOptions,
        queue: mpsc::UnboundedReceiver<Bytes>,
        events: mpsc::UnboundedSender<SocketEvent>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ProtocolError::Custom(constants::ERR_NO_RUNTIME.to_string()))?;
        if self.status() != SocketStatus::Idle {
            return Err(ProtocolError::Custom(
                constants::ERR_ALREADY_STARTED.to_string(),
            ));
        }

        self.set_status(SocketStatus::Connecting);
        let layer = self.clone();
        runtime.spawn(async move {
            layer.run(options, queue, events).await;
        });
        Ok(())
    }

    /// Queues bytes for writing. Dropped silently once closed.
    pub fn write(&self, bytes: Bytes) {
        if self.status() == SocketStatus::Disconnected {
            trace!(len = bytes.len(), "Dropping write on closed socket");
            return;
        }
        let _ = self.writes.send(bytes);
    }

    /// Closes the socket. Safe to call repeatedly and from any task.
    pub fn disconnect(&self) {
        self.set_status(SocketStatus::Disconnected);
        self.cancel.cancel();
    }

    #[instrument(skip(self, queue, events), fields(host = %options.host, port = options.port))]
    async fn run(
        &self,
        options: SocketOptions,
        mut queue: mpsc::UnboundedReceiver<Bytes>,
        events: mpsc::UnboundedSender<SocketEvent>,
    ) {
        let stream = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Cancelled while connecting");
                return;
            }
            result = with_timeout_error(
                TcpStream::connect((options.host.as_str(), options.port)),
                options.connect_timeout,
            ) => match result {
                Ok(stream) => stream,
                Err(ProtocolError::Timeout) => {
                    error!(
                        timeout_ms = options.connect_timeout.as_millis() as u64,
                        "{}",
                        constants::ERR_CONNECT_TIMEOUT
                    );
                    self.fail(&events, ProtocolError::Timeout);
                    return;
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect");
                    let target = format!("{}:{}", options.host, options.port);
                    self.fail(&events, ProtocolError::Transport(format!("{target}: {e}")));
                    return;
                }
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Could not disable Nagle's algorithm");
        }

        self.set_status(SocketStatus::Connected);
        info!("Connected");
        let _ = events.send(SocketEvent::Connected);

        let (mut reader, mut writer) = stream.into_split();
        let mut buffer = BytesMut::with_capacity(options.read_buffer_size);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Socket cancelled");
                    break;
                }

                Some(bytes) = queue.recv() => {
                    let written = tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        result = writer.write_all(&bytes) => result,
                    };
                    if let Err(e) = written {
                        error!(error = %e, "Socket write failed");
                        self.fail(&events, ProtocolError::Io(e));
                        return;
                    }
                    trace!(len = bytes.len(), "Wrote bytes");
                }

                result = reader.read_buf(&mut buffer) => match result {
                    Ok(0) => {
                        info!("Server closed the connection");
                        self.set_status(SocketStatus::Disconnected);
                        let _ = events.send(SocketEvent::Closed);
                        return;
                    }
                    Ok(n) => {
                        trace!(len = n, "Read bytes");
                        let _ = events.send(SocketEvent::Data(buffer.split().freeze()));
                        buffer.reserve(options.read_buffer_size);
                    }
                    Err(e) => {
                        error!(error = %e, "Socket read failed");
                        self.fail(&events, ProtocolError::Io(e));
                        return;
                    }
                }
            }
        }

        self.set_status(SocketStatus::Disconnected);
        let _ = writer.shutdown().await;
    }

    fn fail(&self, events: &mpsc::UnboundedSender<SocketEvent>, err: ProtocolError) {
        self.set_status(SocketStatus::Disconnected);
        let _ = events.send(SocketEvent::Failed(err));
    }
}
