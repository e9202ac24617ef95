//! # Connection
//!
//! One client session with one server. A [`Connection`] wires the socket
//! layer, the inbound and outbound pipelines, the dispatcher and the state
//! machine together and runs them on three tasks:
//!
//! - **I/O**: the [`SocketLayer`] task reading and writing the TCP stream.
//! - **Inbound**: decrypt, frame, decompress, dispatch. One packet is fully
//!   handled before the next is framed.
//! - **Outbound**: compress, frame, encrypt, in the order sends were made.
//!
//! All state (cipher state, receive state, compression threshold, handler)
//! belongs to the connection. Once a connection is disconnected it stays
//! that way; reconnecting means constructing a new one.
//!
//! ## Example
//! ```rust,no_run
//! use mc_protocol::config::ClientConfig;
//! use mc_protocol::connection::Connection;
//! use mc_protocol::event::EventBus;
//! use mc_protocol::protocol::PacketRegistry;
//! use std::sync::Arc;
//!
//! # async fn run() -> mc_protocol::error::Result<()> {
//! let connection = Connection::new(
//!     ClientConfig::default(),
//!     Arc::new(PacketRegistry::v1_16_1()),
//!     EventBus::default(),
//! );
//! connection.on_packet(|packet, _ctx| {
//!     println!("received {}", packet.name());
//!     Ok(())
//! })?;
//! connection.connect()?;
//! connection.ping()?;
//! # Ok(())
//! # }
//! ```

use crate::config::ClientConfig;
use crate::error::{constants, ProtocolError, Result};
use crate::event::{Event, EventBus};
use crate::pipeline::{InboundPipeline, OutboundPipeline};
use crate::protocol::dispatcher::{DispatchOutcome, Dispatcher};
use crate::protocol::handler::{HandlerContext, PacketHandler};
use crate::protocol::packets::{
    ClientboundPacket, Handshake, LoginStart, ServerboundPacket, StatusRequest,
};
use crate::protocol::registry::PacketRegistry;
use crate::protocol::state::{ConnectionState, NextState};
use crate::transport::{SocketEvent, SocketLayer, SocketOptions};
use crate::utils::metrics::{ConnectionMetrics, MetricsSnapshot};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Work for the outbound task, processed strictly in order.
pub(crate) enum OutboundCommand {
    Packet(Bytes),
    SetCompression(i32),
    EnableEncryption {
        secret: Vec<u8>,
        ack: oneshot::Sender<Result<()>>,
    },
}

/// State shared by the connection handle and its tasks.
pub(crate) struct Shared {
    state: watch::Sender<ConnectionState>,
    registry: Arc<PacketRegistry>,
    outbound: mpsc::UnboundedSender<OutboundCommand>,
    socket: SocketLayer,
    events: EventBus,
    metrics: ConnectionMetrics,
    cancel: CancellationToken,
}

impl Shared {
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn transition(&self, next: ConnectionState) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                debug!(from = %current, to = %next, "Connection state transition");
                *current = next;
                true
            } else {
                outcome = Err(ProtocolError::InvalidStateTransition {
                    from: *current,
                    to: next,
                });
                false
            }
        });
        outcome
    }

    /// Connecting -> Handshaking. Leaves any other state alone, since a
    /// handshake queued before the socket was up has already moved on.
    fn socket_ready(&self) {
        self.state.send_if_modified(|current| {
            if *current == ConnectionState::Connecting {
                debug!("Connection state transition connecting -> handshaking");
                *current = ConnectionState::Handshaking;
                true
            } else {
                false
            }
        });
    }

    pub(crate) fn send(&self, packet: ServerboundPacket) -> Result<()> {
        if self.state().is_terminal() {
            debug!(kind = ?packet.kind(), "Dropping send on disconnected connection");
            return Ok(());
        }

        let bytes = self.registry.encode(&packet).ok_or_else(|| {
            ProtocolError::Custom(format!(
                "No packet id for {:?} in protocol {}",
                packet.kind(),
                self.registry.protocol_version()
            ))
        })?;
        self.queue(OutboundCommand::Packet(bytes));
        Ok(())
    }

    pub(crate) fn queue(&self, command: OutboundCommand) {
        // The receiver is gone once the outbound task has stopped.
        let _ = self.outbound.send(command);
    }

    /// Moves to `Disconnected` and tears down the socket. Returns whether
    /// this call performed the transition.
    pub(crate) fn close(&self, reason: String) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = ConnectionState::Disconnected;
                true
            }
        });

        if changed {
            info!(reason = %reason, "Connection closed");
            self.metrics.log_metrics();
            self.socket.disconnect();
            self.cancel.cancel();
            self.events.dispatch(Event::Disconnected { reason });
        }
        changed
    }

    /// Handles an error from the inbound or outbound pipeline.
    fn fail(&self, err: ProtocolError) {
        let packet_id = match &err {
            ProtocolError::PacketDecode { packet_id, .. } => Some(Some(*packet_id)),
            ProtocolError::Decode(_)
            | ProtocolError::OversizedPacket(_)
            | ProtocolError::DecompressionFailure(_)
            | ProtocolError::DecryptionFailure(_) => Some(None),
            _ => None,
        };

        if let Some(packet_id) = packet_id {
            self.metrics.decode_failure();
            warn!(error = %err, "Failed to decode inbound packet");
            self.events.dispatch(Event::DecodeError {
                packet_id,
                reason: err.to_string(),
            });
        } else {
            error!(error = %err, "Connection failed");
        }
        self.close(err.to_string());
    }
}

#[cfg(test)]
impl Shared {
    /// A detached connection core for exercising handlers without a socket.
    /// Returns the outbound command queue so tests can inspect sends.
    pub(crate) fn detached(
        registry: Arc<PacketRegistry>,
        state: ConnectionState,
        events: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let cancel = CancellationToken::new();
        let (socket, _writes) = SocketLayer::new(cancel.clone());
        let (outbound, commands) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(state);
        let shared = Self {
            state,
            registry,
            outbound,
            socket,
            events,
            metrics: ConnectionMetrics::new(),
            cancel,
        };
        (shared, commands)
    }
}

/// Byte channels created with the connection and consumed by `connect`.
struct Pending {
    commands: mpsc::UnboundedReceiver<OutboundCommand>,
    writes: mpsc::UnboundedReceiver<Bytes>,
}

pub struct Connection {
    config: ClientConfig,
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    pending: Mutex<Option<Pending>>,
}

impl Connection {
    /// Creates an idle connection. Nothing touches the network until
    /// [`Connection::connect`].
    pub fn new(config: ClientConfig, registry: Arc<PacketRegistry>, events: EventBus) -> Self {
        let cancel = CancellationToken::new();
        let (socket, writes) = SocketLayer::new(cancel.clone());
        let (outbound, commands) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Idle);

        let shared = Arc::new(Shared {
            state,
            registry: Arc::clone(&registry),
            outbound,
            socket,
            events,
            metrics: ConnectionMetrics::new(),
            cancel,
        });

        Self {
            config,
            shared,
            dispatcher: Dispatcher::new(registry),
            pending: Mutex::new(Some(Pending { commands, writes })),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn registry(&self) -> &Arc<PacketRegistry> {
        self.dispatcher.registry()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Installs the packet handler, replacing any previous one.
    pub fn set_handler<H: PacketHandler>(&self, handler: H) -> Result<()> {
        self.dispatcher.set_handler(handler)
    }

    /// Installs a closure as the packet handler.
    pub fn on_packet<F>(&self, handler: F) -> Result<()>
    where
        F: FnMut(ClientboundPacket, &mut HandlerContext<'_>) -> Result<()> + Send + 'static,
    {
        self.dispatcher.set_handler(handler)
    }

    /// Starts connecting in the background. Must be called from within a
    /// tokio runtime. Outcome is reported through the event bus.
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    pub fn connect(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ProtocolError::Custom(constants::ERR_NO_RUNTIME.to_string()))?;

        match self.state() {
            ConnectionState::Idle => self.shared.transition(ConnectionState::Connecting)?,
            ConnectionState::Disconnected => {
                return Err(ProtocolError::InvalidStateTransition {
                    from: ConnectionState::Disconnected,
                    to: ConnectionState::Connecting,
                })
            }
            _ => {}
        }

        let pending = self
            .pending
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_ALREADY_STARTED.to_string()))?
            .take()
            .ok_or_else(|| ProtocolError::Custom(constants::ERR_ALREADY_STARTED.to_string()))?;

        let options = SocketOptions {
            host: self.config.host.clone(),
            port: self.config.port,
            connect_timeout: self.config.connect_timeout,
            read_buffer_size: self.config.read_buffer_size,
        };
        let (socket_events_tx, socket_events) = mpsc::unbounded_channel();
        self.shared
            .socket
            .connect(options, pending.writes, socket_events_tx)?;

        let max_packet_size = self.config.max_packet_size;
        runtime.spawn(outbound_loop(
            Arc::clone(&self.shared),
            pending.commands,
            OutboundPipeline::new(max_packet_size),
        ));
        runtime.spawn(inbound_loop(
            Arc::clone(&self.shared),
            self.dispatcher.clone(),
            socket_events,
            InboundPipeline::new(max_packet_size),
        ));

        info!("Connecting");
        Ok(())
    }

    /// Closes the connection. Safe to call more than once and concurrently
    /// with in-flight I/O.
    pub fn disconnect(&self) {
        self.shared.close("Disconnected by client".to_string());
    }

    /// Queues a packet. Before the socket is connected the packet waits in
    /// the write queue; after disconnect it is dropped.
    pub fn send(&self, packet: impl Into<ServerboundPacket>) -> Result<()> {
        self.shared.send(packet.into())
    }

    /// Sends the handshake and moves to the requested state.
    pub fn handshake(&self, next: NextState) -> Result<()> {
        let target = ConnectionState::from(next);
        let current = self.state();
        if !current.can_transition_to(target) {
            return Err(ProtocolError::InvalidStateTransition {
                from: current,
                to: target,
            });
        }

        self.send(Handshake {
            protocol_version: self.config.protocol_version,
            server_address: self.config.host.clone(),
            server_port: self.config.port,
            next_state: next,
        })?;
        self.shared.transition(target)
    }

    /// Handshake into login, then LoginStart for `username`.
    pub fn login(&self, username: &str) -> Result<()> {
        self.handshake(NextState::Login)?;
        self.send(LoginStart {
            username: username.to_string(),
        })
    }

    /// Handshake into status, then a status request.
    pub fn ping(&self) -> Result<()> {
        self.handshake(NextState::Status)?;
        self.send(StatusRequest)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.socket.disconnect();
        self.shared.cancel.cancel();
    }
}

async fn inbound_loop(
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    mut socket_events: mpsc::UnboundedReceiver<SocketEvent>,
    mut pipeline: InboundPipeline,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            event = socket_events.recv() => event,
        };

        match event {
            None => break,
            Some(SocketEvent::Connected) => {
                shared.socket_ready();
                shared.events.dispatch(Event::Connected);
            }
            Some(SocketEvent::Data(bytes)) => {
                shared.metrics.bytes_received(bytes.len() as u64);
                pipeline.push(&bytes);
                if let Err(e) = drain(&shared, &dispatcher, &mut pipeline) {
                    shared.fail(e);
                }
            }
            Some(SocketEvent::Failed(e)) => {
                shared.metrics.connection_error();
                let reason = e.to_string();
                error!(error = %reason, "Socket failure");
                shared.events.dispatch(Event::ConnectionFailed {
                    reason: reason.clone(),
                });
                shared.close(reason);
            }
            Some(SocketEvent::Closed) => {
                shared.close(constants::ERR_CONNECTION_CLOSED.to_string());
            }
        }

        if shared.state().is_terminal() {
            break;
        }
    }

    pipeline.reset();
    debug!("Inbound task stopped");
}

/// Frames and dispatches every complete packet currently buffered.
fn drain(shared: &Shared, dispatcher: &Dispatcher, pipeline: &mut InboundPipeline) -> Result<()> {
    while !shared.state().is_terminal() {
        let Some(payload) = pipeline.next_packet()? else {
            break;
        };

        let mut ctx = HandlerContext::new(shared, pipeline);
        match dispatcher.dispatch(payload, &mut ctx) {
            Ok(DispatchOutcome::Unknown { .. }) => shared.metrics.packet_unknown(),
            Ok(_) => shared.metrics.packet_dispatched(),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Packet handler returned an error");
                shared.metrics.packet_dispatched();
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn outbound_loop(
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<OutboundCommand>,
    mut pipeline: OutboundPipeline,
) {
    loop {
        let command = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            OutboundCommand::Packet(payload) => match pipeline.encode(payload) {
                Ok(wire) => {
                    shared.metrics.packet_sent(wire.len() as u64);
                    shared.socket.write(wire);
                }
                Err(e) => {
                    shared.fail(e);
                    break;
                }
            },
            OutboundCommand::SetCompression(threshold) => {
                pipeline.set_compression_threshold(threshold);
            }
            OutboundCommand::EnableEncryption { secret, ack } => {
                let result = pipeline.enable_encryption(&secret);
                if let Err(e) = &result {
                    error!(error = %e, "Failed to enable outbound encryption");
                }
                let _ = ack.send(result);
            }
        }
    }
    debug!("Outbound task stopped");
}
