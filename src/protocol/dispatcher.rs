//! # Protocol Dispatch
//!
//! Top of the inbound pipeline. Reads the packet id from a framed,
//! decompressed payload, looks it up under the connection's current state
//! and hands the decoded packet to the registered handler.
//!
//! A lookup miss is logged and the packet dropped; servers routinely send
//! packets a client does not model. A decode failure inside a known packet
//! is fatal: the caller must close the connection.

use crate::codec::Buffer;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::handler::{HandlerContext, PacketHandler};
use crate::protocol::packets::ClientboundPacket;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::state::ConnectionState;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

type HandlerSlot = Arc<Mutex<Option<Box<dyn PacketHandler>>>>;

/// Result of decoding one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Packet { id: i32, packet: ClientboundPacket },
    Unknown { id: i32 },
}

/// What happened to a dispatched payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded and passed to the handler.
    Handled { id: i32, name: &'static str },
    /// Decoded, but no handler is installed.
    NoHandler { id: i32, name: &'static str },
    /// No decoder for this id in the current state; dropped.
    Unknown { id: i32 },
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PacketRegistry>,
    handler: HandlerSlot,
}

impl Dispatcher {
    pub fn new(registry: Arc<PacketRegistry>) -> Self {
        Self {
            registry,
            handler: Arc::new(Mutex::new(None)),
        }
    }

    pub fn registry(&self) -> &Arc<PacketRegistry> {
        &self.registry
    }

    /// Installs `handler`, replacing any previous one.
    pub fn set_handler<H: PacketHandler>(&self, handler: H) -> Result<()> {
        let mut slot = self
            .handler
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_HANDLER_LOCK.to_string()))?;
        *slot = Some(Box::new(handler));
        Ok(())
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Decodes `payload` under `state` without invoking a handler.
    pub fn decode(&self, state: ConnectionState, payload: Bytes) -> Result<Decoded> {
        let mut buffer = Buffer::new(payload);
        let id = buffer.read_varint()?;

        let Some(decoder) = self.registry.decoder(state, id) else {
            debug!(%state, "Non-existent packet received with id 0x{:02x}", id);
            return Ok(Decoded::Unknown { id });
        };

        let packet = decoder(&mut buffer).map_err(|source| ProtocolError::PacketDecode {
            packet_id: id,
            state,
            source,
        })?;

        if buffer.has_remaining() {
            debug!(
                %state,
                packet = packet.name(),
                leftover = buffer.remaining(),
                "Packet 0x{:02x} has unread trailing bytes",
                id
            );
        }

        Ok(Decoded::Packet { id, packet })
    }

    /// Decodes `payload` under the context's current state and passes the
    /// result to the handler.
    pub fn dispatch(&self, payload: Bytes, ctx: &mut HandlerContext<'_>) -> Result<DispatchOutcome> {
        let (id, packet) = match self.decode(ctx.state(), payload)? {
            Decoded::Packet { id, packet } => (id, packet),
            Decoded::Unknown { id } => return Ok(DispatchOutcome::Unknown { id }),
        };
        let name = packet.name();
        trace!(packet = name, "Dispatching packet 0x{:02x}", id);

        // The handler runs outside the lock so it may replace itself.
        let taken = self
            .handler
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_HANDLER_LOCK.to_string()))?
            .take();

        let Some(mut handler) = taken else {
            return Ok(DispatchOutcome::NoHandler { id, name });
        };

        let result = handler.handle(packet, ctx);

        if let Ok(mut slot) = self.handler.lock() {
            if slot.is_none() {
                *slot = Some(handler);
            }
        }

        result.map(|()| DispatchOutcome::Handled { id, name })
    }
}
