//! # Packet Handlers
//!
//! A handler receives every successfully decoded packet, in wire order, on
//! the connection's inbound context. Through [`HandlerContext`] it can reply,
//! move the connection to another state, and reconfigure the pipeline
//! (compression threshold, encryption) for the packets that follow.
//!
//! [`SessionHandler`] implements the reactions a client needs to get from
//! login into play and keep a [`World`] in sync, then forwards each packet
//! to an optional user callback.

use crate::connection::{OutboundCommand, Shared};
use crate::error::{ProtocolError, Result};
use crate::pipeline::InboundPipeline;
use crate::protocol::packets::{
    ClientboundPacket, ServerboundKeepAlive, ServerboundPacket, TeleportConfirm,
};
use crate::protocol::state::ConnectionState;
use crate::utils::blocking::run_blocking;
use crate::world::World;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Receives decoded packets.
pub trait PacketHandler: Send + 'static {
    fn handle(&mut self, packet: ClientboundPacket, ctx: &mut HandlerContext<'_>) -> Result<()>;
}

impl<F> PacketHandler for F
where
    F: FnMut(ClientboundPacket, &mut HandlerContext<'_>) -> Result<()> + Send + 'static,
{
    fn handle(&mut self, packet: ClientboundPacket, ctx: &mut HandlerContext<'_>) -> Result<()> {
        self(packet, ctx)
    }
}

/// Resolves once the outbound side has switched to encryption, which
/// happens after every send queued before the switch has been written.
pub struct EncryptionAck {
    receiver: oneshot::Receiver<Result<()>>,
}

impl Future for EncryptionAck {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ProtocolError::ConnectionClosed)))
    }
}

/// Access to the connection while handling one packet.
pub struct HandlerContext<'a> {
    shared: &'a Shared,
    inbound: &'a mut InboundPipeline,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(shared: &'a Shared, inbound: &'a mut InboundPipeline) -> Self {
        Self { shared, inbound }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Moves the connection to `next` if the transition is legal.
    pub fn set_state(&mut self, next: ConnectionState) -> Result<()> {
        self.shared.transition(next)
    }

    /// Queues a packet. Sends are written in the order they are made and are
    /// not awaited.
    pub fn send(&mut self, packet: impl Into<ServerboundPacket>) -> Result<()> {
        self.shared.send(packet.into())
    }

    /// Applies a new threshold to the rest of the inbound stream now, and to
    /// the outbound stream after already queued sends.
    pub fn set_compression_threshold(&mut self, threshold: i32) {
        debug!(threshold, "Setting compression threshold");
        self.inbound.set_compression_threshold(threshold);
        self.shared.queue(OutboundCommand::SetCompression(threshold));
    }

    pub fn compression_threshold(&self) -> i32 {
        self.inbound.compression_threshold()
    }

    /// Starts decrypting inbound bytes immediately and encrypting outbound
    /// bytes once everything queued before this call has been written.
    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<EncryptionAck> {
        self.inbound.enable_encryption(secret)?;
        let (ack, receiver) = oneshot::channel();
        self.shared.queue(OutboundCommand::EnableEncryption {
            secret: secret.to_vec(),
            ack,
        });
        Ok(EncryptionAck { receiver })
    }

    /// Closes the connection once the current packet has been handled.
    pub fn disconnect(&mut self, reason: impl Into<String>) {
        self.shared.close(reason.into());
    }
}

type UserCallback = Box<dyn PacketHandler>;

/// Built-in protocol reactions plus world bookkeeping.
pub struct SessionHandler {
    world: Arc<RwLock<World>>,
    callback: Option<UserCallback>,
}

impl SessionHandler {
    pub fn new(world: Arc<RwLock<World>>) -> Self {
        Self {
            world,
            callback: None,
        }
    }

    /// Forwards every packet to `callback` after the built-in handling.
    pub fn with_callback(mut self, callback: impl PacketHandler) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn world(&self) -> &Arc<RwLock<World>> {
        &self.world
    }

    fn with_world<T>(&self, f: impl FnOnce(&mut World) -> T) -> Result<T> {
        let mut world = self
            .world
            .write()
            .map_err(|_| ProtocolError::Custom("World lock poisoned".to_string()))?;
        Ok(f(&mut world))
    }

    /// Chunk decoding, and above all the bulk unpack, is CPU work.
    fn with_world_blocking<T>(&self, f: impl FnOnce(&mut World) -> T) -> Result<T> {
        run_blocking(|| self.with_world(f))
    }

    fn react(&mut self, packet: &ClientboundPacket, ctx: &mut HandlerContext<'_>) -> Result<()> {
        match packet {
            ClientboundPacket::SetCompression(p) => ctx.set_compression_threshold(p.threshold),
            ClientboundPacket::LoginSuccess(p) => {
                info!(username = %p.username, uuid = %p.uuid, "Login succeeded");
                ctx.set_state(ConnectionState::Play)?;
            }
            ClientboundPacket::LoginDisconnect(p) => {
                warn!(reason = %p.reason, "Disconnected during login");
                ctx.disconnect(p.reason.clone());
            }
            ClientboundPacket::PlayDisconnect(p) => {
                warn!(reason = %p.reason, "Disconnected by server");
                ctx.disconnect(p.reason.clone());
            }
            ClientboundPacket::KeepAlive(p) => {
                ctx.send(ServerboundKeepAlive { id: p.id })?;
            }
            ClientboundPacket::PlayerPositionAndLook(p) => {
                ctx.send(TeleportConfirm {
                    teleport_id: p.teleport_id,
                })?;
            }
            ClientboundPacket::JoinGame(p) => {
                let view_distance = p.view_distance;
                self.with_world(|world| world.set_view_distance(view_distance))?;
            }
            ClientboundPacket::UpdateViewDistance(p) => {
                let view_distance = p.view_distance;
                self.with_world(|world| world.set_view_distance(view_distance))?;
            }
            ClientboundPacket::ChunkData(p) => {
                let position = p.position;
                let data = p.data.clone();
                self.with_world_blocking(|world| {
                    let immediately = !world.is_downloading_terrain();
                    world.add_chunk_data(position, data, immediately)
                })?;
            }
            ClientboundPacket::UnloadChunk(p) => {
                let position = p.position;
                self.with_world(|world| world.remove_chunk(position))?;
            }
            ClientboundPacket::BlockChange(p) => {
                let (position, state) = (p.position, p.block_state);
                self.with_world(|world| world.set_block(position, state))?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl PacketHandler for SessionHandler {
    fn handle(&mut self, packet: ClientboundPacket, ctx: &mut HandlerContext<'_>) -> Result<()> {
        self.react(&packet, ctx)?;
        match self.callback.as_mut() {
            Some(callback) => callback.handle(packet, ctx),
            None => Ok(()),
        }
    }
}
