//! # Packet Registry
//!
//! Maps `(ConnectionState, packet id)` to a decoder for inbound packets and
//! `ServerboundKind` to an id for outbound ones. A registry describes one
//! protocol version, is immutable once built, and is shared read-only by
//! every connection using that version.

use crate::codec::{Buffer, BufferWriter};
use crate::error::DecodeError;
use crate::protocol::packets::{
    BlockChange, ChunkData, ClientboundKeepAlive, ClientboundPacket, Decode, EncryptionRequest,
    JoinGame, LoginDisconnect, LoginPluginRequest, LoginSuccess, PlayDisconnect,
    PlayerPositionAndLook, PluginMessage, Pong, ServerboundKind, ServerboundPacket,
    SetCompression, SpawnPosition, StatusResponse, UnloadChunk, UpdateViewDistance,
    UpdateViewPosition,
};
use crate::protocol::state::ConnectionState;
use bytes::Bytes;
use std::collections::HashMap;

/// Protocol version number of the 1.16.1 table.
pub const PROTOCOL_VERSION_1_16_1: i32 = 736;

/// Decodes a packet body into its typed form.
pub type DecodeFn = fn(&mut Buffer) -> Result<ClientboundPacket, DecodeError>;

fn decode_as<P>(buffer: &mut Buffer) -> Result<ClientboundPacket, DecodeError>
where
    P: Decode + Into<ClientboundPacket>,
{
    P::decode(buffer).map(Into::into)
}

#[derive(Clone, Default)]
pub struct PacketRegistry {
    protocol_version: i32,
    clientbound: HashMap<(ConnectionState, i32), DecodeFn>,
    serverbound: HashMap<ServerboundKind, i32>,
}

impl std::fmt::Debug for PacketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketRegistry")
            .field("protocol_version", &self.protocol_version)
            .field("clientbound", &self.clientbound.len())
            .field("serverbound", &self.serverbound.len())
            .finish()
    }
}

impl PacketRegistry {
    /// Creates an empty registry for `protocol_version`.
    pub fn new(protocol_version: i32) -> Self {
        Self {
            protocol_version,
            clientbound: HashMap::new(),
            serverbound: HashMap::new(),
        }
    }

    pub fn protocol_version(&self) -> i32 {
        self.protocol_version
    }

    /// Registers a clientbound packet type. A later registration for the
    /// same key replaces the earlier one.
    pub fn register<P>(&mut self, state: ConnectionState, id: i32) -> &mut Self
    where
        P: Decode + Into<ClientboundPacket>,
    {
        self.clientbound.insert((state, id), decode_as::<P>);
        self
    }

    /// Registers a raw decode function.
    pub fn register_fn(&mut self, state: ConnectionState, id: i32, decoder: DecodeFn) -> &mut Self {
        self.clientbound.insert((state, id), decoder);
        self
    }

    pub fn register_serverbound(&mut self, kind: ServerboundKind, id: i32) -> &mut Self {
        self.serverbound.insert(kind, id);
        self
    }

    pub fn decoder(&self, state: ConnectionState, id: i32) -> Option<DecodeFn> {
        self.clientbound.get(&(state, id)).copied()
    }

    pub fn contains(&self, state: ConnectionState, id: i32) -> bool {
        self.clientbound.contains_key(&(state, id))
    }

    pub fn serverbound_id(&self, kind: ServerboundKind) -> Option<i32> {
        self.serverbound.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.clientbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clientbound.is_empty()
    }

    /// Serialises `packet` as `VarInt(id) ++ body`. Returns `None` if the
    /// packet kind has no id in this registry.
    pub fn encode(&self, packet: &ServerboundPacket) -> Option<Bytes> {
        let id = self.serverbound_id(packet.kind())?;
        let mut writer = BufferWriter::with_capacity(32);
        writer.write_varint(id);
        packet.encode_body(&mut writer);
        Some(writer.freeze())
    }

    /// The 1.16.1 table (protocol 736).
    pub fn v1_16_1() -> Self {
        use ConnectionState::{Login, Play, Status};

        let mut registry = Self::new(PROTOCOL_VERSION_1_16_1);
        registry
            .register::<StatusResponse>(Status, 0x00)
            .register::<Pong>(Status, 0x01)
            .register::<LoginDisconnect>(Login, 0x00)
            .register::<EncryptionRequest>(Login, 0x01)
            .register::<LoginSuccess>(Login, 0x02)
            .register::<SetCompression>(Login, 0x03)
            .register::<LoginPluginRequest>(Login, 0x04)
            .register::<BlockChange>(Play, 0x0B)
            .register::<PluginMessage>(Play, 0x18)
            .register::<PlayDisconnect>(Play, 0x1A)
            .register::<UnloadChunk>(Play, 0x1D)
            .register::<ClientboundKeepAlive>(Play, 0x20)
            .register::<ChunkData>(Play, 0x21)
            .register::<JoinGame>(Play, 0x25)
            .register::<PlayerPositionAndLook>(Play, 0x35)
            .register::<UpdateViewPosition>(Play, 0x40)
            .register::<UpdateViewDistance>(Play, 0x41)
            .register::<SpawnPosition>(Play, 0x42);

        registry
            .register_serverbound(ServerboundKind::Handshake, 0x00)
            .register_serverbound(ServerboundKind::StatusRequest, 0x00)
            .register_serverbound(ServerboundKind::Ping, 0x01)
            .register_serverbound(ServerboundKind::LoginStart, 0x00)
            .register_serverbound(ServerboundKind::EncryptionResponse, 0x01)
            .register_serverbound(ServerboundKind::LoginPluginResponse, 0x02)
            .register_serverbound(ServerboundKind::TeleportConfirm, 0x00)
            .register_serverbound(ServerboundKind::ClientSettings, 0x05)
            .register_serverbound(ServerboundKind::KeepAlive, 0x10);

        registry
    }
}
