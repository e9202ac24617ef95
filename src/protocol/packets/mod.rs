//! # Packet Types
//!
//! Typed packets for the 1.16.1 protocol (version 736), grouped by phase.
//!
//! Clientbound packets implement [`Decode`] and are collected in the
//! [`ClientboundPacket`] enum the registry produces. Serverbound packets
//! implement [`Encode`] and are collected in [`ServerboundPacket`]; their ids
//! come from the registry rather than the type, so one set of structs can
//! serve several protocol tables.

pub mod handshake;
pub mod login;
pub mod play;
pub mod status;

use crate::codec::{Buffer, BufferWriter};
use crate::error::DecodeError;
use crate::protocol::state::ConnectionState;

pub use handshake::Handshake;
pub use login::{
    EncryptionRequest, EncryptionResponse, LoginDisconnect, LoginPluginRequest,
    LoginPluginResponse, LoginStart, LoginSuccess, SetCompression,
};
pub use play::{
    BlockChange, ChunkData, ClientSettings, ClientboundKeepAlive, JoinGame, PlayDisconnect,
    PlayerPositionAndLook, PluginMessage, ServerboundKeepAlive, SpawnPosition, TeleportConfirm,
    UnloadChunk, UpdateViewDistance, UpdateViewPosition,
};
pub use status::{Ping, Pong, StatusRequest, StatusResponse};

/// Reads a packet body (everything after the id).
pub trait Decode: Sized {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError>;
}

/// Writes a packet body (everything after the id).
pub trait Encode {
    fn encode(&self, writer: &mut BufferWriter);
}

/// Every packet the client knows how to decode.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientboundPacket {
    StatusResponse(StatusResponse),
    Pong(Pong),

    LoginDisconnect(LoginDisconnect),
    EncryptionRequest(EncryptionRequest),
    LoginSuccess(LoginSuccess),
    SetCompression(SetCompression),
    LoginPluginRequest(LoginPluginRequest),

    BlockChange(BlockChange),
    PluginMessage(PluginMessage),
    PlayDisconnect(PlayDisconnect),
    UnloadChunk(UnloadChunk),
    KeepAlive(ClientboundKeepAlive),
    ChunkData(ChunkData),
    JoinGame(JoinGame),
    PlayerPositionAndLook(PlayerPositionAndLook),
    UpdateViewPosition(UpdateViewPosition),
    UpdateViewDistance(UpdateViewDistance),
    SpawnPosition(SpawnPosition),
}

impl ClientboundPacket {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientboundPacket::StatusResponse(_) => "StatusResponse",
            ClientboundPacket::Pong(_) => "Pong",
            ClientboundPacket::LoginDisconnect(_) => "LoginDisconnect",
            ClientboundPacket::EncryptionRequest(_) => "EncryptionRequest",
            ClientboundPacket::LoginSuccess(_) => "LoginSuccess",
            ClientboundPacket::SetCompression(_) => "SetCompression",
            ClientboundPacket::LoginPluginRequest(_) => "LoginPluginRequest",
            ClientboundPacket::BlockChange(_) => "BlockChange",
            ClientboundPacket::PluginMessage(_) => "PluginMessage",
            ClientboundPacket::PlayDisconnect(_) => "PlayDisconnect",
            ClientboundPacket::UnloadChunk(_) => "UnloadChunk",
            ClientboundPacket::KeepAlive(_) => "KeepAlive",
            ClientboundPacket::ChunkData(_) => "ChunkData",
            ClientboundPacket::JoinGame(_) => "JoinGame",
            ClientboundPacket::PlayerPositionAndLook(_) => "PlayerPositionAndLook",
            ClientboundPacket::UpdateViewPosition(_) => "UpdateViewPosition",
            ClientboundPacket::UpdateViewDistance(_) => "UpdateViewDistance",
            ClientboundPacket::SpawnPosition(_) => "SpawnPosition",
        }
    }
}

macro_rules! clientbound_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ClientboundPacket {
                fn from(packet: $ty) -> Self {
                    ClientboundPacket::$variant(packet)
                }
            }
        )*
    };
}

clientbound_from! {
    StatusResponse => StatusResponse,
    Pong => Pong,
    LoginDisconnect => LoginDisconnect,
    EncryptionRequest => EncryptionRequest,
    LoginSuccess => LoginSuccess,
    SetCompression => SetCompression,
    LoginPluginRequest => LoginPluginRequest,
    BlockChange => BlockChange,
    PluginMessage => PluginMessage,
    PlayDisconnect => PlayDisconnect,
    UnloadChunk => UnloadChunk,
    KeepAlive => ClientboundKeepAlive,
    ChunkData => ChunkData,
    JoinGame => JoinGame,
    PlayerPositionAndLook => PlayerPositionAndLook,
    UpdateViewPosition => UpdateViewPosition,
    UpdateViewDistance => UpdateViewDistance,
    SpawnPosition => SpawnPosition,
}

/// Identifies a serverbound packet type independently of its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerboundKind {
    Handshake,
    StatusRequest,
    Ping,
    LoginStart,
    EncryptionResponse,
    LoginPluginResponse,
    TeleportConfirm,
    ClientSettings,
    KeepAlive,
}

impl ServerboundKind {
    /// Phase in which this packet is sent.
    pub fn state(self) -> ConnectionState {
        match self {
            ServerboundKind::Handshake => ConnectionState::Handshaking,
            ServerboundKind::StatusRequest | ServerboundKind::Ping => ConnectionState::Status,
            ServerboundKind::LoginStart
            | ServerboundKind::EncryptionResponse
            | ServerboundKind::LoginPluginResponse => ConnectionState::Login,
            ServerboundKind::TeleportConfirm
            | ServerboundKind::ClientSettings
            | ServerboundKind::KeepAlive => ConnectionState::Play,
        }
    }
}

/// Every packet the client knows how to send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerboundPacket {
    Handshake(Handshake),
    StatusRequest(StatusRequest),
    Ping(Ping),
    LoginStart(LoginStart),
    EncryptionResponse(EncryptionResponse),
    LoginPluginResponse(LoginPluginResponse),
    TeleportConfirm(TeleportConfirm),
    ClientSettings(ClientSettings),
    KeepAlive(ServerboundKeepAlive),
}

impl ServerboundPacket {
    pub fn kind(&self) -> ServerboundKind {
        match self {
            ServerboundPacket::Handshake(_) => ServerboundKind::Handshake,
            ServerboundPacket::StatusRequest(_) => ServerboundKind::StatusRequest,
            ServerboundPacket::Ping(_) => ServerboundKind::Ping,
            ServerboundPacket::LoginStart(_) => ServerboundKind::LoginStart,
            ServerboundPacket::EncryptionResponse(_) => ServerboundKind::EncryptionResponse,
            ServerboundPacket::LoginPluginResponse(_) => ServerboundKind::LoginPluginResponse,
            ServerboundPacket::TeleportConfirm(_) => ServerboundKind::TeleportConfirm,
            ServerboundPacket::ClientSettings(_) => ServerboundKind::ClientSettings,
            ServerboundPacket::KeepAlive(_) => ServerboundKind::KeepAlive,
        }
    }

    /// Writes the packet body (without id).
    pub fn encode_body(&self, writer: &mut BufferWriter) {
        match self {
            ServerboundPacket::Handshake(p) => p.encode(writer),
            ServerboundPacket::StatusRequest(p) => p.encode(writer),
            ServerboundPacket::Ping(p) => p.encode(writer),
            ServerboundPacket::LoginStart(p) => p.encode(writer),
            ServerboundPacket::EncryptionResponse(p) => p.encode(writer),
            ServerboundPacket::LoginPluginResponse(p) => p.encode(writer),
            ServerboundPacket::TeleportConfirm(p) => p.encode(writer),
            ServerboundPacket::ClientSettings(p) => p.encode(writer),
            ServerboundPacket::KeepAlive(p) => p.encode(writer),
        }
    }
}

macro_rules! serverbound_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ServerboundPacket {
                fn from(packet: $ty) -> Self {
                    ServerboundPacket::$variant(packet)
                }
            }
        )*
    };
}

serverbound_from! {
    Handshake => Handshake,
    StatusRequest => StatusRequest,
    Ping => Ping,
    LoginStart => LoginStart,
    EncryptionResponse => EncryptionResponse,
    LoginPluginResponse => LoginPluginResponse,
    TeleportConfirm => TeleportConfirm,
    ClientSettings => ClientSettings,
    KeepAlive => ServerboundKeepAlive,
}
