use super::{Decode, Encode};
use crate::codec::nbt::skip_nbt;
use crate::codec::{BlockPosition, Buffer, BufferWriter};
use crate::error::DecodeError;
use crate::world::chunk::{block_state, ChunkPosition};
use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChange {
    pub position: BlockPosition,
    pub block_state: u16,
}

impl Decode for BlockChange {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            position: buffer.read_position()?,
            block_state: block_state(buffer.read_varint()?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Bytes,
}

impl Decode for PluginMessage {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            channel: buffer.read_string()?,
            data: buffer.read_remaining(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayDisconnect {
    pub reason: String,
}

impl Decode for PlayDisconnect {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: buffer.read_string()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnloadChunk {
    pub position: ChunkPosition,
}

impl Decode for UnloadChunk {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        let x = buffer.read_i32()?;
        let z = buffer.read_i32()?;
        Ok(Self {
            position: ChunkPosition::new(x, z),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientboundKeepAlive {
    pub id: i64,
}

impl Decode for ClientboundKeepAlive {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            id: buffer.read_i64()?,
        })
    }
}

/// A chunk column. Only the position is read here; the column body stays
/// packed until the world decides to unpack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkData {
    pub position: ChunkPosition,
    pub data: Bytes,
}

impl Decode for ChunkData {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        let x = buffer.read_i32()?;
        let z = buffer.read_i32()?;
        Ok(Self {
            position: ChunkPosition::new(x, z),
            data: buffer.read_remaining(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGame {
    pub entity_id: i32,
    pub gamemode: u8,
    pub previous_gamemode: i8,
    pub world_names: Vec<String>,
    pub dimension: String,
    pub world_name: String,
    pub hashed_seed: i64,
    pub max_players: u8,
    pub view_distance: i32,
    pub reduced_debug_info: bool,
    pub enable_respawn_screen: bool,
    pub is_debug: bool,
    pub is_flat: bool,
}

impl Decode for JoinGame {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        let entity_id = buffer.read_i32()?;
        let gamemode = buffer.read_u8()?;
        let previous_gamemode = buffer.read_i8()?;

        let world_count = buffer.read_length()?;
        // Each name costs at least one byte, which bounds the allocation.
        let mut world_names = Vec::with_capacity(world_count.min(buffer.remaining()));
        for _ in 0..world_count {
            world_names.push(buffer.read_string()?);
        }

        // Dimension codec
        skip_nbt(buffer)?;

        Ok(Self {
            entity_id,
            gamemode,
            previous_gamemode,
            world_names,
            dimension: buffer.read_string()?,
            world_name: buffer.read_string()?,
            hashed_seed: buffer.read_i64()?,
            max_players: buffer.read_u8()?,
            view_distance: buffer.read_varint()?,
            reduced_debug_info: buffer.read_bool()?,
            enable_respawn_screen: buffer.read_bool()?,
            is_debug: buffer.read_bool()?,
            is_flat: buffer.read_bool()?,
        })
    }
}

/// Bits of [`PlayerPositionAndLook::flags`] marking a field as relative.
pub mod relative {
    pub const X: u8 = 0x01;
    pub const Y: u8 = 0x02;
    pub const Z: u8 = 0x04;
    pub const YAW: u8 = 0x08;
    pub const PITCH: u8 = 0x10;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPositionAndLook {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: u8,
    pub teleport_id: i32,
}

impl Decode for PlayerPositionAndLook {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            x: buffer.read_f64()?,
            y: buffer.read_f64()?,
            z: buffer.read_f64()?,
            yaw: buffer.read_f32()?,
            pitch: buffer.read_f32()?,
            flags: buffer.read_u8()?,
            teleport_id: buffer.read_varint()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateViewPosition {
    pub position: ChunkPosition,
}

impl Decode for UpdateViewPosition {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        let x = buffer.read_varint()?;
        let z = buffer.read_varint()?;
        Ok(Self {
            position: ChunkPosition::new(x, z),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateViewDistance {
    pub view_distance: i32,
}

impl Decode for UpdateViewDistance {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            view_distance: buffer.read_varint()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnPosition {
    pub position: BlockPosition,
}

impl Decode for SpawnPosition {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            position: buffer.read_position()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeleportConfirm {
    pub teleport_id: i32,
}

impl Encode for TeleportConfirm {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.teleport_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub locale: String,
    pub view_distance: i8,
    /// 0 = full, 1 = commands only, 2 = hidden.
    pub chat_mode: i32,
    pub chat_colors: bool,
    pub displayed_skin_parts: u8,
    /// 0 = left, 1 = right.
    pub main_hand: i32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            locale: "en_us".to_string(),
            view_distance: 10,
            chat_mode: 0,
            chat_colors: true,
            displayed_skin_parts: 0x7F,
            main_hand: 1,
        }
    }
}

impl Encode for ClientSettings {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_string(&self.locale);
        writer.write_i8(self.view_distance);
        writer.write_varint(self.chat_mode);
        writer.write_bool(self.chat_colors);
        writer.write_u8(self.displayed_skin_parts);
        writer.write_varint(self.main_hand);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerboundKeepAlive {
    pub id: i64,
}

impl Encode for ServerboundKeepAlive {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_i64(self.id);
    }
}
