//! Block positions packed into a single 64-bit value.
//!
//! Layout, most significant bit first: x (26 bits), z (26 bits), y (12 bits).
//! All three fields are two's complement and sign-extended on unpack.

use crate::world::chunk::ChunkPosition;

const XZ_MASK: u64 = 0x3FF_FFFF;
const Y_MASK: u64 = 0xFFF;

/// Absolute block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Packs into the wire representation. Coordinates outside the 26/12 bit
    /// ranges are truncated.
    pub fn pack(&self) -> u64 {
        ((self.x as u64 & XZ_MASK) << 38)
            | ((self.z as u64 & XZ_MASK) << 12)
            | (self.y as u64 & Y_MASK)
    }

    pub fn unpack(value: u64) -> Self {
        let x = (value as i64) >> 38;
        let z = ((value << 26) as i64) >> 38;
        let y = ((value << 52) as i64) >> 52;
        Self {
            x: x as i32,
            y: y as i32,
            z: z as i32,
        }
    }

    /// Chunk column containing this block.
    pub fn chunk(&self) -> ChunkPosition {
        ChunkPosition::new(self.x >> 4, self.z >> 4)
    }

    /// Coordinates relative to the owning chunk column; y stays absolute.
    pub fn in_chunk(&self) -> (usize, i32, usize) {
        ((self.x & 15) as usize, self.y, (self.z & 15) as usize)
    }
}
