//! # Chunk Columns
//!
//! Packed and unpacked chunk column representations, and the decoder for
//! the 1.16.1 column format:
//!
//! ```text
//! full_chunk: bool, ignore_old_data: bool, primary_bit_mask: VarInt,
//! heightmaps: NBT, [biomes: i32 x 1024 if full_chunk],
//! data_size: VarInt, data[data_size], block_entities: VarInt + NBT...
//! ```
//!
//! `data` holds one section per set bit of the mask, bottom to top:
//!
//! ```text
//! block_count: i16, bits_per_block: u8,
//! [palette: VarInt count + VarInt entries if bits_per_block <= 8],
//! longs: VarInt count + i64...
//! ```
//!
//! Block indices are packed into longs without spanning long boundaries.

use crate::codec::nbt::skip_nbt;
use crate::codec::Buffer;
use crate::error::DecodeError;
use bytes::Bytes;

pub const SECTIONS_PER_CHUNK: usize = 16;
pub const BLOCKS_PER_SECTION: usize = 4096;
pub const BIOMES_PER_CHUNK: usize = 1024;
pub const CHUNK_HEIGHT: i32 = 256;

/// Block state id of air.
pub const AIR: u16 = 0;

/// Above this, sections index the global palette directly.
const MAX_INDIRECT_BITS: u8 = 8;
const MIN_INDIRECT_BITS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

impl ChunkPosition {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn neighbour(self, direction: Direction) -> Self {
        match direction {
            Direction::North => Self::new(self.x, self.z - 1),
            Direction::South => Self::new(self.x, self.z + 1),
            Direction::East => Self::new(self.x + 1, self.z),
            Direction::West => Self::new(self.x - 1, self.z),
        }
    }
}

/// Horizontal neighbour directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }
}

/// Chunk data as received, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedChunk {
    pub position: ChunkPosition,
    pub data: Bytes,
}

impl PackedChunk {
    pub fn new(position: ChunkPosition, data: Bytes) -> Self {
        Self { position, data }
    }

    pub fn unpack(&self) -> Result<UnpackedChunk, DecodeError> {
        UnpackedChunk::decode(self.position, self.data.clone())
    }
}

/// 16x16x16 blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    block_count: i16,
    blocks: Box<[u16; BLOCKS_PER_SECTION]>,
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self {
            block_count: 0,
            blocks: Box::new([AIR; BLOCKS_PER_SECTION]),
        }
    }
}

impl ChunkSection {
    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    pub fn block_count(&self) -> i16 {
        self.block_count
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> u16 {
        self.blocks[Self::index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, state: u16) {
        let slot = &mut self.blocks[Self::index(x, y, z)];
        match (*slot == AIR, state == AIR) {
            (true, false) => self.block_count += 1,
            (false, true) => self.block_count -= 1,
            _ => {}
        }
        *slot = state;
    }

    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        // Recounted from the blocks below; the declared value is not trusted.
        let _declared_count = buffer.read_i16()?;
        let mut bits = buffer.read_u8()?;
        if bits == 0 {
            return Err(DecodeError::InvalidValue {
                field: "bits per block",
                value: 0,
            });
        }

        let palette = if bits <= MAX_INDIRECT_BITS {
            bits = bits.max(MIN_INDIRECT_BITS);
            let length = buffer.read_length()?;
            let mut palette = Vec::with_capacity(length.min(BLOCKS_PER_SECTION));
            for _ in 0..length {
                palette.push(block_state(buffer.read_varint()?)?);
            }
            Some(palette)
        } else {
            None
        };

        if bits > 32 {
            return Err(DecodeError::InvalidValue {
                field: "bits per block",
                value: bits as i64,
            });
        }

        let values_per_long = 64 / bits as usize;
        let expected = BLOCKS_PER_SECTION.div_ceil(values_per_long);
        let long_count = buffer.read_length()?;
        if long_count < expected {
            return Err(DecodeError::InvalidChunkData(format!(
                "section has {long_count} longs, needs {expected} for {bits} bits per block"
            )));
        }
        let longs = buffer.read_u64_array(long_count)?;

        let mask = (1u64 << bits) - 1;
        let mut blocks = Box::new([AIR; BLOCKS_PER_SECTION]);
        for (index, block) in blocks.iter_mut().enumerate() {
            let long = longs[index / values_per_long];
            let offset = (index % values_per_long) * bits as usize;
            let value = (long >> offset) & mask;
            *block = match &palette {
                Some(palette) => *palette.get(value as usize).ok_or_else(|| {
                    DecodeError::InvalidChunkData(format!(
                        "palette index {value} out of range ({} entries)",
                        palette.len()
                    ))
                })?,
                None => block_state(value as i32)?,
            };
        }

        let block_count = blocks.iter().filter(|&&block| block != AIR).count() as i16;
        Ok(Self {
            block_count,
            blocks,
        })
    }
}

/// Checks that a wire block state id fits the global palette type.
pub(crate) fn block_state(raw: i32) -> Result<u16, DecodeError> {
    u16::try_from(raw).map_err(|_| DecodeError::InvalidValue {
        field: "block state",
        value: raw as i64,
    })
}

/// A decoded chunk column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedChunk {
    position: ChunkPosition,
    full_chunk: bool,
    primary_bit_mask: u16,
    sections: [Option<ChunkSection>; SECTIONS_PER_CHUNK],
    biomes: Option<Box<[i32; BIOMES_PER_CHUNK]>>,
    block_entity_count: usize,
    neighbours: [Option<ChunkPosition>; 4],
}

impl UnpackedChunk {
    /// Decodes a column body (everything after the chunk coordinates).
    pub fn decode(position: ChunkPosition, data: Bytes) -> Result<Self, DecodeError> {
        let mut buffer = Buffer::new(data);

        let full_chunk = buffer.read_bool()?;
        let _ignore_old_data = buffer.read_bool()?;
        let mask = buffer.read_varint()?;
        if !(0..=0xFFFF).contains(&mask) {
            return Err(DecodeError::InvalidValue {
                field: "primary bit mask",
                value: mask as i64,
            });
        }
        let primary_bit_mask = mask as u16;

        // Heightmaps
        skip_nbt(&mut buffer)?;

        let biomes = if full_chunk {
            let mut biomes = Box::new([0i32; BIOMES_PER_CHUNK]);
            for biome in biomes.iter_mut() {
                *biome = buffer.read_i32()?;
            }
            Some(biomes)
        } else {
            None
        };

        let data = buffer.read_byte_array()?;
        let mut sections_buffer = Buffer::new(data);
        let mut sections: [Option<ChunkSection>; SECTIONS_PER_CHUNK] = Default::default();
        for (y, section) in sections.iter_mut().enumerate() {
            if primary_bit_mask & (1 << y) != 0 {
                *section = Some(ChunkSection::decode(&mut sections_buffer)?);
            }
        }

        let block_entity_count = buffer.read_length()?;
        for _ in 0..block_entity_count {
            skip_nbt(&mut buffer)?;
        }

        Ok(Self {
            position,
            full_chunk,
            primary_bit_mask,
            sections,
            biomes,
            block_entity_count,
            neighbours: [None; 4],
        })
    }

    pub fn position(&self) -> ChunkPosition {
        self.position
    }

    pub fn is_full_chunk(&self) -> bool {
        self.full_chunk
    }

    pub fn primary_bit_mask(&self) -> u16 {
        self.primary_bit_mask
    }

    pub fn section(&self, index: usize) -> Option<&ChunkSection> {
        self.sections.get(index).and_then(Option::as_ref)
    }

    pub fn biomes(&self) -> Option<&[i32; BIOMES_PER_CHUNK]> {
        self.biomes.as_deref()
    }

    pub fn block_entity_count(&self) -> usize {
        self.block_entity_count
    }

    pub fn neighbour(&self, direction: Direction) -> Option<ChunkPosition> {
        self.neighbours[direction.index()]
    }

    pub fn neighbours(&self) -> [Option<ChunkPosition>; 4] {
        self.neighbours
    }

    pub(crate) fn set_neighbour(&mut self, direction: Direction, neighbour: Option<ChunkPosition>) {
        self.neighbours[direction.index()] = neighbour;
    }

    /// Block at chunk-relative `x`/`z` (0..16) and absolute `y`.
    pub fn get_block(&self, x: usize, y: i32, z: usize) -> u16 {
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return AIR;
        }
        match &self.sections[(y >> 4) as usize] {
            Some(section) => section.get(x & 15, (y & 15) as usize, z & 15),
            None => AIR,
        }
    }

    /// Sets a block, creating the section if needed. Returns false when `y`
    /// is outside the column.
    pub fn set_block(&mut self, x: usize, y: i32, z: usize, state: u16) -> bool {
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return false;
        }
        let index = (y >> 4) as usize;
        let section = self.sections[index].get_or_insert_with(ChunkSection::default);
        section.set(x & 15, (y & 15) as usize, z & 15, state);
        self.primary_bit_mask |= 1 << index;
        true
    }

    /// Applies a partial column on top of this one: sections present in
    /// `update` replace ours, everything else is kept.
    pub fn merge(&mut self, update: UnpackedChunk) {
        let UnpackedChunk {
            primary_bit_mask,
            sections,
            biomes,
            block_entity_count,
            ..
        } = update;

        for (y, section) in sections.into_iter().enumerate() {
            if primary_bit_mask & (1 << y) != 0 {
                self.sections[y] = section;
            }
        }
        self.primary_bit_mask |= primary_bit_mask;
        if biomes.is_some() {
            self.biomes = biomes;
        }
        self.block_entity_count = block_entity_count;
    }
}
