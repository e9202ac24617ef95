//! # World
//!
//! Chunk storage fed by chunk-data packets.
//!
//! ## Terrain download
//! A fresh world starts in *downloading terrain* mode. Incoming columns are
//! stored packed and left undecoded until the number of packed columns
//! reaches the quota, by default `(2 * view_distance + 3)^2`. At that point
//! every packed column is decoded in one batch (in parallel), neighbours are
//! linked, the mode is switched off for good and [`Event::TerrainReady`] is
//! published. After that, columns are decoded as they arrive.
//!
//! The batch runs under `&mut self`, so anyone sharing the world behind a
//! lock sees either the state before the batch or the state after it.
//!
//! A position is held either packed or unpacked, never both.

pub mod chunk;

pub use chunk::{ChunkPosition, ChunkSection, Direction, PackedChunk, UnpackedChunk, AIR};

use crate::codec::BlockPosition;
use crate::config::WorldConfig;
use crate::event::{Event, EventBus};
use crate::utils::metrics::Timer;
use bytes::Bytes;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
enum ChunkEntry {
    Packed(PackedChunk),
    Unpacked(UnpackedChunk),
}

/// Default unpack quota for a view distance.
pub fn default_chunk_quota(view_distance: i32) -> usize {
    let side = 2 * view_distance.max(0) as usize + 3;
    side * side
}

#[derive(Debug)]
pub struct World {
    chunks: HashMap<ChunkPosition, ChunkEntry>,
    packed_count: usize,
    downloading_terrain: bool,
    view_distance: i32,
    quota_override: Option<usize>,
    events: EventBus,
}

impl World {
    pub fn new(config: &WorldConfig, events: EventBus) -> Self {
        Self {
            chunks: HashMap::new(),
            packed_count: 0,
            downloading_terrain: true,
            view_distance: config.view_distance,
            quota_override: config.chunk_quota,
            events,
        }
    }

    pub fn is_downloading_terrain(&self) -> bool {
        self.downloading_terrain
    }

    pub fn view_distance(&self) -> i32 {
        self.view_distance
    }

    pub fn set_view_distance(&mut self, view_distance: i32) {
        debug!(view_distance, "View distance updated");
        self.view_distance = view_distance;
    }

    /// Number of packed columns needed to finish the terrain download.
    pub fn chunk_quota(&self) -> usize {
        self.quota_override
            .unwrap_or_else(|| default_chunk_quota(self.view_distance))
    }

    pub fn packed_count(&self) -> usize {
        self.packed_count
    }

    pub fn unpacked_count(&self) -> usize {
        self.chunks.len() - self.packed_count
    }

    pub fn is_packed(&self, position: ChunkPosition) -> bool {
        matches!(self.chunks.get(&position), Some(ChunkEntry::Packed(_)))
    }

    pub fn is_unpacked(&self, position: ChunkPosition) -> bool {
        matches!(self.chunks.get(&position), Some(ChunkEntry::Unpacked(_)))
    }

    pub fn packed_positions(&self) -> impl Iterator<Item = ChunkPosition> + '_ {
        self.chunks.iter().filter_map(|(position, entry)| match entry {
            ChunkEntry::Packed(_) => Some(*position),
            ChunkEntry::Unpacked(_) => None,
        })
    }

    pub fn unpacked_positions(&self) -> impl Iterator<Item = ChunkPosition> + '_ {
        self.chunks.iter().filter_map(|(position, entry)| match entry {
            ChunkEntry::Unpacked(_) => Some(*position),
            ChunkEntry::Packed(_) => None,
        })
    }

    pub fn chunk(&self, position: ChunkPosition) -> Option<&UnpackedChunk> {
        match self.chunks.get(&position) {
            Some(ChunkEntry::Unpacked(chunk)) => Some(chunk),
            _ => None,
        }
    }

    /// Stores a chunk-data payload.
    ///
    /// While downloading terrain and `unpack_immediately` is false, the
    /// payload is stored packed and may complete the quota. Otherwise it is
    /// decoded now. Payloads that fail to decode are logged and dropped.
    pub fn add_chunk_data(&mut self, position: ChunkPosition, data: Bytes, unpack_immediately: bool) {
        if unpack_immediately || !self.downloading_terrain {
            match UnpackedChunk::decode(position, data) {
                Ok(chunk) => {
                    self.insert_unpacked(chunk);
                    self.link_neighbours(position);
                }
                Err(e) => warn!(x = position.x, z = position.z, error = %e, "Dropping undecodable chunk"),
            }
            return;
        }

        self.insert(position, ChunkEntry::Packed(PackedChunk::new(position, data)));
        if self.packed_count >= self.chunk_quota() {
            self.finish_terrain_download();
        }
    }

    /// Unpacks every packed column, links neighbours and leaves terrain
    /// download mode.
    fn finish_terrain_download(&mut self) {
        let _timer = Timer::start("terrain_unpack");

        let positions: Vec<ChunkPosition> = self.packed_positions().collect();
        let packed: Vec<PackedChunk> = positions
            .iter()
            .filter_map(|position| match self.remove_entry(*position) {
                Some(ChunkEntry::Packed(chunk)) => Some(chunk),
                _ => None,
            })
            .collect();

        let decoded: Vec<_> = packed
            .into_par_iter()
            .map(|chunk| (chunk.position, chunk.unpack()))
            .collect();

        let mut unpacked = 0;
        for (position, result) in decoded {
            match result {
                Ok(chunk) => {
                    self.insert_unpacked(chunk);
                    unpacked += 1;
                }
                Err(e) => warn!(x = position.x, z = position.z, error = %e, "Dropping undecodable chunk"),
            }
        }
        for position in positions {
            self.link_neighbours(position);
        }

        self.downloading_terrain = false;
        info!(chunks = unpacked, "Terrain ready");
        self.events.dispatch(Event::TerrainReady { chunks: unpacked });
    }

    /// Removes a column, packed or unpacked. Returns whether one was present.
    pub fn remove_chunk(&mut self, position: ChunkPosition) -> bool {
        match self.remove_entry(position) {
            Some(ChunkEntry::Unpacked(_)) => {
                for direction in Direction::ALL {
                    let neighbour = position.neighbour(direction);
                    if let Some(ChunkEntry::Unpacked(chunk)) = self.chunks.get_mut(&neighbour) {
                        chunk.set_neighbour(direction.opposite(), None);
                    }
                }
                true
            }
            Some(ChunkEntry::Packed(_)) => true,
            None => false,
        }
    }

    /// Block state at `position`; air when the column is missing or packed.
    pub fn get_block(&self, position: BlockPosition) -> u16 {
        let (x, y, z) = position.in_chunk();
        self.chunk(position.chunk())
            .map_or(AIR, |chunk| chunk.get_block(x, y, z))
    }

    /// Sets a block in an unpacked column. Returns false if there is none.
    pub fn set_block(&mut self, position: BlockPosition, state: u16) -> bool {
        let (x, y, z) = position.in_chunk();
        match self.chunks.get_mut(&position.chunk()) {
            Some(ChunkEntry::Unpacked(chunk)) => chunk.set_block(x, y, z, state),
            _ => false,
        }
    }

    fn insert(&mut self, position: ChunkPosition, entry: ChunkEntry) {
        if matches!(entry, ChunkEntry::Packed(_)) {
            self.packed_count += 1;
        }
        if let Some(ChunkEntry::Packed(_)) = self.chunks.insert(position, entry) {
            self.packed_count -= 1;
        }
    }

    /// Inserts a decoded column, merging partial columns into an existing
    /// unpacked one.
    fn insert_unpacked(&mut self, chunk: UnpackedChunk) {
        let position = chunk.position();
        if !chunk.is_full_chunk() {
            if let Some(ChunkEntry::Unpacked(existing)) = self.chunks.get_mut(&position) {
                existing.merge(chunk);
                return;
            }
        }
        self.insert(position, ChunkEntry::Unpacked(chunk));
    }

    fn remove_entry(&mut self, position: ChunkPosition) -> Option<ChunkEntry> {
        let removed = self.chunks.remove(&position);
        if let Some(ChunkEntry::Packed(_)) = removed {
            self.packed_count -= 1;
        }
        removed
    }

    /// Links `position` with each unpacked horizontal neighbour, both ways.
    fn link_neighbours(&mut self, position: ChunkPosition) {
        if !self.is_unpacked(position) {
            return;
        }
        for direction in Direction::ALL {
            let neighbour = position.neighbour(direction);
            let present = match self.chunks.get_mut(&neighbour) {
                Some(ChunkEntry::Unpacked(other)) => {
                    other.set_neighbour(direction.opposite(), Some(position));
                    true
                }
                _ => false,
            };
            if let Some(ChunkEntry::Unpacked(chunk)) = self.chunks.get_mut(&position) {
                chunk.set_neighbour(direction, present.then_some(neighbour));
            }
        }
    }
}
