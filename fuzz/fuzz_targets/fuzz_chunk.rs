#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mc_protocol::world::{ChunkPosition, PackedChunk};

fuzz_target!(|data: &[u8]| {
    let packed = PackedChunk::new(ChunkPosition::new(0, 0), Bytes::copy_from_slice(data));
    let _ = packed.unpack();
});
