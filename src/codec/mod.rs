//! # Wire Codec
//!
//! Primitive encoding shared by every packet: VarInt/VarLong, big-endian
//! scalars, length-prefixed strings and arrays, packed block positions and
//! an NBT skipper.

pub mod buffer;
pub mod nbt;
pub mod position;
pub mod varint;

pub use buffer::{Buffer, BufferWriter, MAX_STRING_LEN};
pub use position::BlockPosition;
