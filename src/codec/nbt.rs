//! Skipping over NBT payloads.
//!
//! The engine never interprets NBT (heightmaps, dimension codecs, block
//! entities); it only needs to step past a value to reach the fields that
//! follow it. Only the network form (named root compound) is handled.

use crate::codec::buffer::Buffer;
use crate::error::DecodeError;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Nesting deeper than this is rejected.
pub const MAX_DEPTH: usize = 512;

/// Skips one complete root tag (type byte, name, payload).
///
/// A lone `TAG_End` is accepted as an empty value.
pub fn skip_nbt(buffer: &mut Buffer) -> Result<(), DecodeError> {
    let tag = buffer.read_u8()?;
    if tag == TAG_END {
        return Ok(());
    }
    skip_name(buffer)?;
    skip_payload(buffer, tag, 0)
}

fn skip_name(buffer: &mut Buffer) -> Result<(), DecodeError> {
    let length = buffer.read_u16()? as usize;
    buffer.skip(length)
}

fn skip_array(buffer: &mut Buffer, element_size: usize) -> Result<(), DecodeError> {
    let count = buffer.read_i32()?;
    let count = usize::try_from(count).map_err(|_| DecodeError::NegativeLength(count))?;
    buffer.skip(count.saturating_mul(element_size))
}

fn skip_payload(buffer: &mut Buffer, tag: u8, depth: usize) -> Result<(), DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::InvalidValue {
            field: "nbt depth",
            value: depth as i64,
        });
    }

    match tag {
        TAG_END => Ok(()),
        TAG_BYTE => buffer.skip(1),
        TAG_SHORT => buffer.skip(2),
        TAG_INT | TAG_FLOAT => buffer.skip(4),
        TAG_LONG | TAG_DOUBLE => buffer.skip(8),
        TAG_BYTE_ARRAY => skip_array(buffer, 1),
        TAG_INT_ARRAY => skip_array(buffer, 4),
        TAG_LONG_ARRAY => skip_array(buffer, 8),
        TAG_STRING => skip_name(buffer),
        TAG_LIST => {
            let element = buffer.read_u8()?;
            let count = buffer.read_i32()?;
            if count <= 0 {
                return Ok(());
            }
            // Only an empty list may have element type End.
            if element == TAG_END {
                return Err(DecodeError::InvalidValue {
                    field: "nbt list",
                    value: count as i64,
                });
            }
            // Every element occupies at least one byte.
            let needed = count as usize;
            let remaining = buffer.remaining();
            if needed > remaining {
                return Err(DecodeError::UnexpectedEof { needed, remaining });
            }
            for _ in 0..count {
                skip_payload(buffer, element, depth + 1)?;
            }
            Ok(())
        }
        TAG_COMPOUND => loop {
            let child = buffer.read_u8()?;
            if child == TAG_END {
                return Ok(());
            }
            skip_name(buffer)?;
            skip_payload(buffer, child, depth + 1)?;
        },
        other => Err(DecodeError::UnsupportedNbtTag(other)),
    }
}
