//! Minecraft-style variable-length integers.
//!
//! Seven payload bits per byte, least significant group first, with `0x80`
//! marking that another byte follows. A VarInt never exceeds 5 bytes and a
//! VarLong never exceeds 10; longer encodings are rejected as malformed.

use crate::error::DecodeError;
use bytes::{Buf, BufMut};

/// Maximum encoded size of a 32-bit VarInt
pub const MAX_VARINT_LEN: usize = 5;

/// Maximum encoded size of a 64-bit VarLong
pub const MAX_VARLONG_LEN: usize = 10;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Number of bytes `value` occupies once encoded.
#[inline]
pub fn varint_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Number of bytes `value` occupies once encoded as a VarLong.
#[inline]
pub fn varlong_len(value: i64) -> usize {
    let bits = 64 - (value as u64).leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

pub fn write_varint<B: BufMut>(buf: &mut B, value: i32) {
    let mut remaining = value as u32;
    loop {
        let byte = (remaining as u8) & SEGMENT_BITS;
        remaining >>= 7;
        if remaining == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | CONTINUE_BIT);
    }
}

pub fn write_varlong<B: BufMut>(buf: &mut B, value: i64) {
    let mut remaining = value as u64;
    loop {
        let byte = (remaining as u8) & SEGMENT_BITS;
        remaining >>= 7;
        if remaining == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | CONTINUE_BIT);
    }
}

/// Reads a VarInt from the front of `buf`, advancing it past the encoding.
///
/// # Errors
/// - [`DecodeError::UnexpectedEof`] if `buf` ends before the final byte
/// - [`DecodeError::VarIntTooLong`] if the encoding needs more than 5 bytes
///   or its fifth byte carries bits beyond the 32nd
pub fn read_varint<B: Buf>(buf: &mut B) -> Result<i32, DecodeError> {
    let mut value: u32 = 0;
    for index in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            });
        }
        let byte = buf.get_u8();
        // fifth byte may only hold the top 4 bits and no continuation
        if index == MAX_VARINT_LEN - 1 && byte & 0xF0 != 0 {
            return Err(DecodeError::VarIntTooLong);
        }
        value |= u32::from(byte & SEGMENT_BITS) << (7 * index);
        if byte & CONTINUE_BIT == 0 {
            return Ok(value as i32);
        }
    }
    Err(DecodeError::VarIntTooLong)
}

/// Reads a VarLong from the front of `buf`, advancing it past the encoding.
///
/// # Errors
/// - [`DecodeError::UnexpectedEof`] if `buf` ends before the final byte
/// - [`DecodeError::VarLongTooLong`] if the encoding needs more than 10 bytes
pub fn read_varlong<B: Buf>(buf: &mut B) -> Result<i64, DecodeError> {
    let mut value: u64 = 0;
    for index in 0..MAX_VARLONG_LEN {
        if !buf.has_remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            });
        }
        let byte = buf.get_u8();
        // tenth byte may only hold bit 63
        if index == MAX_VARLONG_LEN - 1 && byte & 0xFE != 0 {
            return Err(DecodeError::VarLongTooLong);
        }
        value |= u64::from(byte & SEGMENT_BITS) << (7 * index);
        if byte & CONTINUE_BIT == 0 {
            return Ok(value as i64);
        }
    }
    Err(DecodeError::VarLongTooLong)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value);
        out
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(255), vec![0xFF, 0x01]);
        assert_eq!(encode(25565), vec![0xDD, 0xC7, 0x01]);
        assert_eq!(encode(2_097_151), vec![0xFF, 0xFF, 0x7F]);
        assert_eq!(encode(i32::MAX), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(encode(-1), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(encode(i32::MIN), vec![0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn test_boundary_roundtrip() {
        for value in [0, 1, -1, 127, 128, i32::MIN, i32::MAX] {
            let bytes = encode(value);
            assert_eq!(bytes.len(), varint_len(value));
            let mut slice = bytes.as_slice();
            assert_eq!(read_varint(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
    }

    #[test]
    fn test_varlong_boundaries() {
        for value in [0i64, -1, i64::MIN, i64::MAX, i32::MAX as i64 + 1] {
            let mut out = Vec::new();
            write_varlong(&mut out, value);
            assert_eq!(out.len(), varlong_len(value));
            let mut slice = out.as_slice();
            assert_eq!(read_varlong(&mut slice).unwrap(), value);
        }
        let mut out = Vec::new();
        write_varlong(&mut out, -1);
        assert_eq!(out.len(), MAX_VARLONG_LEN);
    }

    #[test]
    fn test_rejects_six_byte_varint() {
        let mut slice: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(read_varint(&mut slice), Err(DecodeError::VarIntTooLong));
    }

    #[test]
    fn test_rejects_overflowing_fifth_byte() {
        let mut slice: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        assert_eq!(read_varint(&mut slice), Err(DecodeError::VarIntTooLong));
    }

    #[test]
    fn test_rejects_eleven_byte_varlong() {
        let bytes = [0x80u8; 10];
        let mut slice: &[u8] = &bytes;
        assert_eq!(read_varlong(&mut slice), Err(DecodeError::VarLongTooLong));
    }

    #[test]
    fn test_truncated_is_eof() {
        let mut slice: &[u8] = &[0x80, 0x80];
        assert!(matches!(
            read_varint(&mut slice),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}
