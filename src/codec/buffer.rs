//! Cursor-based reader and append-only writer for wire data.
//!
//! [`Buffer`] owns its bytes and a read cursor. Every read checks the
//! remaining length first, so running off the end is a
//! [`DecodeError::UnexpectedEof`] rather than a panic. All multi-byte
//! primitives are big-endian, matching the protocol.

use crate::codec::position::BlockPosition;
use crate::codec::varint;
use crate::error::DecodeError;
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// Longest string, in bytes, a [`BufferWriter`] accepts.
pub const MAX_STRING_LEN: usize = 32767;

/// Longest string, in bytes, a [`Buffer`] accepts when reading.
/// The protocol limits strings to 32767 UTF-16 units, which is at most
/// three UTF-8 bytes each.
pub const MAX_STRING_READ_LEN: usize = MAX_STRING_LEN * 3;

/// An owned byte sequence plus a read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    bytes: Bytes,
    cursor: usize,
}

impl Buffer {
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Total length of the underlying bytes, read or not.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Unread bytes as a slice, without advancing.
    pub fn chunk(&self) -> &[u8] {
        &self.bytes[self.cursor..]
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(DecodeError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.cursor..self.cursor + N]);
        self.cursor += N;
        Ok(out)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.ensure(count)?;
        self.cursor += count;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.take()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.take()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.take()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.take()?))
    }

    /// Reads exactly `count` bytes. The result shares the underlying
    /// allocation instead of copying.
    pub fn read_bytes(&mut self, count: usize) -> Result<Bytes, DecodeError> {
        self.ensure(count)?;
        let out = self.bytes.slice(self.cursor..self.cursor + count);
        self.cursor += count;
        Ok(out)
    }

    /// Consumes everything after the cursor.
    pub fn read_remaining(&mut self) -> Bytes {
        let out = self.bytes.slice(self.cursor..);
        self.cursor = self.bytes.len();
        out
    }

    pub fn read_varint(&mut self) -> Result<i32, DecodeError> {
        let mut slice = self.chunk();
        let before = slice.len();
        let value = varint::read_varint(&mut slice)?;
        self.cursor += before - slice.len();
        Ok(value)
    }

    pub fn read_varlong(&mut self) -> Result<i64, DecodeError> {
        let mut slice = self.chunk();
        let before = slice.len();
        let value = varint::read_varlong(&mut slice)?;
        self.cursor += before - slice.len();
        Ok(value)
    }

    /// Reads a VarInt used as a length and checks it is not negative.
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let length = self.read_varint()?;
        usize::try_from(length).map_err(|_| DecodeError::NegativeLength(length))
    }

    /// Reads a VarInt-prefixed byte array.
    pub fn read_byte_array(&mut self) -> Result<Bytes, DecodeError> {
        let length = self.read_length()?;
        self.read_bytes(length)
    }

    /// Reads a VarInt-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let length = self.read_length()?;
        if length > MAX_STRING_READ_LEN {
            return Err(DecodeError::StringTooLong {
                length,
                max: MAX_STRING_READ_LEN,
            });
        }
        self.ensure(length)?;
        let raw = &self.bytes[self.cursor..self.cursor + length];
        let text = std::str::from_utf8(raw)
            .map_err(|_| DecodeError::InvalidUtf8)?
            .to_owned();
        self.cursor += length;
        Ok(text)
    }

    /// Reads a UUID stored as two big-endian longs.
    pub fn read_uuid(&mut self) -> Result<Uuid, DecodeError> {
        Ok(Uuid::from_bytes(self.take()?))
    }

    pub fn read_position(&mut self) -> Result<BlockPosition, DecodeError> {
        Ok(BlockPosition::unpack(self.read_u64()?))
    }

    /// Reads `count` big-endian longs, as used by packed chunk data.
    pub fn read_u64_array(&mut self, count: usize) -> Result<Vec<u64>, DecodeError> {
        let bytes_needed = count
            .checked_mul(8)
            .ok_or(DecodeError::InvalidValue {
                field: "long array length",
                value: count as i64,
            })?;
        self.ensure(bytes_needed)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_u64()?);
        }
        Ok(out)
    }
}

impl From<Bytes> for Buffer {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Buffer {
    fn from(bytes: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(bytes))
    }
}

/// Append-only writer producing an owned byte sequence.
#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    bytes: BytesMut,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn freeze(self) -> Bytes {
        self.bytes.freeze()
    }

    pub fn into_inner(self) -> BytesMut {
        self.bytes
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.put_u8(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.bytes.put_i8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.bytes.put_u8(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.bytes.put_u16(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.bytes.put_i16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bytes.put_i64(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.bytes.put_u64(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.bytes.put_f32(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bytes.put_f64(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.put_slice(bytes);
    }

    pub fn write_varint(&mut self, value: i32) {
        varint::write_varint(&mut self.bytes, value);
    }

    pub fn write_varlong(&mut self, value: i64) {
        varint::write_varlong(&mut self.bytes, value);
    }

    /// Writes a VarInt-prefixed byte array.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as i32);
        self.write_bytes(bytes);
    }

    /// Writes a VarInt-prefixed UTF-8 string.
    ///
    /// # Panics
    /// If the encoded string is [`MAX_STRING_LEN`] bytes or longer. Outgoing
    /// strings come from the caller, so an oversized one is a programming
    /// error rather than a recoverable condition.
    pub fn write_string(&mut self, value: &str) {
        let length = value.len();
        assert!(
            length < MAX_STRING_LEN,
            "string of {length} bytes is too long to write (limit {MAX_STRING_LEN})"
        );
        self.write_varint(length as i32);
        self.write_bytes(value.as_bytes());
    }

    pub fn write_uuid(&mut self, value: &Uuid) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_position(&mut self, position: &BlockPosition) {
        self.write_u64(position.pack());
    }
}
