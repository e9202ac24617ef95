//! # Threshold Compression
//!
//! Once the server sends its compression threshold, every framed packet
//! carries a VarInt "data length" ahead of the body:
//!
//! - `0`: the body is the raw packet (below threshold).
//! - `n > 0`: the body is zlib-compressed and inflates to exactly `n` bytes.
//!
//! A negative threshold disables the layer entirely and packets pass through
//! unchanged.

use crate::codec::varint::{self, MAX_VARINT_LEN};
use crate::codec::Buffer;
use crate::error::{constants, ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::{trace, warn};

/// Largest inflated size accepted from the server.
pub const MAX_DECOMPRESSED_SIZE: usize = 8 * 1024 * 1024;

/// Threshold value meaning "compression disabled".
pub const DISABLED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionLayer {
    threshold: i32,
}

impl Default for CompressionLayer {
    fn default() -> Self {
        Self {
            threshold: DISABLED,
        }
    }
}

impl CompressionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Sets the threshold. Any negative value disables compression.
    pub fn set_threshold(&mut self, threshold: i32) {
        self.threshold = threshold;
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold >= 0
    }

    /// Strips the data-length prefix and inflates the body if needed.
    pub fn decompress_inbound(&self, packet: Bytes) -> Result<Bytes> {
        if !self.is_enabled() {
            return Ok(packet);
        }

        let mut buffer = Buffer::new(packet);
        let data_length = buffer.read_length()?;
        if data_length == 0 {
            return Ok(buffer.read_remaining());
        }

        if data_length > MAX_DECOMPRESSED_SIZE {
            return Err(ProtocolError::DecompressionFailure(format!(
                "declared length {data_length} exceeds limit of {MAX_DECOMPRESSED_SIZE}"
            )));
        }

        if (data_length as i64) < self.threshold as i64 {
            warn!(
                data_length,
                threshold = self.threshold,
                "Server compressed a packet below the compression threshold"
            );
        }

        let compressed = buffer.read_remaining();
        let mut inflated = Vec::with_capacity(data_length);
        // One byte of slack so an over-long stream is detected rather than truncated.
        ZlibDecoder::new(&compressed[..])
            .take(data_length as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(|e| ProtocolError::DecompressionFailure(e.to_string()))?;

        if inflated.len() != data_length {
            return Err(ProtocolError::DecompressionFailure(format!(
                "{}: expected {data_length}, got {}",
                constants::ERR_LENGTH_MISMATCH,
                inflated.len()
            )));
        }

        trace!(compressed = compressed.len(), data_length, "Inflated packet");
        Ok(Bytes::from(inflated))
    }

    /// Adds the data-length prefix, compressing payloads at or above the
    /// threshold.
    pub fn compress_outbound(&self, payload: Bytes) -> Result<Bytes> {
        if !self.is_enabled() {
            return Ok(payload);
        }

        let mut out = BytesMut::with_capacity(payload.len() + MAX_VARINT_LEN);
        if payload.len() < self.threshold as usize {
            varint::write_varint(&mut out, 0);
            out.put_slice(&payload);
            return Ok(out.freeze());
        }

        varint::write_varint(&mut out, payload.len() as i32);
        let mut encoder = ZlibEncoder::new(out.writer(), Compression::default());
        encoder
            .write_all(&payload)
            .map_err(|_| ProtocolError::CompressionFailure)?;
        let out = encoder
            .finish()
            .map_err(|_| ProtocolError::CompressionFailure)?
            .into_inner();
        Ok(out.freeze())
    }
}
