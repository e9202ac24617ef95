//! # Error Types
//!
//! Error handling for the client protocol engine.
//!
//! This module defines every failure the pipeline can surface, from socket
//! errors up to malformed fields inside a known packet.
//!
//! ## Error Categories
//! - **Transport Errors**: refused connections, resets, DNS failures, timeouts
//! - **Codec Errors**: invalid VarInts, buffer underruns, bad UTF-8 ([`DecodeError`])
//! - **Cryptographic Errors**: cipher setup or stream failures
//! - **Compression Errors**: zlib failures, size mismatches, oversized claims
//! - **State Errors**: illegal connection state transitions
//!
//! Unknown packet ids are deliberately *not* represented here: a registry miss
//! is logged and discarded by the dispatcher and never becomes an error value.
//!
//! ## Example Usage
//! ```rust
//! use mc_protocol::codec::Buffer;
//! use mc_protocol::error::{DecodeError, ProtocolError, Result};
//!
//! fn read_id(bytes: &[u8]) -> Result<i32> {
//!     let mut buffer = Buffer::from(bytes.to_vec());
//!     Ok(buffer.read_varint()?)
//! }
//!
//! assert!(matches!(
//!     read_id(&[0x80]),
//!     Err(ProtocolError::Decode(DecodeError::UnexpectedEof { .. }))
//! ));
//! ```

use crate::protocol::state::ConnectionState;
use std::io;
use thiserror::Error;

/// Error message constants shared by log lines and error values.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_HANDLER_LOCK: &str = "Failed to acquire lock on packet handler";

    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_CONNECT_TIMEOUT: &str = "Timed out while connecting to server";
    pub const ERR_ALREADY_STARTED: &str = "Connection has already been started";
    pub const ERR_NO_RUNTIME: &str = "connect() must be called from within a tokio runtime";

    /// Cryptographic errors
    pub const ERR_INVALID_SECRET: &str = "Shared secret must be 16 bytes";
    pub const ERR_SECRET_GENERATION: &str = "Failed to generate shared secret";

    /// Compression errors
    pub const ERR_LENGTH_MISMATCH: &str = "Decompressed length does not match declared length";
}

/// Failures raised while reading wire data out of a [`crate::codec::Buffer`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("VarInt is longer than 5 bytes")]
    VarIntTooLong,

    #[error("VarLong is longer than 10 bytes")]
    VarLongTooLong,

    #[error("String is not valid UTF-8")]
    InvalidUtf8,

    #[error("Negative length prefix: {0}")]
    NegativeLength(i32),

    #[error("String of {length} bytes exceeds limit of {max}")]
    StringTooLong { length: usize, max: usize },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },

    #[error("Unsupported NBT tag type: {0}")]
    UnsupportedNbtTag(u8),

    #[error("Invalid chunk data: {0}")]
    InvalidChunkData(String),
}

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to decode packet 0x{packet_id:02x} in state {state}: {source}")]
    PacketDecode {
        packet_id: i32,
        state: ConnectionState,
        #[source]
        source: DecodeError,
    },

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("Compression failed")]
    CompressionFailure,

    #[error("Decompression failed: {0}")]
    DecompressionFailure(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Whether this error must tear down the connection it occurred on.
    ///
    /// Only configuration and state-transition errors are caller mistakes that
    /// leave the stream intact; everything else means the byte stream can no
    /// longer be trusted.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ProtocolError::ConfigError(_) | ProtocolError::InvalidStateTransition { .. }
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
