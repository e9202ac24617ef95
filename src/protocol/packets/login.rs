use super::{Decode, Encode};
use crate::codec::{Buffer, BufferWriter};
use crate::error::DecodeError;
use bytes::Bytes;
use uuid::Uuid;

/// Login rejected; `reason` is a JSON chat component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDisconnect {
    pub reason: String,
}

impl Decode for LoginDisconnect {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: buffer.read_string()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequest {
    pub server_id: String,
    /// DER-encoded RSA public key.
    pub public_key: Bytes,
    pub verify_token: Bytes,
}

impl Decode for EncryptionRequest {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            server_id: buffer.read_string()?,
            public_key: buffer.read_byte_array()?,
            verify_token: buffer.read_byte_array()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub uuid: Uuid,
    pub username: String,
}

impl Decode for LoginSuccess {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            uuid: buffer.read_uuid()?,
            username: buffer.read_string()?,
        })
    }
}

/// Packets at or above `threshold` bytes are compressed from here on.
/// A negative threshold turns compression off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCompression {
    pub threshold: i32,
}

impl Decode for SetCompression {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            threshold: buffer.read_varint()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPluginRequest {
    pub message_id: i32,
    pub channel: String,
    pub data: Bytes,
}

impl Decode for LoginPluginRequest {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            message_id: buffer.read_varint()?,
            channel: buffer.read_string()?,
            data: buffer.read_remaining(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
}

impl Encode for LoginStart {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_string(&self.username);
    }
}

/// Reply to [`EncryptionRequest`]. Both fields are RSA-encrypted with the
/// server's public key by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionResponse {
    pub shared_secret: Bytes,
    pub verify_token: Bytes,
}

impl Encode for EncryptionResponse {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_byte_array(&self.shared_secret);
        writer.write_byte_array(&self.verify_token);
    }
}

/// `data: None` tells the server the channel is not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPluginResponse {
    pub message_id: i32,
    pub data: Option<Bytes>,
}

impl Encode for LoginPluginResponse {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.message_id);
        writer.write_bool(self.data.is_some());
        if let Some(data) = &self.data {
            writer.write_bytes(data);
        }
    }
}
