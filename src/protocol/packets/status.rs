use super::{Decode, Encode};
use crate::codec::{Buffer, BufferWriter};
use crate::error::DecodeError;

/// Server list response; `json` is the raw status document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub json: String,
}

impl Decode for StatusResponse {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            json: buffer.read_string()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub payload: i64,
}

impl Decode for Pong {
    fn decode(buffer: &mut Buffer) -> Result<Self, DecodeError> {
        Ok(Self {
            payload: buffer.read_i64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRequest;

impl Encode for StatusRequest {
    fn encode(&self, _writer: &mut BufferWriter) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub payload: i64,
}

impl Encode for Ping {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_i64(self.payload);
    }
}
