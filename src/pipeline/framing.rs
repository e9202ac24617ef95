//! # Packet Framing
//!
//! Splits the continuous inbound byte stream into packets using the VarInt
//! length prefix, and prefixes outbound payloads with theirs.
//!
//! Socket reads carry no alignment guarantee: a single read may hold half a
//! length prefix, several packets, or the tail of one packet and the head of
//! the next. [`PacketFramer`] keeps a [`ReceiveState`] across calls so every
//! split point yields the same packets.
//!
//! ## Wire Format
//! ```text
//! VarInt(length) ++ payload[length]
//! ```
//! A zero length is legal and produces an empty payload.

use crate::codec::varint::{self, MAX_VARINT_LEN};
use crate::error::{DecodeError, ProtocolError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Largest length a 3-byte VarInt prefix can express.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 2_097_151;

/// Progress on the packet currently being received.
///
/// `packet.len() <= length` holds whenever `length` is set; the state is
/// cleared as soon as a packet completes, so it never holds bytes from two
/// packets.
#[derive(Debug, Default)]
pub struct ReceiveState {
    length_bytes: Vec<u8>,
    length: Option<usize>,
    packet: BytesMut,
}

impl ReceiveState {
    /// Whether nothing of a packet has been received yet.
    pub fn is_empty(&self) -> bool {
        self.length_bytes.is_empty() && self.length.is_none() && self.packet.is_empty()
    }

    /// Resolved length of the packet in progress, if the prefix is complete.
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    /// Payload bytes accumulated so far.
    pub fn received(&self) -> usize {
        self.packet.len()
    }

    fn clear(&mut self) {
        self.length_bytes.clear();
        self.length = None;
        self.packet = BytesMut::new();
    }
}

/// Reassembles length-prefixed packets from arbitrary byte deliveries.
#[derive(Debug)]
pub struct PacketFramer {
    state: ReceiveState,
    max_packet_size: usize,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE)
    }
}

impl PacketFramer {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            state: ReceiveState::default(),
            max_packet_size,
        }
    }

    pub fn state(&self) -> &ReceiveState {
        &self.state
    }

    /// Drops any partially received packet.
    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// Consumes bytes from `input` until one packet completes or the input
    /// runs out. Returns the completed payload without its prefix.
    ///
    /// Bytes after the completed packet are left in `input`. On error the
    /// receive state is cleared, since the stream cannot be resynchronised.
    pub fn next_frame<B: Buf>(&mut self, input: &mut B) -> Result<Option<Bytes>> {
        match self.advance(input) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                self.state.clear();
                Err(e)
            }
        }
    }

    fn advance<B: Buf>(&mut self, input: &mut B) -> Result<Option<Bytes>> {
        let length = match self.state.length {
            Some(length) => length,
            None => match self.read_length(input)? {
                Some(length) => length,
                None => return Ok(None),
            },
        };

        let mut wanted = length - self.state.packet.len();
        while wanted > 0 && input.has_remaining() {
            let chunk = input.chunk();
            let take = chunk.len().min(wanted);
            self.state.packet.extend_from_slice(&chunk[..take]);
            input.advance(take);
            wanted -= take;
        }

        if self.state.packet.len() < length {
            return Ok(None);
        }

        let frame = self.state.packet.split().freeze();
        self.state.clear();
        trace!(length, "Framed packet");
        Ok(Some(frame))
    }

    /// Builds the length prefix one byte at a time. Returns `None` while the
    /// prefix is still incomplete.
    fn read_length<B: Buf>(&mut self, input: &mut B) -> Result<Option<usize>> {
        while input.has_remaining() {
            let byte = input.get_u8();
            self.state.length_bytes.push(byte);

            if byte & 0x80 != 0 {
                if self.state.length_bytes.len() >= MAX_VARINT_LEN {
                    return Err(DecodeError::VarIntTooLong.into());
                }
                continue;
            }

            let raw = varint::read_varint(&mut self.state.length_bytes.as_slice())?;
            let length =
                usize::try_from(raw).map_err(|_| DecodeError::NegativeLength(raw))?;
            if length > self.max_packet_size {
                return Err(ProtocolError::OversizedPacket(length));
            }

            self.state.length_bytes.clear();
            self.state.length = Some(length);
            self.state.packet.reserve(length);
            return Ok(Some(length));
        }
        Ok(None)
    }

    /// Frames every complete packet contained in `data`, keeping any trailing
    /// partial packet for the next call.
    pub fn process_inbound(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        let mut input = data;
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame(&mut input)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Prefixes `payload` with its VarInt length.
    pub fn frame_outbound(&self, payload: &[u8]) -> Result<BytesMut> {
        let mut out = BytesMut::with_capacity(payload.len() + MAX_VARINT_LEN);
        self.write_frame(payload, &mut out)?;
        Ok(out)
    }

    fn write_frame(&self, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        if payload.len() > self.max_packet_size {
            return Err(ProtocolError::OversizedPacket(payload.len()));
        }
        dst.reserve(payload.len() + varint::varint_len(payload.len() as i32));
        varint::write_varint(dst, payload.len() as i32);
        dst.put_slice(payload);
        Ok(())
    }
}

impl Decoder for PacketFramer {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        self.next_frame(src)
    }
}

impl Encoder<Bytes> for PacketFramer {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        self.write_frame(&item, dst)
    }
}
