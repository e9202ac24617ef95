//! # Packet Pipeline
//!
//! Composes the per-connection byte transforms.
//!
//! ```text
//! inbound:  socket bytes -> decrypt -> frame -> decompress -> packet payload
//! outbound: packet payload -> compress -> frame -> encrypt -> socket bytes
//! ```
//!
//! Each direction owns its own layer state; nothing is shared between the
//! two, or between connections. The inbound side yields packets one at a
//! time so a handler can change the compression threshold or enable
//! decryption before the next packet in the same read is processed.

pub mod compression;
pub mod encryption;
pub mod framing;

pub use compression::CompressionLayer;
pub use encryption::{generate_shared_secret, EncryptionLayer};
pub use framing::{PacketFramer, ReceiveState};

use crate::codec::varint::MAX_VARINT_LEN;
use crate::error::Result;
use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Inbound half: decryption, framing, decompression.
#[derive(Debug)]
pub struct InboundPipeline {
    encryption: EncryptionLayer,
    framer: PacketFramer,
    compression: CompressionLayer,
    pending: BytesMut,
}

impl InboundPipeline {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            encryption: EncryptionLayer::new(),
            framer: PacketFramer::new(max_packet_size),
            compression: CompressionLayer::new(),
            pending: BytesMut::new(),
        }
    }

    /// Accepts a chunk of raw socket bytes, decrypting it if enabled.
    pub fn push(&mut self, data: &[u8]) {
        let start = self.pending.len();
        self.pending.extend_from_slice(data);
        self.encryption.decrypt(&mut self.pending[start..]);
    }

    /// Pulls the next complete, decompressed packet out of the pushed bytes.
    pub fn next_packet(&mut self) -> Result<Option<Bytes>> {
        match self.framer.decode(&mut self.pending)? {
            Some(frame) => self.compression.decompress_inbound(frame).map(Some),
            None => Ok(None),
        }
    }

    /// Convenience for tests and one-shot use: push and drain.
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.push(data);
        let mut packets = Vec::new();
        while let Some(packet) = self.next_packet()? {
            packets.push(packet);
        }
        Ok(packets)
    }

    pub fn set_compression_threshold(&mut self, threshold: i32) {
        self.compression.set_threshold(threshold);
    }

    pub fn compression_threshold(&self) -> i32 {
        self.compression.threshold()
    }

    /// Enables decryption. Bytes already received but not yet framed are
    /// ciphertext too and are decrypted now.
    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<()> {
        self.encryption.enable_encryption(secret)?;
        self.encryption.decrypt(&mut self.pending);
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_enabled()
    }

    pub fn receive_state(&self) -> &ReceiveState {
        self.framer.state()
    }

    /// Drops buffered bytes and any partial packet.
    pub fn reset(&mut self) {
        self.framer.reset();
        self.pending.clear();
    }
}

/// Outbound half: compression, framing, encryption.
#[derive(Debug)]
pub struct OutboundPipeline {
    compression: CompressionLayer,
    framer: PacketFramer,
    encryption: EncryptionLayer,
}

impl OutboundPipeline {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            compression: CompressionLayer::new(),
            framer: PacketFramer::new(max_packet_size),
            encryption: EncryptionLayer::new(),
        }
    }

    /// Turns an encoded packet (id plus fields) into wire bytes.
    pub fn encode(&mut self, payload: Bytes) -> Result<Bytes> {
        let body = self.compression.compress_outbound(payload)?;
        let mut wire = BytesMut::with_capacity(body.len() + MAX_VARINT_LEN);
        self.framer.encode(body, &mut wire)?;
        self.encryption.encrypt(&mut wire);
        Ok(wire.freeze())
    }

    pub fn set_compression_threshold(&mut self, threshold: i32) {
        self.compression.set_threshold(threshold);
    }

    pub fn enable_encryption(&mut self, secret: &[u8]) -> Result<()> {
        self.encryption.enable_encryption(secret)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: [u8; 16] = [7; 16];

    #[test]
    fn test_plain_roundtrip() {
        let mut outbound = OutboundPipeline::new(1 << 21);
        let mut inbound = InboundPipeline::new(1 << 21);
        let wire = outbound.encode(Bytes::from_static(b"\x00abc")).unwrap();
        assert_eq!(&wire[..], b"\x04\x00abc");
        assert_eq!(inbound.process(&wire).unwrap(), vec![Bytes::from_static(b"\x00abc")]);
    }

    #[test]
    fn test_full_stack_roundtrip() {
        let mut outbound = OutboundPipeline::new(1 << 21);
        let mut inbound = InboundPipeline::new(1 << 21);
        outbound.set_compression_threshold(16);
        inbound.set_compression_threshold(16);
        outbound.enable_encryption(&SECRET).unwrap();
        inbound.enable_encryption(&SECRET).unwrap();

        let small = Bytes::from_static(b"\x01small");
        let large = Bytes::from(vec![0x42u8; 1000]);
        let mut wire = outbound.encode(small.clone()).unwrap().to_vec();
        wire.extend(outbound.encode(large.clone()).unwrap());

        let mut packets = Vec::new();
        for chunk in wire.chunks(3) {
            packets.extend(inbound.process(chunk).unwrap());
        }
        assert_eq!(packets, vec![small, large]);
    }

    #[test]
    fn test_encryption_enabled_mid_read() {
        let mut server = OutboundPipeline::new(1 << 21);
        let mut wire = server.encode(Bytes::from_static(b"\x01request")).unwrap().to_vec();
        server.enable_encryption(&SECRET).unwrap();
        wire.extend(server.encode(Bytes::from_static(b"\x02secret")).unwrap());

        let mut inbound = InboundPipeline::new(1 << 21);
        inbound.push(&wire);
        let first = inbound.next_packet().unwrap().unwrap();
        assert_eq!(&first[..], b"\x01request");
        inbound.enable_encryption(&SECRET).unwrap();
        let second = inbound.next_packet().unwrap().unwrap();
        assert_eq!(&second[..], b"\x02secret");
        assert!(inbound.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_threshold_change_applies_to_next_packet() {
        let mut server = OutboundPipeline::new(1 << 21);
        let mut wire = server.encode(Bytes::from_static(b"\x03\x00")).unwrap().to_vec();
        server.set_compression_threshold(0);
        wire.extend(server.encode(Bytes::from_static(b"\x02hello")).unwrap());

        let mut inbound = InboundPipeline::new(1 << 21);
        inbound.push(&wire);
        assert_eq!(&inbound.next_packet().unwrap().unwrap()[..], b"\x03\x00");
        inbound.set_compression_threshold(0);
        assert_eq!(&inbound.next_packet().unwrap().unwrap()[..], b"\x02hello");
    }
}
