//! Helpers shared by the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use mc_protocol::codec::BufferWriter;
use mc_protocol::event::Event;
use mc_protocol::pipeline::{InboundPipeline, OutboundPipeline};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

pub const WAIT: Duration = Duration::from_secs(5);

/// Full chunk column in 1.16.1 layout. Sections whose bit is set in `mask`
/// are filled with `state`.
pub fn column(mask: u16, state: i32) -> Bytes {
    let mut sections = BufferWriter::new();
    for y in 0..16 {
        if mask & (1 << y) == 0 {
            continue;
        }
        sections.write_i16(4096);
        sections.write_u8(4);
        sections.write_varint(1);
        sections.write_varint(state);
        sections.write_varint(256);
        for _ in 0..256 {
            sections.write_u64(0);
        }
    }

    let mut writer = BufferWriter::new();
    writer.write_bool(true);
    writer.write_bool(true);
    writer.write_varint(mask as i32);
    // Empty heightmaps compound
    writer.write_bytes(&[0x0A, 0x00, 0x00, 0x00]);
    for _ in 0..1024 {
        writer.write_i32(1);
    }
    writer.write_byte_array(sections.as_slice());
    writer.write_varint(0);
    writer.freeze()
}

/// Packet id followed by the body written by `body`.
pub fn packet(id: i32, body: impl FnOnce(&mut BufferWriter)) -> Bytes {
    let mut writer = BufferWriter::new();
    writer.write_varint(id);
    body(&mut writer);
    writer.freeze()
}

/// Waits for the next event, failing the test after [`WAIT`].
pub async fn next_event(events: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

/// Server side of one connection, speaking the wire format through the
/// crate's own pipelines.
pub struct MockServer {
    stream: TcpStream,
    inbound: InboundPipeline,
    outbound: OutboundPipeline,
}

impl MockServer {
    pub async fn bind() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    pub async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
            .await
            .expect("timed out waiting for client")
            .unwrap();
        Self {
            stream,
            inbound: InboundPipeline::new(2_097_151),
            outbound: OutboundPipeline::new(2_097_151),
        }
    }

    /// Next packet from the client, or `None` once it has hung up.
    pub async fn recv(&mut self) -> Option<Bytes> {
        let mut buf = vec![0u8; 4096];
        loop {
            if let Some(packet) = self.inbound.next_packet().unwrap() {
                return Some(packet);
            }
            let read = tokio::time::timeout(WAIT, self.stream.read(&mut buf))
                .await
                .expect("timed out waiting for client data")
                .ok()?;
            if read == 0 {
                return None;
            }
            self.inbound.push(&buf[..read]);
        }
    }

    pub async fn send(&mut self, payload: Bytes) {
        let wire = self.outbound.encode(payload).unwrap();
        self.stream.write_all(&wire).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    pub fn set_compression(&mut self, threshold: i32) {
        self.inbound.set_compression_threshold(threshold);
        self.outbound.set_compression_threshold(threshold);
    }

    pub fn enable_encryption(&mut self, secret: &[u8]) {
        self.inbound.enable_encryption(secret).unwrap();
        self.outbound.enable_encryption(secret).unwrap();
    }
}
