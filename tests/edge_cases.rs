#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for the wire codec and pipeline layers
//! Boundary conditions, malformed input and resource limits

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use mc_protocol::codec::nbt::skip_nbt;
use mc_protocol::codec::{Buffer, BufferWriter};
use mc_protocol::error::{DecodeError, ProtocolError};
use mc_protocol::pipeline::compression::MAX_DECOMPRESSED_SIZE;
use mc_protocol::pipeline::{CompressionLayer, EncryptionLayer, InboundPipeline, PacketFramer};
use mc_protocol::world::chunk::{ChunkPosition, PackedChunk};
use std::io::Write;

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

// ============================================================================
// FRAMING EDGE CASES
// ============================================================================

#[test]
fn test_zero_length_frame_is_emitted() {
    let mut framer = PacketFramer::default();
    let frames = framer.process_inbound(&[0x00, 0x01, 0xAA]).unwrap();
    assert_eq!(frames.len(), 2);
    assert!(frames[0].is_empty());
    assert_eq!(&frames[1][..], &[0xAA]);
}

#[test]
fn test_length_prefix_split_across_reads() {
    let mut framer = PacketFramer::default();
    // 300 = 0xAC 0x02
    assert!(framer.process_inbound(&[0xAC]).unwrap().is_empty());
    assert!(framer.state().length().is_none());

    let mut rest = vec![0x02];
    rest.extend(std::iter::repeat(7u8).take(299));
    assert!(framer.process_inbound(&rest).unwrap().is_empty());
    assert_eq!(framer.state().length(), Some(300));
    assert_eq!(framer.state().received(), 299);

    let frames = framer.process_inbound(&[7]).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), 300);
    assert!(framer.state().is_empty());
}

#[test]
fn test_every_split_point_of_multi_packet_stream() {
    let payloads: [&[u8]; 4] = [&[0x20; 200], &[], &[0x01, 0x02], &[0x7F; 130]];
    let framer = PacketFramer::default();
    let mut wire = Vec::new();
    for payload in payloads {
        wire.extend_from_slice(&framer.frame_outbound(payload).unwrap());
    }

    for split in 0..=wire.len() {
        let mut framer = PacketFramer::default();
        let mut frames = framer.process_inbound(&wire[..split]).unwrap();
        frames.extend(framer.process_inbound(&wire[split..]).unwrap());

        assert_eq!(frames.len(), payloads.len(), "split at {split}");
        for (frame, payload) in frames.iter().zip(payloads) {
            assert_eq!(&frame[..], payload, "split at {split}");
        }
        assert!(framer.state().is_empty());
    }
}

#[test]
fn test_six_byte_length_prefix_rejected() {
    let mut framer = PacketFramer::default();
    let err = framer
        .process_inbound(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01])
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Decode(DecodeError::VarIntTooLong)));
    assert!(framer.state().is_empty());
}

#[test]
fn test_negative_length_prefix_rejected() {
    let mut framer = PacketFramer::default();
    let err = framer
        .process_inbound(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F])
        .unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Decode(DecodeError::NegativeLength(-1))
    ));
}

#[test]
fn test_oversized_length_prefix_rejected() {
    let mut framer = PacketFramer::new(1024);
    // 2048 = 0x80 0x10
    let err = framer.process_inbound(&[0x80, 0x10]).unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedPacket(2048)));

    let err = framer.frame_outbound(&[0u8; 1025]).unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedPacket(1025)));
}

#[tokio::test]
async fn test_framer_as_stream_codec() {
    use futures::StreamExt;
    use tokio_util::codec::FramedRead;

    let framer = PacketFramer::default();
    let mut wire = Vec::new();
    for payload in [&b"first"[..], &[][..], &[0xAB; 300][..]] {
        wire.extend_from_slice(&framer.frame_outbound(payload).unwrap());
    }

    let frames: Vec<Bytes> = FramedRead::new(&wire[..], PacketFramer::default())
        .map(|frame| frame.unwrap())
        .collect()
        .await;
    assert_eq!(frames.len(), 3);
    assert_eq!(&frames[0][..], b"first");
    assert!(frames[1].is_empty());
    assert_eq!(frames[2].len(), 300);
}

// ============================================================================
// COMPRESSION EDGE CASES
// ============================================================================

#[test]
fn test_uncompressed_marker_passes_body_through() {
    let layer = CompressionLayer::with_threshold(256);
    let out = layer
        .decompress_inbound(Bytes::from_static(&[0x00, 0x20, 0x01]))
        .unwrap();
    assert_eq!(&out[..], &[0x20, 0x01]);
}

#[test]
fn test_disabled_layer_is_transparent() {
    let layer = CompressionLayer::new();
    assert!(!layer.is_enabled());
    let body = Bytes::from_static(&[0x00, 0x01, 0x02]);
    assert_eq!(layer.decompress_inbound(body.clone()).unwrap(), body);
    assert_eq!(layer.compress_outbound(body.clone()).unwrap(), body);
}

#[test]
fn test_declared_length_mismatch_rejected() {
    let layer = CompressionLayer::with_threshold(0);
    let mut writer = BufferWriter::new();
    writer.write_varint(10);
    writer.write_bytes(&zlib(&[1, 2, 3, 4]));

    let err = layer.decompress_inbound(writer.freeze()).unwrap_err();
    assert!(matches!(err, ProtocolError::DecompressionFailure(_)));
}

#[test]
fn test_longer_stream_than_declared_rejected() {
    let layer = CompressionLayer::with_threshold(0);
    let mut writer = BufferWriter::new();
    writer.write_varint(4);
    writer.write_bytes(&zlib(&[9u8; 64]));

    let err = layer.decompress_inbound(writer.freeze()).unwrap_err();
    assert!(matches!(err, ProtocolError::DecompressionFailure(_)));
}

#[test]
fn test_decompression_bomb_claim_rejected() {
    let layer = CompressionLayer::with_threshold(0);
    let mut writer = BufferWriter::new();
    writer.write_varint((MAX_DECOMPRESSED_SIZE + 1) as i32);
    writer.write_bytes(&zlib(&[0u8; 16]));

    let err = layer.decompress_inbound(writer.freeze()).unwrap_err();
    assert!(matches!(err, ProtocolError::DecompressionFailure(_)));
}

#[test]
fn test_garbage_zlib_stream_rejected() {
    let layer = CompressionLayer::with_threshold(0);
    let err = layer
        .decompress_inbound(Bytes::from_static(&[0x05, 0xDE, 0xAD, 0xBE, 0xEF]))
        .unwrap_err();
    assert!(matches!(err, ProtocolError::DecompressionFailure(_)));
}

#[test]
fn test_compressed_packet_below_threshold_still_decodes() {
    let layer = CompressionLayer::with_threshold(512);
    let mut writer = BufferWriter::new();
    writer.write_varint(3);
    writer.write_bytes(&zlib(&[1, 2, 3]));

    let out = layer.decompress_inbound(writer.freeze()).unwrap();
    assert_eq!(&out[..], &[1, 2, 3]);
}

// ============================================================================
// ENCRYPTION EDGE CASES
// ============================================================================

#[test]
fn test_secret_must_be_sixteen_bytes() {
    let mut layer = EncryptionLayer::new();
    assert!(matches!(
        layer.enable_encryption(&[0u8; 15]),
        Err(ProtocolError::EncryptionFailure(_))
    ));
    assert!(matches!(
        layer.enable_encryption(&[0u8; 32]),
        Err(ProtocolError::EncryptionFailure(_))
    ));
    assert!(!layer.is_enabled());
}

#[test]
fn test_cfb8_stream_is_split_invariant() {
    let secret = [0x42u8; 16];
    let plain: Vec<u8> = (0..=255u8).collect();

    let mut whole = plain.clone();
    let mut encryptor = EncryptionLayer::new();
    encryptor.enable_encryption(&secret).unwrap();
    encryptor.encrypt(&mut whole);

    let mut decryptor = EncryptionLayer::new();
    decryptor.enable_encryption(&secret).unwrap();
    let mut recovered = Vec::new();
    for piece in whole.chunks(7) {
        let mut piece = piece.to_vec();
        decryptor.decrypt(&mut piece);
        recovered.extend(piece);
    }
    assert_eq!(recovered, plain);
}

#[test]
fn test_inbound_encryption_applies_to_unframed_bytes() {
    let secret = [3u8; 16];
    let mut cipher = EncryptionLayer::new();
    cipher.enable_encryption(&secret).unwrap();

    // First packet in the clear, second encrypted, arriving in one read.
    let mut second = vec![0x02, 0x20, 0x21];
    cipher.encrypt(&mut second);
    let mut read = vec![0x01, 0x10];
    read.extend_from_slice(&second);

    let mut pipeline = InboundPipeline::new(1024);
    pipeline.push(&read);
    let first = pipeline.next_packet().unwrap().unwrap();
    assert_eq!(&first[..], &[0x10]);

    pipeline.enable_encryption(&secret).unwrap();
    let next = pipeline.next_packet().unwrap().unwrap();
    assert_eq!(&next[..], &[0x20, 0x21]);
}

// ============================================================================
// BUFFER AND FIELD EDGE CASES
// ============================================================================

#[test]
fn test_read_past_end_reports_needed_bytes() {
    let mut buffer = Buffer::from(vec![0u8; 3]);
    assert_eq!(
        buffer.read_i32().unwrap_err(),
        DecodeError::UnexpectedEof {
            needed: 4,
            remaining: 3
        }
    );
}

#[test]
fn test_negative_string_length() {
    let mut buffer = Buffer::from(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    assert_eq!(
        buffer.read_string().unwrap_err(),
        DecodeError::NegativeLength(-1)
    );
}

#[test]
fn test_invalid_utf8_string() {
    let mut buffer = Buffer::from(vec![0x02, 0xC3, 0x28]);
    assert_eq!(buffer.read_string().unwrap_err(), DecodeError::InvalidUtf8);
}

#[test]
fn test_string_length_limit() {
    let mut writer = BufferWriter::new();
    writer.write_varint(200_000);
    let mut buffer = Buffer::from(writer.freeze());
    assert!(matches!(
        buffer.read_string().unwrap_err(),
        DecodeError::StringTooLong { length: 200_000, .. }
    ));
}

#[test]
#[should_panic(expected = "too long")]
fn test_writing_oversized_string_panics() {
    let mut writer = BufferWriter::new();
    writer.write_string(&"x".repeat(40_000));
}

#[test]
fn test_unknown_nbt_tag_rejected() {
    let mut buffer = Buffer::from(vec![0x0A, 0x00, 0x00, 0x63]);
    assert_eq!(
        skip_nbt(&mut buffer).unwrap_err(),
        DecodeError::UnsupportedNbtTag(0x63)
    );
}

#[test]
fn test_end_typed_nbt_list_with_elements_rejected() {
    let mut buffer = Buffer::from(vec![
        0x0A, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x7F, 0xFF, 0xFF, 0xFF, 0x00,
    ]);
    assert!(matches!(
        skip_nbt(&mut buffer),
        Err(DecodeError::InvalidValue {
            field: "nbt list",
            ..
        })
    ));
}

#[test]
fn test_chunk_with_hostile_heightmap_fails_fast() {
    let mut body = BufferWriter::new();
    body.write_bool(true);
    body.write_bool(true);
    body.write_varint(0);
    body.write_bytes(&[
        0x0A, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x7F, 0xFF, 0xFF, 0xFF, 0x00,
    ]);
    let packed = PackedChunk::new(ChunkPosition::new(0, 0), body.freeze());

    let started = std::time::Instant::now();
    assert!(packed.unpack().is_err());
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
}

// ============================================================================
// CHUNK EDGE CASES
// ============================================================================

#[test]
fn test_truncated_chunk_fails_to_unpack() {
    let packed = PackedChunk::new(ChunkPosition::new(0, 0), Bytes::from_static(&[0x01, 0x01]));
    assert!(packed.unpack().is_err());
}

#[test]
fn test_section_mask_without_section_data_fails() {
    let mut writer = BufferWriter::new();
    writer.write_bool(true);
    writer.write_bool(true);
    writer.write_varint(0b1);
    writer.write_bytes(&[0x0A, 0x00, 0x00, 0x00]);
    for _ in 0..1024 {
        writer.write_i32(0);
    }
    writer.write_varint(0);
    writer.write_varint(0);

    let packed = PackedChunk::new(ChunkPosition::new(2, 2), writer.freeze());
    assert!(packed.unpack().is_err());
}
