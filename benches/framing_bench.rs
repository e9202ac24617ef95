#![allow(clippy::unwrap_used, clippy::uninlined_format_args)]

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use mc_protocol::pipeline::{InboundPipeline, OutboundPipeline, PacketFramer};

const MAX_PACKET: usize = 2_097_151;

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    let sizes = [16usize, 256, 4096, 65536];

    for &size in &sizes {
        let payload = vec![0x5Au8; size];
        let framer = PacketFramer::new(MAX_PACKET);
        let wire: Vec<u8> = (0..32)
            .flat_map(|_| framer.frame_outbound(&payload).unwrap().to_vec())
            .collect();

        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_function(format!("frame_32x{}b_single_read", size), |b| {
            b.iter(|| {
                let mut framer = PacketFramer::new(MAX_PACKET);
                let frames = framer.process_inbound(&wire).unwrap();
                assert_eq!(frames.len(), 32);
            })
        });
        group.bench_function(format!("frame_32x{}b_1k_reads", size), |b| {
            b.iter(|| {
                let mut framer = PacketFramer::new(MAX_PACKET);
                let mut count = 0;
                for piece in wire.chunks(1024) {
                    count += framer.process_inbound(piece).unwrap().len();
                }
                assert_eq!(count, 32);
            })
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let secret = [7u8; 16];
    let sizes = [64usize, 1024, 16384];

    for &size in &sizes {
        // Compressible, like most chunk and entity payloads
        let payload = Bytes::from((0..size).map(|i| (i % 13) as u8).collect::<Vec<_>>());
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("outbound_compressed_encrypted_{}b", size), |b| {
            let mut outbound = OutboundPipeline::new(MAX_PACKET);
            outbound.set_compression_threshold(256);
            outbound.enable_encryption(&secret).unwrap();
            b.iter_batched(
                || payload.clone(),
                |p| {
                    let _ = outbound.encode(p).unwrap();
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("inbound_compressed_encrypted_{}b", size), |b| {
            b.iter_batched(
                || {
                    let mut outbound = OutboundPipeline::new(MAX_PACKET);
                    outbound.set_compression_threshold(256);
                    outbound.enable_encryption(&secret).unwrap();
                    outbound.encode(payload.clone()).unwrap()
                },
                |wire| {
                    let mut inbound = InboundPipeline::new(MAX_PACKET);
                    inbound.set_compression_threshold(256);
                    inbound.enable_encryption(&secret).unwrap();
                    let packets = inbound.process(&wire).unwrap();
                    assert_eq!(packets[0].len(), size);
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_framing, bench_pipeline);
criterion_main!(benches);
