#![no_main]

use libfuzzer_sys::fuzz_target;
use mc_protocol::pipeline::InboundPipeline;

fuzz_target!(|data: &[u8]| {
    // Plain framing, then framing with the compression layer on
    let mut plain = InboundPipeline::new(1 << 16);
    let _ = plain.process(data);

    let mut compressed = InboundPipeline::new(1 << 16);
    compressed.set_compression_threshold(256);
    for piece in data.chunks(7) {
        if compressed.process(piece).is_err() {
            break;
        }
    }
});
