#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mc_protocol::protocol::{ConnectionState, Dispatcher, PacketRegistry};
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let dispatcher = Dispatcher::new(Arc::new(PacketRegistry::v1_16_1()));
    let payload = Bytes::copy_from_slice(data);

    // Decoding must fail cleanly in every state, never panic
    for state in [
        ConnectionState::Status,
        ConnectionState::Login,
        ConnectionState::Play,
    ] {
        let _ = dispatcher.decode(state, payload.clone());
    }
});
