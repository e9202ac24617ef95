use super::Encode;
use crate::codec::BufferWriter;
use crate::protocol::state::NextState;

/// First packet of every connection; selects status or login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl Encode for Handshake {
    fn encode(&self, writer: &mut BufferWriter) {
        writer.write_varint(self.protocol_version);
        writer.write_string(&self.server_address);
        writer.write_u16(self.server_port);
        writer.write_varint(self.next_state.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_layout() {
        let handshake = Handshake {
            protocol_version: 736,
            server_address: "localhost".to_string(),
            server_port: 25565,
            next_state: NextState::Login,
        };
        let mut writer = BufferWriter::new();
        handshake.encode(&mut writer);

        let mut expected = vec![0xE0, 0x05, 9];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD, 0x02]);
        assert_eq!(writer.as_slice(), &expected[..]);
    }
}
