//! # Protocol Layer
//!
//! Connection states, packet definitions, the packet registry and the
//! dispatcher that routes decoded packets to a handler.
//!
//! ## Components
//! - **State**: [`ConnectionState`] and its legal transitions
//! - **Packets**: typed clientbound and serverbound packets
//! - **Registry**: `(state, id)` to decoder mappings for one protocol version
//! - **Dispatcher**: id lookup, decoding and handler invocation
//! - **Handler**: [`PacketHandler`], [`HandlerContext`] and [`SessionHandler`]

pub mod dispatcher;
pub mod handler;
pub mod packets;
pub mod registry;
pub mod state;


pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use handler::{EncryptionAck, HandlerContext, PacketHandler, SessionHandler};
pub use packets::{ClientboundPacket, ServerboundPacket};
pub use registry::{PacketRegistry, PROTOCOL_VERSION_1_16_1};
pub use state::{ConnectionState, NextState};
