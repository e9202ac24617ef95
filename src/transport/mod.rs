//! # Transport Layer
//!
//! Raw byte transport for a single server connection. Only TCP is
//! supported; everything above this layer works on byte chunks and does not
//! care where they came from.

pub mod socket;

pub use socket::{SocketEvent, SocketLayer, SocketOptions, SocketStatus};
