//! # mc-protocol
//!
//! Client-side Minecraft protocol engine (Java Edition 1.16.1, protocol 736).
//!
//! ## Layers
//! Inbound bytes flow bottom to top, outbound bytes top to bottom:
//!
//! ```text
//! socket -> decrypt (AES-CFB8) -> frame (VarInt length) -> decompress (zlib)
//!        -> dispatch by (state, packet id) -> handler
//! ```
//!
//! ## Modules
//! - [`codec`]: VarInt/VarLong, strings, positions and the read/write buffers
//! - [`pipeline`]: framing, compression and encryption layers
//! - [`protocol`]: connection states, packets, the registry and dispatch
//! - [`transport`]: the TCP socket task
//! - [`connection`]: one client session tying everything together
//! - [`world`]: chunk storage and terrain download tracking
//! - [`event`]: connection lifecycle notifications
//! - [`config`]: TOML/environment configuration
//! - [`utils`]: logging setup, metrics and timeouts
//!
//! ## Example
//! ```rust,no_run
//! use mc_protocol::config::NetworkConfig;
//! use mc_protocol::connection::Connection;
//! use mc_protocol::event::{Event, EventBus};
//! use mc_protocol::protocol::{PacketRegistry, SessionHandler};
//! use mc_protocol::world::World;
//! use std::sync::{Arc, RwLock};
//!
//! # async fn run() -> mc_protocol::error::Result<()> {
//! let config = NetworkConfig::from_env()?;
//! config.validate_strict()?;
//!
//! let events = EventBus::new(config.client.event_capacity);
//! let world = Arc::new(RwLock::new(World::new(&config.world, events.clone())));
//! let connection = Connection::new(
//!     config.client.clone(),
//!     Arc::new(PacketRegistry::v1_16_1()),
//!     events.clone(),
//! );
//! connection.set_handler(SessionHandler::new(world))?;
//!
//! let mut updates = events.subscribe();
//! connection.connect()?;
//! connection.login("Steve")?;
//! while let Ok(event) = updates.recv().await {
//!     if let Event::Disconnected { reason } = event {
//!         println!("disconnected: {reason}");
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod protocol;
pub mod transport;
pub mod utils;
pub mod world;

pub use config::NetworkConfig;
pub use connection::Connection;
pub use error::{DecodeError, ProtocolError, Result};
pub use event::{Event, EventBus};
pub use protocol::{ConnectionState, PacketRegistry};
pub use world::World;
