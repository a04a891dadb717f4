//! floodmesh-core: packet model, wire format, and configuration.
//! All other floodmesh crates depend on this one.

pub mod config;
pub mod message;
pub mod wire;

pub use message::{fresh_timestamp, Carrier, Packet, PacketId, PacketType, PeerMeta};
