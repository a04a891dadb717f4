//! Connection handling: inbound accept, one-shot handshakes, peer sessions.

pub mod handshake;
pub mod listener;
mod peer;

pub(crate) use peer::spawn;
