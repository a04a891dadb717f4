//! Overlay packet model.
//!
//! A `Packet` is what the overlay routes. A `Carrier` is what actually goes
//! on the wire: the packet plus the sender's current `PeerMeta`, so every
//! frame doubles as a load report and no separate heartbeat is needed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::wire::WireError;

/// Packet type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    /// Application payload, flooded to every node.
    Message = 0,
    /// Join request, routed toward the least-loaded node.
    ConnReq = 1,
    /// Join acceptance, sent on the connection that becomes the peer link.
    ConnAck = 2,
    /// Empty packet. Exists only to carry fresh meta to neighbours.
    Blank = 3,
}

impl PacketType {
    /// Whether packets of this type go through the dedup-and-handle path.
    /// CONN_ACK and BLANK only refresh peer meta.
    pub fn is_routed(self) -> bool {
        matches!(self, PacketType::Message | PacketType::ConnReq)
    }
}

impl TryFrom<u8> for PacketType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::Message),
            1 => Ok(PacketType::ConnReq),
            2 => Ok(PacketType::ConnAck),
            3 => Ok(PacketType::Blank),
            other => Err(WireError::UnknownPacketType(other)),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(t: PacketType) -> u8 {
        t as u8
    }
}

/// Stable identity of a packet for duplicate suppression.
///
/// BLAKE3 over `origin || 0x00 || timestamp`. Two packets with the same
/// origin and timestamp are the same logical packet regardless of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId(pub [u8; 32]);

impl PacketId {
    /// First 8 bytes, hex encoded. Enough to tell packets apart in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

/// A routed unit of the overlay protocol. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    /// GID of the node that created the packet. Empty for CONN_ACK.
    pub origin: String,
    /// Opaque to the overlay. Interpreted only by the application.
    pub payload: Bytes,
    /// Distinguishes packets from the same origin. See [`fresh_timestamp`].
    pub timestamp: String,
}

impl Packet {
    /// Application message from `origin`.
    pub fn message(origin: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: PacketType::Message,
            origin: origin.into(),
            payload: payload.into(),
            timestamp: fresh_timestamp(),
        }
    }

    /// Join request on behalf of `origin`.
    pub fn conn_req(origin: impl Into<String>) -> Self {
        Self {
            kind: PacketType::ConnReq,
            origin: origin.into(),
            payload: Bytes::new(),
            timestamp: fresh_timestamp(),
        }
    }

    /// Join acceptance. The receiver identifies the sender by the carrier
    /// meta on the same connection, so no origin is set.
    pub fn conn_ack() -> Self {
        Self {
            kind: PacketType::ConnAck,
            origin: String::new(),
            payload: Bytes::new(),
            timestamp: fresh_timestamp(),
        }
    }

    /// Meta-only packet.
    pub fn blank(origin: impl Into<String>) -> Self {
        Self {
            kind: PacketType::Blank,
            origin: origin.into(),
            payload: Bytes::new(),
            timestamp: String::new(),
        }
    }

    pub fn id(&self) -> PacketId {
        let mut h = blake3::Hasher::new();
        h.update(self.origin.as_bytes());
        h.update(&[0u8]);
        h.update(self.timestamp.as_bytes());
        PacketId(*h.finalize().as_bytes())
    }
}

/// What a node says about itself on every frame it sends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMeta {
    /// Number of peers the sender currently holds.
    pub connection_count: u32,
    /// The sender's listen address, used as its identity.
    pub gid: String,
}

impl PeerMeta {
    pub fn new(gid: impl Into<String>, connection_count: u32) -> Self {
        Self {
            connection_count,
            gid: gid.into(),
        }
    }
}

/// The only unit ever placed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carrier {
    pub packet: Packet,
    pub meta: PeerMeta,
}

impl Carrier {
    pub fn new(packet: Packet, meta: PeerMeta) -> Self {
        Self { packet, meta }
    }
}

static STAMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Timestamp string that is distinct for every call within a process.
///
/// Format: `<unix-nanos>-<sequence>`. The sequence keeps two packets
/// created within the same clock tick apart.
pub fn fresh_timestamp() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = STAMP_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{nanos}-{seq}")
}
