//! floodmesh wire format: how a `Carrier` is laid out on a TCP stream.
//!
//! Every frame is:
//!
//! ```text
//! u32 BE frame_len | FrameHeader | origin | timestamp | gid | payload
//! ```
//!
//! `frame_len` counts everything after the prefix. The header records the
//! length of each variable field, so a frame is fully self-describing and a
//! reader that consumes exactly `frame_len` bytes stays aligned on the stream
//! even when the frame turns out to be malformed.
//!
//! The header is `#[repr(C)]` with byte-aligned big-endian fields and uses
//! zerocopy derives for allocation-free (de)serialization. There is no
//! unsafe code in this module.

use bytes::Bytes;
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::message::{Carrier, Packet, PacketType, PeerMeta};

// ── Frame Header ──────────────────────────────────────────────────────────────

/// Fixed-size header at the start of every frame body.
///
/// Wire size: 18 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct FrameHeader {
    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// `PacketType` discriminant.
    pub packet_type: u8,

    /// Reserved, must be zero.
    pub flags: u8,

    /// Reserved, must be zero.
    pub reserved: u8,

    /// Sender's current peer count (`PeerMeta::connection_count`).
    pub connection_count: U32<BigEndian>,

    /// Length of the packet origin in bytes.
    pub origin_len: U16<BigEndian>,

    /// Length of the packet timestamp in bytes.
    pub timestamp_len: U16<BigEndian>,

    /// Length of the sender's GID in bytes.
    pub gid_len: U16<BigEndian>,

    /// Length of the opaque payload in bytes.
    pub payload_len: U32<BigEndian>,
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(FrameHeader, [u8; 18]);

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();

// ── Constants ─────────────────────────────────────────────────────────────────

/// Current frame format version.
pub const FRAME_VERSION: u8 = 0x01;

/// Size of the big-endian length prefix in front of every frame.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Maximum frame body size in bytes (header + fields), excluding the prefix.
pub const MAX_FRAME: usize = 1 << 20;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when encoding or interpreting a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("unknown frame version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("unknown packet type: 0x{0:02x}")]
    UnknownPacketType(u8),

    #[error("reserved flags are non-zero: 0x{0:02x}")]
    ReservedFlagsSet(u8),

    #[error("frame length {0} exceeds maximum {MAX_FRAME}")]
    FrameTooLarge(usize),

    #[error("frame length {0} is shorter than the {HEADER_LEN}-byte header")]
    FrameTooShort(usize),

    #[error("header declares {declared} body bytes but frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("{field} is {len} bytes, limit is {limit}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

fn short_len(field: &'static str, value: &str) -> Result<u16, WireError> {
    u16::try_from(value.len()).map_err(|_| WireError::FieldTooLong {
        field,
        len: value.len(),
        limit: u16::MAX as usize,
    })
}

/// Encode a carrier as a complete frame, length prefix included.
pub fn encode_carrier(carrier: &Carrier) -> Result<Vec<u8>, WireError> {
    let packet = &carrier.packet;
    let meta = &carrier.meta;

    let origin_len = short_len("origin", &packet.origin)?;
    let timestamp_len = short_len("timestamp", &packet.timestamp)?;
    let gid_len = short_len("gid", &meta.gid)?;

    let body_len = HEADER_LEN
        + packet.origin.len()
        + packet.timestamp.len()
        + meta.gid.len()
        + packet.payload.len();
    if body_len > MAX_FRAME {
        return Err(WireError::FrameTooLarge(body_len));
    }

    let header = FrameHeader {
        version: FRAME_VERSION,
        packet_type: packet.kind.into(),
        flags: 0,
        reserved: 0,
        connection_count: U32::new(meta.connection_count),
        origin_len: U16::new(origin_len),
        timestamp_len: U16::new(timestamp_len),
        gid_len: U16::new(gid_len),
        // body_len <= MAX_FRAME, so the payload length fits in u32
        payload_len: U32::new(packet.payload.len() as u32),
    };

    let mut out = Vec::with_capacity(FRAME_PREFIX_LEN + body_len);
    out.extend_from_slice(&(body_len as u32).to_be_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(packet.origin.as_bytes());
    out.extend_from_slice(packet.timestamp.as_bytes());
    out.extend_from_slice(meta.gid.as_bytes());
    out.extend_from_slice(&packet.payload);
    Ok(out)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Interpret a length prefix. Rejects frames larger than [`MAX_FRAME`].
pub fn frame_len(prefix: [u8; FRAME_PREFIX_LEN]) -> Result<usize, WireError> {
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME {
        return Err(WireError::FrameTooLarge(len));
    }
    Ok(len)
}

/// Decode a frame body (everything after the length prefix).
pub fn decode_frame(body: &[u8]) -> Result<Carrier, WireError> {
    if body.len() > MAX_FRAME {
        return Err(WireError::FrameTooLarge(body.len()));
    }
    let header =
        FrameHeader::read_from_prefix(body).ok_or(WireError::FrameTooShort(body.len()))?;

    if header.version != FRAME_VERSION {
        return Err(WireError::UnknownVersion(header.version));
    }
    if header.flags != 0 || header.reserved != 0 {
        return Err(WireError::ReservedFlagsSet(header.flags | header.reserved));
    }
    let kind = PacketType::try_from(header.packet_type)?;

    let origin_len = header.origin_len.get() as usize;
    let timestamp_len = header.timestamp_len.get() as usize;
    let gid_len = header.gid_len.get() as usize;
    let payload_len = header.payload_len.get() as usize;

    let rest = &body[HEADER_LEN..];
    let declared = origin_len + timestamp_len + gid_len + payload_len;
    if declared != rest.len() {
        return Err(WireError::LengthMismatch {
            declared,
            actual: rest.len(),
        });
    }

    let (origin, rest) = rest.split_at(origin_len);
    let (timestamp, rest) = rest.split_at(timestamp_len);
    let (gid, payload) = rest.split_at(gid_len);

    Ok(Carrier {
        packet: Packet {
            kind,
            origin: utf8("origin", origin)?,
            payload: Bytes::copy_from_slice(payload),
            timestamp: utf8("timestamp", timestamp)?,
        },
        meta: PeerMeta {
            connection_count: header.connection_count.get(),
            gid: utf8("gid", gid)?,
        },
    })
}

fn utf8(field: &'static str, bytes: &[u8]) -> Result<String, WireError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| WireError::InvalidUtf8(field))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
