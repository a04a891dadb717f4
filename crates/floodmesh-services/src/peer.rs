//! Established peers: one overlay neighbour each.
//!
//! A `Peer` owns the write half of its connection behind an async mutex so
//! the peer's own session and the flood broadcaster never interleave frames.
//! The read half is handed to the session task separately and never shared.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use floodmesh_core::{Carrier, PeerMeta};

use crate::framing::{write_carrier, FrameError};

/// Read half of a peer connection, owned by the peer's session task.
pub type PeerReader = Pin<Box<dyn AsyncRead + Send>>;

type PeerWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Process-local handle for a peer.
///
/// Membership is keyed on this rather than on GID because a peer accepted
/// from a CONN_ACK is only identified by the meta it sent, and meta can
/// change over the life of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PeerId(pub u64);

impl PeerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        PeerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct Peer {
    id: PeerId,
    remote_addr: Option<SocketAddr>,
    meta: RwLock<PeerMeta>,
    writer: Mutex<PeerWriter>,
    established_at: Instant,
}

impl Peer {
    /// Wrap a write half. `meta` is the last thing we know about the peer.
    pub fn new<W>(writer: W, meta: PeerMeta, remote_addr: Option<SocketAddr>) -> Arc<Self>
    where
        W: AsyncWrite + Send + 'static,
    {
        Arc::new(Self {
            id: PeerId::next(),
            remote_addr,
            meta: RwLock::new(meta),
            writer: Mutex::new(Box::pin(writer)),
            established_at: Instant::now(),
        })
    }

    /// Split a TCP connection into a shared peer and its session's reader.
    pub fn from_tcp(stream: TcpStream, meta: PeerMeta) -> (Arc<Self>, PeerReader) {
        let remote_addr = stream.peer_addr().ok();
        let (read, write) = stream.into_split();
        (Self::new(write, meta, remote_addr), Box::pin(read))
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn meta(&self) -> PeerMeta {
        self.meta.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn gid(&self) -> String {
        self.meta.read().unwrap_or_else(PoisonError::into_inner).gid.clone()
    }

    /// Replace the stored meta with what the peer just told us.
    pub fn set_meta(&self, meta: PeerMeta) {
        *self.meta.write().unwrap_or_else(PoisonError::into_inner) = meta;
    }

    /// Send one carrier. Concurrent callers are serialized.
    pub async fn send(&self, carrier: &Carrier) -> Result<(), FrameError> {
        let mut writer = self.writer.lock().await;
        write_carrier(&mut *writer, carrier).await
    }

    /// Shut down the write half. The remote session sees end-of-stream.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::trace!(peer = %self.id, error = %e, "shutdown on closed connection");
        }
    }

    pub fn summary(&self) -> PeerSummary {
        let meta = self.meta();
        PeerSummary {
            id: self.id,
            gid: meta.gid,
            connection_count: meta.connection_count,
            remote_addr: self.remote_addr.map(|a| a.to_string()),
            connected_secs: self.established_at.elapsed().as_secs(),
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("meta", &self.meta())
            .finish()
    }
}

/// Point-in-time view of a peer, handed to callbacks and the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    pub id: PeerId,
    pub gid: String,
    pub connection_count: u32,
    pub remote_addr: Option<String>,
    pub connected_secs: u64,
}
