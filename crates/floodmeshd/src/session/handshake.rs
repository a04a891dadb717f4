//! One-shot handling of a freshly accepted connection.
//!
//! Reads exactly one carrier. A CONN_REQ is handed to admission and the
//! socket is closed; a CONN_ACK promotes the socket into a peer session.
//! Anything else on a transient socket is a protocol violation.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::time::timeout;

use floodmesh_core::PacketType;
use floodmesh_services::{read_carrier, Peer};

use crate::node::Node;

use super::spawn;

pub async fn handle(node: Node, mut stream: TcpStream, remote: SocketAddr) {
    let carrier = match timeout(node.shared.handshake_timeout, read_carrier(&mut stream)).await {
        Err(_) => {
            tracing::debug!(%remote, "no frame before handshake timeout");
            return;
        }
        Ok(Ok(None)) => return,
        Ok(Err(e)) => {
            tracing::warn!(%remote, error = %e, "unreadable handshake");
            return;
        }
        Ok(Ok(Some(carrier))) => carrier,
    };

    match carrier.packet.kind {
        PacketType::ConnReq => {
            tracing::debug!(%remote, origin = %carrier.packet.origin, "join request received");
            node.admit(carrier.packet).await;
        }
        PacketType::ConnAck => {
            let gid = carrier.meta.gid.clone();
            if gid == node.gid() {
                tracing::info!(%remote, "acknowledgement from self ignored");
                return;
            }
            match node.shared.store.contains_gid(&gid).await {
                Ok(false) => {}
                Ok(true) => {
                    tracing::info!(%remote, peer = %gid, "acknowledgement from existing peer ignored");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot check membership");
                    return;
                }
            }
            tracing::info!(%remote, peer = %gid, "join accepted");
            let (peer, reader) = Peer::from_tcp(stream, carrier.meta);
            spawn(node, peer, reader);
        }
        kind @ (PacketType::Message | PacketType::Blank) => {
            tracing::warn!(%remote, ?kind, "unexpected packet on handshake connection");
        }
    }
}
