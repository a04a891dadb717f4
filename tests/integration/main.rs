//! floodmesh integration test harness.
//!
//! Every test runs its nodes inside the test process, each bound to its own
//! OS-assigned port on 127.0.0.1. Nodes talk over real loopback TCP, so
//! assertions poll with a deadline instead of assuming an order.
//!
//!   cargo test --test integration

mod flooding;
mod handshake;
mod healing;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use floodmesh_core::config::FloodmeshConfig;
use floodmesh_core::{Carrier, Packet, PacketType};
use floodmesh_services::{write_carrier, OverlayEvents, PeerSummary};
use floodmeshd::Node;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const DEADLINE: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(20);

/// Records every callback a node makes.
#[derive(Default)]
pub struct Recorder {
    packets: Mutex<Vec<Packet>>,
    memberships: Mutex<Vec<Vec<String>>>,
}

impl Recorder {
    pub fn packets(&self) -> Vec<Packet> {
        self.packets.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<Packet> {
        self.packets()
            .into_iter()
            .filter(|p| p.kind == PacketType::Message)
            .collect()
    }

    /// CONN_REQs seen on the flood path that were issued by `origin`.
    pub fn join_requests_from(&self, origin: &str) -> usize {
        self.packets()
            .iter()
            .filter(|p| p.kind == PacketType::ConnReq && p.origin == origin)
            .count()
    }

    pub fn membership_changes(&self) -> usize {
        self.memberships.lock().unwrap().len()
    }
}

impl OverlayEvents for Recorder {
    fn on_packet(&self, packet: &Packet) {
        self.packets.lock().unwrap().push(packet.clone());
    }

    fn on_membership_changed(&self, peers: &[PeerSummary]) {
        let gids = peers.iter().map(|p| p.gid.clone()).collect();
        self.memberships.lock().unwrap().push(gids);
    }
}

pub struct TestNode {
    pub node: Node,
    pub events: Arc<Recorder>,
}

impl TestNode {
    pub fn gid(&self) -> String {
        self.node.gid().to_string()
    }

    /// GIDs of current peers, sorted.
    pub async fn peer_gids(&self) -> Vec<String> {
        let mut gids: Vec<String> = self
            .node
            .peers()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.gid)
            .collect();
        gids.sort();
        gids
    }

    pub async fn peers(&self) -> Vec<PeerSummary> {
        self.node.peers().await.unwrap_or_default()
    }
}

pub fn test_config(min_desired_peers: usize) -> FloodmeshConfig {
    let mut config = FloodmeshConfig::default();
    config.network.listen_port = 0;
    config.network.bind_addr = "127.0.0.1".to_string();
    config.network.advertise_host = "127.0.0.1".to_string();
    config.network.handshake_timeout_secs = 2;
    config.overlay.min_desired_peers = min_desired_peers;
    config.api.enabled = false;
    config
}

pub async fn spawn_node() -> Result<TestNode> {
    spawn_node_with(test_config(2)).await
}

pub async fn spawn_node_with(config: FloodmeshConfig) -> Result<TestNode> {
    let events = Arc::new(Recorder::default());
    let node = Node::start(&config, events.clone()).await?;
    Ok(TestNode { node, events })
}

/// Poll `check` until it returns true or the deadline passes.
pub async fn wait_until<F, Fut>(what: &str, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + DEADLINE;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return Ok(());
        }
        tokio::time::sleep(POLL).await;
    }
    bail!("condition not met within {:?}: {what}", DEADLINE)
}

/// Wait until `node` holds exactly the peers in `expected`.
pub async fn wait_for_peers(node: &TestNode, expected: &[&TestNode]) -> Result<()> {
    let mut want: Vec<String> = expected.iter().map(|n| n.gid()).collect();
    want.sort();
    wait_until(&format!("{} peers == {want:?}", node.gid()), || {
        let want = want.clone();
        async move { node.peer_gids().await == want }
    })
    .await
}

/// Wait until every peer of `node` reports the connection count it really has.
pub async fn wait_for_meta_sync(nodes: &[&TestNode]) -> Result<()> {
    for node in nodes {
        wait_until(&format!("{} sees current peer counts", node.gid()), || async move {
            let mut synced = true;
            for summary in node.peers().await {
                let actual = nodes
                    .iter()
                    .find(|n| n.gid() == summary.gid)
                    .map(|n| n.node.local_meta().connection_count);
                synced &= actual == Some(summary.connection_count);
            }
            synced
        })
        .await?;
    }
    Ok(())
}

/// Let in-flight packets settle before asserting that nothing else arrives.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

// ── Raw connections ───────────────────────────────────────────────────────────

/// Open a bare TCP connection to `node`, as a remote node would.
pub async fn connect_raw(node: &TestNode) -> Result<TcpStream> {
    Ok(TcpStream::connect(node.gid()).await?)
}

pub async fn send_raw(stream: &mut TcpStream, carrier: &Carrier) -> Result<()> {
    write_carrier(stream, carrier).await?;
    Ok(())
}

/// Wait for the node to drop its end of `stream`.
pub async fn expect_closed(stream: &mut TcpStream) -> Result<()> {
    let mut buf = [0u8; 256];
    match tokio::time::timeout(DEADLINE, stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => Ok(()),
        Ok(Ok(n)) => bail!("node sent {n} bytes on a connection it should drop"),
        Err(_) => bail!("connection still open after {DEADLINE:?}"),
    }
}
