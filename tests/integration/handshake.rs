use crate::*;

use std::time::Instant;

use tokio::io::AsyncWriteExt;

use floodmesh_core::wire::{encode_carrier, FRAME_PREFIX_LEN};
use floodmesh_core::PeerMeta;

/// A frame whose packet type byte names no known packet.
fn corrupt_frame(carrier: &Carrier) -> Result<Vec<u8>> {
    let mut frame = encode_carrier(carrier)?;
    frame[FRAME_PREFIX_LEN + 1] = 0xee;
    Ok(frame)
}

/// Nothing reached the application and the peer set never changed.
fn assert_untouched(node: &TestNode) {
    assert!(node.events.packets().is_empty(), "callback fired");
    assert_eq!(node.events.membership_changes(), 0);
}

#[tokio::test]
async fn test_message_on_fresh_connection_is_dropped() -> Result<()> {
    let a = spawn_node().await?;
    let mut stream = connect_raw(&a).await?;

    let origin = "127.0.0.1:1";
    send_raw(
        &mut stream,
        &Carrier::new(Packet::message(origin, "early"), PeerMeta::new(origin, 0)),
    )
    .await?;
    expect_closed(&mut stream).await?;
    settle().await;

    assert!(a.peers().await.is_empty());
    assert_untouched(&a);
    Ok(())
}

#[tokio::test]
async fn test_blank_on_fresh_connection_is_dropped() -> Result<()> {
    let a = spawn_node().await?;
    let mut stream = connect_raw(&a).await?;

    let origin = "127.0.0.1:1";
    send_raw(
        &mut stream,
        &Carrier::new(Packet::blank(origin), PeerMeta::new(origin, 4)),
    )
    .await?;
    expect_closed(&mut stream).await?;
    settle().await;

    assert!(a.peers().await.is_empty());
    assert_untouched(&a);
    Ok(())
}

#[tokio::test]
async fn test_connection_closed_before_any_frame() -> Result<()> {
    let a = spawn_node().await?;
    let mut stream = connect_raw(&a).await?;

    stream.shutdown().await?;
    expect_closed(&mut stream).await?;
    settle().await;

    assert!(a.peers().await.is_empty());
    assert_untouched(&a);
    Ok(())
}

#[tokio::test]
async fn test_undecodable_handshake_closes_connection() -> Result<()> {
    let a = spawn_node().await?;
    let mut stream = connect_raw(&a).await?;

    let origin = "127.0.0.1:1";
    let frame = corrupt_frame(&Carrier::new(
        Packet::conn_req(origin),
        PeerMeta::new(origin, 0),
    ))?;
    stream.write_all(&frame).await?;
    expect_closed(&mut stream).await?;
    settle().await;

    assert!(a.peers().await.is_empty());
    assert_untouched(&a);
    Ok(())
}

#[tokio::test]
async fn test_silent_connection_times_out() -> Result<()> {
    let mut config = test_config(2);
    config.network.handshake_timeout_secs = 1;
    let a = spawn_node_with(config).await?;

    let opened = Instant::now();
    let mut stream = connect_raw(&a).await?;
    expect_closed(&mut stream).await?;

    assert!(opened.elapsed() >= Duration::from_millis(900));
    assert!(a.peers().await.is_empty());
    assert_untouched(&a);
    Ok(())
}

#[tokio::test]
async fn test_acknowledgement_carrying_own_gid_is_ignored() -> Result<()> {
    let a = spawn_node().await?;
    let mut stream = connect_raw(&a).await?;

    send_raw(
        &mut stream,
        &Carrier::new(Packet::conn_ack(), PeerMeta::new(a.gid(), 0)),
    )
    .await?;
    expect_closed(&mut stream).await?;
    settle().await;

    assert!(a.peers().await.is_empty());
    assert_untouched(&a);
    Ok(())
}

#[tokio::test]
async fn test_acknowledgement_from_existing_peer_is_ignored() -> Result<()> {
    let a = spawn_node().await?;
    let b = spawn_node().await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_peers(&b, &[&a]).await?;
    settle().await;
    let changes = a.events.membership_changes();

    let mut stream = connect_raw(&a).await?;
    send_raw(
        &mut stream,
        &Carrier::new(Packet::conn_ack(), PeerMeta::new(b.gid(), 1)),
    )
    .await?;
    expect_closed(&mut stream).await?;
    settle().await;

    assert_eq!(a.peer_gids().await, vec![b.gid()]);
    assert_eq!(a.events.membership_changes(), changes);
    Ok(())
}

/// A peer that sends one garbled frame keeps its session; the next good
/// frame is delivered and its meta recorded.
#[tokio::test]
async fn test_malformed_frame_does_not_end_session() -> Result<()> {
    let a = spawn_node().await?;
    let remote = "127.0.0.1:1";

    let mut stream = connect_raw(&a).await?;
    send_raw(
        &mut stream,
        &Carrier::new(Packet::conn_ack(), PeerMeta::new(remote, 1)),
    )
    .await?;
    let node = &a;
    wait_until("raw peer registered", || async move {
        node.peer_gids().await == vec![remote.to_string()]
    })
    .await?;

    let garbled = corrupt_frame(&Carrier::new(
        Packet::blank(remote),
        PeerMeta::new(remote, 2),
    ))?;
    stream.write_all(&garbled).await?;
    send_raw(
        &mut stream,
        &Carrier::new(Packet::message(remote, "good"), PeerMeta::new(remote, 3)),
    )
    .await?;

    wait_until("good message delivered", || async move {
        node.events
            .messages()
            .iter()
            .any(|p| &p.payload[..] == b"good")
    })
    .await?;

    let peers = a.peers().await;
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].gid, remote);
    assert_eq!(peers[0].connection_count, 3);
    assert_eq!(a.events.messages().len(), 1);
    Ok(())
}
