use crate::*;

/// Build a fully connected triangle a-b-c.
///
/// b and c enter through a, then c enters through whichever node it is not
/// yet connected to; that node is at most as loaded as its only other
/// neighbour and accepts c locally.
async fn triangle() -> Result<(TestNode, TestNode, TestNode)> {
    let a = spawn_node().await?;
    let b = spawn_node().await?;
    let c = spawn_node().await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_peers(&b, &[&a]).await?;
    wait_for_meta_sync(&[&a, &b]).await?;

    c.node.enter_network(&a.gid()).await?;
    let joined = &c;
    wait_until("c has a peer", || async move { joined.peer_gids().await.len() == 1 }).await?;
    let missing = if c.peer_gids().await == vec![a.gid()] { &b } else { &a };
    wait_for_meta_sync(&[&a, &b, &c]).await?;

    c.node.enter_network(&missing.gid()).await?;
    wait_for_peers(&a, &[&b, &c]).await?;
    wait_for_peers(&b, &[&a, &c]).await?;
    wait_for_peers(&c, &[&a, &b]).await?;
    wait_for_meta_sync(&[&a, &b, &c]).await?;
    Ok((a, b, c))
}

/// A message from one node reaches every other node exactly once, even
/// though every node hears it from two directions.
#[tokio::test]
async fn test_flood_delivers_once_per_node() -> Result<()> {
    let (a, b, c) = triangle().await?;

    let receipt = a.node.send_message("hello overlay").await?;
    assert_eq!(receipt.delivered_to, 2);
    assert_eq!(receipt.origin, a.gid());

    let (b_events, c_events) = (&b.events, &c.events);
    wait_until("b and c got the message", || async move {
        b_events.messages().len() == 1 && c_events.messages().len() == 1
    })
    .await?;
    settle().await;

    for node in [&b, &c] {
        let messages = node.events.messages();
        assert_eq!(messages.len(), 1, "{} saw duplicates", node.gid());
        assert_eq!(messages[0].origin, a.gid());
        assert_eq!(messages[0].timestamp, receipt.timestamp);
        assert_eq!(&messages[0].payload[..], b"hello overlay");
    }
    assert!(a.events.messages().is_empty(), "sender saw its own message");
    Ok(())
}

/// Every node can originate, and distinct messages are never conflated.
#[tokio::test]
async fn test_flood_from_every_node() -> Result<()> {
    let (a, b, c) = triangle().await?;

    a.node.send_message("from a").await?;
    b.node.send_message("from b").await?;
    c.node.send_message("from c").await?;
    a.node.send_message("from a again").await?;

    let (a_events, b_events, c_events) = (&a.events, &b.events, &c.events);
    wait_until("all messages delivered", || async move {
        a_events.messages().len() == 2
            && b_events.messages().len() == 3
            && c_events.messages().len() == 3
    })
    .await?;
    settle().await;

    assert_eq!(a.events.messages().len(), 2);
    assert_eq!(b.events.messages().len(), 3);
    assert_eq!(c.events.messages().len(), 3);
    Ok(())
}

/// A line a-b-c: c hears a's message only through b's re-broadcast.
#[tokio::test]
async fn test_flood_crosses_intermediate_node() -> Result<()> {
    let a = spawn_node().await?;
    let b = spawn_node().await?;
    let c = spawn_node().await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_meta_sync(&[&a, &b]).await?;

    // b, at equal load with its only neighbour, accepts c itself.
    c.node.enter_network(&b.gid()).await?;
    wait_for_peers(&b, &[&a, &c]).await?;
    wait_for_peers(&c, &[&b]).await?;
    assert_eq!(a.peer_gids().await, vec![b.gid()]);

    a.node.send_message(&b"over the hop"[..]).await?;
    let c_events = &c.events;
    wait_until("c got the message", || async move { c_events.messages().len() == 1 }).await?;
    assert_eq!(b.events.messages().len(), 1);
    assert_eq!(c.events.messages()[0].origin, a.gid());
    Ok(())
}

/// An isolated node can still send; nobody receives it.
#[tokio::test]
async fn test_send_without_peers() -> Result<()> {
    let a = spawn_node().await?;
    let receipt = a.node.send_message("anyone?").await?;
    assert_eq!(receipt.delivered_to, 0);
    Ok(())
}
