use crate::*;

/// Losing the only peer leaves an empty, consistent membership.
#[tokio::test]
async fn test_peer_loss_is_detected() -> Result<()> {
    let a = spawn_node().await?;
    let b = spawn_node().await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_peers(&b, &[&a]).await?;

    b.node.shutdown().await;

    wait_for_peers(&a, &[]).await?;
    assert_eq!(a.node.local_meta().connection_count, 0);
    Ok(())
}

/// In a triangle with two desired peers, losing one neighbour makes each
/// survivor issue exactly one replacement join request, which the other
/// survivor sees on the flood path.
#[tokio::test]
async fn test_self_heal_issues_one_request() -> Result<()> {
    let a = spawn_node().await?;
    let b = spawn_node().await?;
    let c = spawn_node().await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_meta_sync(&[&a, &b]).await?;
    c.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b, &c]).await?;
    wait_for_meta_sync(&[&a, &b, &c]).await?;
    c.node.enter_network(&b.gid()).await?;
    wait_for_peers(&b, &[&a, &c]).await?;
    wait_for_peers(&c, &[&a, &b]).await?;

    assert_eq!(a.events.join_requests_from(&b.gid()), 0);
    assert_eq!(b.events.join_requests_from(&a.gid()), 0);

    c.node.shutdown().await;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_peers(&b, &[&a]).await?;

    let (a_events, b_events) = (&a.events, &b.events);
    let (a_gid, b_gid) = (a.gid(), b.gid());
    wait_until("both survivors asked for a replacement", || {
        let (a_gid, b_gid) = (a_gid.clone(), b_gid.clone());
        async move {
            b_events.join_requests_from(&a_gid) == 1 && a_events.join_requests_from(&b_gid) == 1
        }
    })
    .await?;
    settle().await;

    assert_eq!(b.events.join_requests_from(&a.gid()), 1);
    assert_eq!(a.events.join_requests_from(&b.gid()), 1);

    // Neither request can be satisfied by the only remaining neighbour.
    assert_eq!(a.peer_gids().await, vec![b.gid()]);
    assert_eq!(b.peer_gids().await, vec![a.gid()]);
    Ok(())
}

/// A loss that leaves enough peers does not trigger a request.
#[tokio::test]
async fn test_no_heal_above_minimum() -> Result<()> {
    let a = spawn_node_with(test_config(1)).await?;
    let b = spawn_node_with(test_config(1)).await?;
    let c = spawn_node_with(test_config(1)).await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_meta_sync(&[&a, &b]).await?;
    c.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b, &c]).await?;
    wait_for_peers(&b, &[&a]).await?;

    c.node.shutdown().await;
    wait_for_peers(&a, &[&b]).await?;
    settle().await;

    assert_eq!(b.events.join_requests_from(&a.gid()), 0);
    Ok(())
}

/// A node that is shutting down does not try to heal.
#[tokio::test]
async fn test_shutdown_does_not_heal() -> Result<()> {
    let a = spawn_node().await?;
    let b = spawn_node().await?;

    b.node.enter_network(&a.gid()).await?;
    wait_for_peers(&a, &[&b]).await?;
    wait_for_peers(&b, &[&a]).await?;

    a.node.shutdown().await;
    assert!(a.node.is_shutting_down());
    wait_for_peers(&b, &[]).await?;
    settle().await;

    assert_eq!(b.events.join_requests_from(&a.gid()), 0);
    Ok(())
}
