use crate::*;

/// A node that drops its socket without departing is purged.
#[tokio::test]
async fn test_abrupt_disconnect_purges_node() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;
    let mut b = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    b.send_line("nn-nodeB-10.0.0.2-light-").await?;
    broker.wait_for_nodes(2).await;

    drop(a);
    broker.wait_for_nodes(1).await;
    assert_eq!(broker.hostnames(), vec!["nodeB"]);
    broker
        .wait_until("connection table updated", |b| b.connections().len() == 1)
        .await;
    Ok(())
}

/// With purging off the stale entry stays, as older brokers behaved.
#[tokio::test]
async fn test_disconnect_without_purge_leaves_entry() -> Result<()> {
    let broker = TestBroker::start_with(BrokerConfig {
        purge_on_disconnect: false,
        ..BrokerConfig::default()
    })
    .await;
    let mut a = broker.connect().await;
    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    broker.wait_for_nodes(1).await;

    drop(a);
    broker
        .wait_until("connection gone", |b| b.connections().is_empty())
        .await;
    assert_eq!(broker.broker.registry().len(), 1);
    Ok(())
}

/// Dashboards see every change, including the purge.
#[tokio::test]
async fn test_dashboard_sees_purge() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut feed = broker.feed.subscribe();
    let mut a = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    let table = tokio::time::timeout(RECV_TIMEOUT, feed.recv()).await??;
    assert_eq!(table, "nodeA-10.0.0.1-temp-\n");

    drop(a);
    let table = tokio::time::timeout(RECV_TIMEOUT, feed.recv()).await??;
    assert_eq!(table, "");
    Ok(())
}

/// A node that re-registers over a new socket survives its old socket
/// closing, and keeps receiving introductions on the new one.
#[tokio::test]
async fn test_reconnected_node_survives_stale_socket_closing() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut stale = broker.connect().await;
    stale.send_line("nn-nodeA-10.0.0.1--temp").await?;
    broker.wait_for_nodes(1).await;

    let mut fresh = broker.connect().await;
    fresh.send_line("nn-nodeA-10.0.0.1--temp").await?;
    broker
        .wait_until("registration moved to the new socket", |b| {
            b.connections()
                .iter()
                .filter(|c| !c.identities.is_empty())
                .count()
                == 2
        })
        .await;

    drop(stale);
    broker
        .wait_until("stale connection gone", |b| b.connections().len() == 1)
        .await;
    assert_eq!(broker.hostnames(), vec!["nodeA"]);

    let mut prod = broker.connect().await;
    prod.send_line("nn-prod-10.0.0.3-temp-").await?;
    assert_eq!(fresh.notice().await?, "ct-prod-10.0.0.3-temp-*");
    Ok(())
}
