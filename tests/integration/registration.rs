use crate::*;

use nexus_core::config::Reregistration;
use nexus_core::NodeIdentity;

/// Lone producer: registered, nobody told anything.
#[tokio::test]
async fn test_lone_producer_registers_silently() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    broker.wait_for_nodes(1).await;
    a.expect_silence().await?;
    Ok(())
}

/// Consumer arriving after a producer is introduced to it.
#[tokio::test]
async fn test_consumer_introduced_to_existing_producer() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;
    let mut b = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    broker.wait_for_nodes(1).await;
    b.send_line("nn-nodeB-10.0.0.2--temp").await?;

    assert_eq!(b.notice().await?, "ct-nodeA-10.0.0.1-temp-*");
    a.expect_silence().await?;
    b.expect_silence().await?;
    Ok(())
}

/// Producer arriving after a consumer: the consumer is told.
#[tokio::test]
async fn test_producer_announced_to_waiting_consumer() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut b = broker.connect().await;
    let mut a = broker.connect().await;

    b.send_line("nn-nodeB-10.0.0.2--temp").await?;
    broker.wait_for_nodes(1).await;
    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;

    assert_eq!(b.notice().await?, "ct-nodeA-10.0.0.1-temp-*");
    a.expect_silence().await?;
    Ok(())
}

/// Both sides produce what the other wants: each gets one notice.
#[tokio::test]
async fn test_mutual_interest_introduces_both() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;
    let mut b = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-button").await?;
    broker.wait_for_nodes(1).await;
    b.send_line("nn-nodeB-10.0.0.2-button-temp").await?;

    assert_eq!(b.notice().await?, "ct-nodeA-10.0.0.1-temp-button*");
    assert_eq!(a.notice().await?, "ct-nodeB-10.0.0.2-button-temp*");
    Ok(())
}

/// Several topics; only the overlapping producers are introduced.
#[tokio::test]
async fn test_only_overlapping_producers_are_introduced() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut temp = broker.connect().await;
    let mut light = broker.connect().await;
    let mut noise = broker.connect().await;
    let mut consumer = broker.connect().await;

    temp.send_line("nn-t-10.0.0.1-temp-").await?;
    light.send_line("nn-l-10.0.0.2-light-").await?;
    noise.send_line("nn-n-10.0.0.3-noise-").await?;
    broker.wait_for_nodes(3).await;

    consumer.send_line("nn-c-10.0.0.4--light:temp").await?;
    let mut got = vec![consumer.notice().await?, consumer.notice().await?];
    got.sort();
    assert_eq!(got, vec!["ct-l-10.0.0.2-light-*", "ct-t-10.0.0.1-temp-*"]);
    consumer.expect_silence().await?;
    Ok(())
}

/// Re-registering the same identity keeps one entry and re-sends notices.
#[tokio::test]
async fn test_duplicate_registration_is_idempotent() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;
    let mut b = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    broker.wait_for_nodes(1).await;

    b.send_line("nn-nodeB-10.0.0.2--temp").await?;
    assert_eq!(b.notice().await?, "ct-nodeA-10.0.0.1-temp-*");
    b.send_line("nn-nodeB-10.0.0.2--temp").await?;
    assert_eq!(b.notice().await?, "ct-nodeA-10.0.0.1-temp-*");

    assert_eq!(broker.broker.registry().len(), 2);
    Ok(())
}

/// Default policy: a second registration with other sets leaves the stored
/// entry as it was.
#[tokio::test]
async fn test_reregistration_keeps_first_entry() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    a.send_line("nn-nodeA-10.0.0.1-light-").await?;
    a.expect_silence().await?;

    let stored = broker
        .broker
        .registry()
        .get(&NodeIdentity::new("nodeA", "10.0.0.1"))
        .context("nodeA registered")?;
    assert!(stored.capabilities.contains("temp"));
    assert!(!stored.capabilities.contains("light"));
    assert_eq!(broker.broker.registry().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_reregistration_replace_updates_entry() -> Result<()> {
    let broker = TestBroker::start_with(BrokerConfig {
        reregistration: Reregistration::Replace,
        ..BrokerConfig::default()
    })
    .await;
    let mut a = broker.connect().await;
    let mut b = broker.connect().await;

    b.send_line("nn-nodeB-10.0.0.2--light").await?;
    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    broker.wait_for_nodes(2).await;
    a.send_line("nn-nodeA-10.0.0.1-light-").await?;

    // B wanted light all along and hears about the updated A.
    assert_eq!(b.notice().await?, "ct-nodeA-10.0.0.1-light-*");
    let stored = broker
        .broker
        .registry()
        .get(&NodeIdentity::new("nodeA", "10.0.0.1"))
        .context("nodeA registered")?;
    assert!(stored.capabilities.contains("light"));
    Ok(())
}

/// Malformed frames are dropped and the connection stays usable.
#[tokio::test]
async fn test_malformed_frames_are_ignored() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;

    a.send_line("hello").await?;
    a.send_line("nn-too-few").await?;
    a.send_line("nn-bad-host-10.0.0.1-temp-").await?;
    a.send_line("ct-nodeX-10.0.0.9-temp-").await?;
    a.expect_silence().await?;
    assert!(broker.broker.registry().is_empty());

    a.send_line("nn-nodeA-10.0.0.1-temp-").await?;
    broker.wait_for_nodes(1).await;
    Ok(())
}

/// Frames may be split across writes and several may share one write.
#[tokio::test]
async fn test_frames_split_and_coalesced() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut a = broker.connect().await;

    a.send("nn-nodeA-10.0").await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    a.send(".0.1-temp-\r\nnn-nodeB-10.0.0.2-light-\n").await?;
    broker.wait_for_nodes(2).await;
    assert_eq!(broker.hostnames(), vec!["nodeA", "nodeB"]);
    Ok(())
}

/// Concurrent registrations of one identity never create duplicates.
#[tokio::test]
async fn test_concurrent_registrations_stay_unique() -> Result<()> {
    let broker = TestBroker::start().await;
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let addr = broker.addr;
        tasks.push(tokio::spawn(async move {
            let mut n = TestNode::connect(addr).await?;
            n.send_line("nn-nodeA-10.0.0.1-temp-").await?;
            // Hold the connection until the broker has seen the frame.
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, anyhow::Error>(n)
        }));
    }
    let mut nodes = Vec::new();
    for t in tasks {
        nodes.push(t.await??);
    }

    broker.wait_for_nodes(1).await;
    tokio::time::sleep(QUIET_PERIOD).await;
    assert_eq!(broker.broker.registry().len(), 1);
    Ok(())
}
