//! Nexus integration test harness.
//!
//! Every test starts its own in-process broker on an ephemeral loopback
//! port and talks to it over real TCP sockets, the way sensor nodes do.
//!
//!   cargo test --test integration

mod disconnect;
mod registration;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast as shutdown;

use nexus_core::config::BrokerConfig;
use nexus_services::{Broker, DashboardFeed, NodeListener};

// ── Harness ───────────────────────────────────────────────────────────────────

/// How long a node waits for a message that should arrive.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);
/// How long a node listens to be sure nothing arrives.
pub const QUIET_PERIOD: Duration = Duration::from_millis(150);

pub struct TestBroker {
    pub broker: Broker,
    pub feed: DashboardFeed,
    pub addr: SocketAddr,
    shutdown_tx: shutdown::Sender<()>,
}

impl TestBroker {
    pub async fn start() -> Self {
        Self::start_with(BrokerConfig::default()).await
    }

    pub async fn start_with(config: BrokerConfig) -> Self {
        let feed = DashboardFeed::new(64);
        let broker = Broker::new(config, Arc::new(feed.clone()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, _) = shutdown::channel(1);
        tokio::spawn(NodeListener::new(listener, broker.clone(), shutdown_tx.subscribe()).run());
        Self {
            broker,
            feed,
            addr,
            shutdown_tx,
        }
    }

    pub async fn connect(&self) -> TestNode {
        TestNode::connect(self.addr).await.expect("connect to broker")
    }

    /// Poll until `cond` holds, or fail the test.
    pub async fn wait_until(&self, what: &str, cond: impl Fn(&Broker) -> bool) {
        for _ in 0..200 {
            if cond(&self.broker) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for: {what}");
    }

    pub async fn wait_for_nodes(&self, n: usize) {
        self.wait_until(&format!("{n} registered nodes"), |b| b.registry().len() == n)
            .await;
    }

    pub fn hostnames(&self) -> Vec<String> {
        self.broker
            .registry()
            .snapshot()
            .iter()
            .map(|n| n.hostname().to_owned())
            .collect()
    }
}

impl Drop for TestBroker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// One simulated sensor node.
pub struct TestNode {
    stream: BufReader<TcpStream>,
}

impl TestNode {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connect {addr}"))?;
        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    pub async fn send(&mut self, frame: &str) -> Result<()> {
        self.stream.get_mut().write_all(frame.as_bytes()).await?;
        self.stream.get_mut().flush().await?;
        Ok(())
    }

    /// Send `frame` terminated with a newline.
    pub async fn send_line(&mut self, frame: &str) -> Result<()> {
        self.send(&format!("{frame}\n")).await
    }

    /// Read one `ct-...*` introduction notice.
    pub async fn notice(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let n = tokio::time::timeout(RECV_TIMEOUT, self.stream.read_until(b'*', &mut buf))
            .await
            .context("timed out waiting for notice")??;
        if n == 0 {
            bail!("connection closed before notice");
        }
        Ok(String::from_utf8(buf)?)
    }

    /// Read exactly `len` bytes.
    pub async fn recv_exact(&mut self, len: usize) -> Result<String> {
        let mut buf = vec![0u8; len];
        tokio::time::timeout(RECV_TIMEOUT, self.stream.read_exact(&mut buf))
            .await
            .context("timed out waiting for data")??;
        Ok(String::from_utf8(buf)?)
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) -> Result<()> {
        let mut byte = [0u8; 1];
        match tokio::time::timeout(QUIET_PERIOD, self.stream.read(&mut byte)).await {
            Err(_) => Ok(()),
            Ok(Ok(0)) => bail!("connection closed"),
            Ok(Ok(_)) => bail!("unexpected data: {:?}", byte[0] as char),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    /// Wait for the broker to close the connection.
    pub async fn expect_closed(&mut self) -> Result<()> {
        let mut rest = Vec::new();
        tokio::time::timeout(RECV_TIMEOUT, self.stream.read_to_end(&mut rest))
            .await
            .context("broker did not close the connection")??;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// The harness itself: a broker comes up and accepts a connection.
#[tokio::test]
async fn test_broker_accepts_connections() {
    let broker = TestBroker::start().await;
    let _node = broker.connect().await;
    broker
        .wait_until("connection tracked", |b| b.connections().len() == 1)
        .await;
    assert!(broker.broker.registry().is_empty());
}
