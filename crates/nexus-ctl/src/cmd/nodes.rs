//! Registry and connection listings.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, get_text};

#[derive(Deserialize)]
struct NodesResponse {
    nodes: Vec<NodeInfo>,
}

#[derive(Deserialize)]
struct NodeInfo {
    identity: Identity,
    capabilities: Vec<String>,
    interests: Vec<String>,
}

#[derive(Deserialize)]
struct Identity {
    hostname: String,
    ip: String,
}

#[derive(Deserialize)]
struct ConnectionsResponse {
    connections: Vec<ConnectionInfo>,
}

#[derive(Deserialize)]
struct ConnectionInfo {
    id: u64,
    peer: String,
    state: String,
    nodes: Vec<String>,
    connected_secs: u64,
}

fn topics(list: &[String]) -> String {
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(", ")
    }
}

pub async fn cmd_nodes(addr: &str) -> Result<()> {
    let resp: NodesResponse = get_json(&format!("{}/nodes", base_url(addr))).await?;

    if resp.nodes.is_empty() {
        println!("No nodes registered.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Registered Nodes ({})", resp.nodes.len());
    println!("═══════════════════════════════════════");

    for n in &resp.nodes {
        println!("  ┌─ {}", n.identity.hostname);
        println!("  │  ip           : {}", n.identity.ip);
        println!("  │  capabilities : {}", topics(&n.capabilities));
        println!("  └─ interests    : {}", topics(&n.interests));
    }

    Ok(())
}

pub async fn cmd_table(addr: &str) -> Result<()> {
    let table = get_text(&format!("{}/table", base_url(addr))).await?;
    print!("{}", table);
    Ok(())
}

pub async fn cmd_connections(addr: &str) -> Result<()> {
    let resp: ConnectionsResponse = get_json(&format!("{}/connections", base_url(addr))).await?;

    if resp.connections.is_empty() {
        println!("No open connections.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Connections ({})", resp.connections.len());
    println!("═══════════════════════════════════════");

    for c in &resp.connections {
        println!("  ┌─ conn-{}", c.id);
        println!("  │  peer   : {}", c.peer);
        println!("  │  state  : {}", c.state);
        println!("  │  nodes  : {}", topics(&c.nodes));
        println!("  └─ uptime : {}s", c.connected_secs);
    }

    Ok(())
}
