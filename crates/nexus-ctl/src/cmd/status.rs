//! Broker status.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    listen_addr: String,
    nodes: usize,
    connections: usize,
    dashboards: usize,
}

pub async fn cmd_status(addr: &str) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(addr))).await?;

    println!("═══════════════════════════════════════");
    println!("  Nexus Broker Status");
    println!("═══════════════════════════════════════");
    println!("  Listening on     : {}", resp.listen_addr);
    println!("  Registered nodes : {}", resp.nodes);
    println!("  Connections      : {}", resp.connections);
    println!("  Dashboards       : {}", resp.dashboards);

    Ok(())
}
