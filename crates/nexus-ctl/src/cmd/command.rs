//! Operator commands: shutdown, reboot, refresh.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, post_json_body};

#[derive(Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

#[derive(Deserialize)]
struct CommandResponse {
    command: String,
    delivered: usize,
    skipped: usize,
}

pub async fn cmd_send(addr: &str, command: &str) -> Result<()> {
    let resp: CommandResponse = post_json_body(
        &format!("{}/command", base_url(addr)),
        &CommandRequest { command },
    )
    .await?;

    if resp.command == "refresh" {
        println!("Dashboards refreshed.");
    } else {
        println!(
            "Sent {} to {} node(s); {} skipped.",
            resp.command, resp.delivered, resp.skipped
        );
    }
    Ok(())
}
