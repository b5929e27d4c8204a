//! nexus-ctl — command-line interface for the Nexus broker.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

fn print_usage() {
    println!("Usage: nexus-ctl [--addr <host:port>] <command>");
    println!();
    println!("Commands:");
    println!("  status        Show broker status");
    println!("  nodes         List registered nodes");
    println!("  table         Print the raw registry table");
    println!("  connections   List open node connections");
    println!("  shutdown      Tell every node to shut down");
    println!("  reboot        Tell every node to reboot");
    println!("  refresh       Re-push the table to dashboards");
    println!();
    println!("Options:");
    println!("  --addr <host:port>   API address (default: {})", DEFAULT_ADDR);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --addr option
    let mut addr = DEFAULT_ADDR.to_string();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--addr" {
            i += 1;
            addr = args.get(i).context("--addr requires a value")?.clone();
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(&addr).await,
        ["nodes"] => cmd::nodes::cmd_nodes(&addr).await,
        ["table"] => cmd::nodes::cmd_table(&addr).await,
        ["connections"] => cmd::nodes::cmd_connections(&addr).await,
        [c @ ("shutdown" | "reboot" | "refresh")] => cmd::command::cmd_send(&addr, c).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
