//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub fn base_url(addr: &str) -> String {
    format!("http://{}/api", addr)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to nexusd at {} (is it running?)", url))?
        .json::<T>()
        .await
        .context("failed to parse response")
}

pub async fn get_text(url: &str) -> Result<String> {
    reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to nexusd at {} (is it running?)", url))?
        .text()
        .await
        .context("failed to read response")
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to nexusd at {} (is it running?)", url))?
        .error_for_status()
        .context("nexusd rejected the request")?
        .json::<R>()
        .await
        .context("failed to parse response")
}
