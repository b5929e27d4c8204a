//! Configuration system for Nexus.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $NEXUS_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/nexus/config.toml
//!   3. ~/.config/nexus/config.toml

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NexusConfig {
    pub network: NetworkConfig,
    pub broker: BrokerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP address node connections are accepted on.
    pub listen_addr: SocketAddr,
    /// Address of the operator/dashboard HTTP API.
    pub api_addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub frame_mode: FrameMode,
    /// Longest delimited frame accepted, in bytes.
    pub max_frame_len: usize,
    /// Per-connection outbound queue depth. Overflow drops the message.
    pub outbound_queue: usize,
    pub departure_match: DepartureMatch,
    pub reregistration: Reregistration,
    /// Remove a node from the registry when its connection drops,
    /// even without a departure message.
    pub purge_on_disconnect: bool,
}

/// How inbound bytes are cut into control messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameMode {
    /// Frames end at `\n` or `*`. Bytes left over at EOF are a final frame.
    #[default]
    Delimited,
    /// Every socket read is one message. For nodes that never terminate
    /// their writes.
    PerRead,
}

/// Which entry a departure message removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepartureMatch {
    /// First registry entry with that hostname, whatever its ip.
    #[default]
    FirstByHostname,
    /// Only an identity registered over the departing connection, and only
    /// if its hostname matches.
    BoundIdentity,
}

/// What a registration for an already-present identity does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reregistration {
    /// Duplicate suppressed; the stored entry is left untouched.
    #[default]
    Keep,
    /// Stored topic sets and connection are replaced in place.
    Replace,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9999)),
            api_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            frame_mode: FrameMode::default(),
            max_frame_len: 4096,
            outbound_queue: 64,
            departure_match: DepartureMatch::default(),
            reregistration: Reregistration::default(),
            purge_on_disconnect: true,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("nexus")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl NexusConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, then apply env overrides.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            NexusConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("NEXUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&NexusConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply NEXUS_* env var overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("NEXUS_NETWORK__LISTEN_ADDR").and_then(|v| v.parse().ok()) {
            self.network.listen_addr = addr;
        }
        if let Some(addr) = lookup("NEXUS_NETWORK__API_ADDR").and_then(|v| v.parse().ok()) {
            self.network.api_addr = addr;
        }
        if let Some(v) = lookup("NEXUS_BROKER__FRAME_MODE") {
            match v.as_str() {
                "delimited" => self.broker.frame_mode = FrameMode::Delimited,
                "per_read" => self.broker.frame_mode = FrameMode::PerRead,
                _ => {}
            }
        }
        if let Some(v) = lookup("NEXUS_BROKER__DEPARTURE_MATCH") {
            match v.as_str() {
                "first_by_hostname" => {
                    self.broker.departure_match = DepartureMatch::FirstByHostname
                }
                "bound_identity" => self.broker.departure_match = DepartureMatch::BoundIdentity,
                _ => {}
            }
        }
        if let Some(v) = lookup("NEXUS_BROKER__REREGISTRATION") {
            match v.as_str() {
                "keep" => self.broker.reregistration = Reregistration::Keep,
                "replace" => self.broker.reregistration = Reregistration::Replace,
                _ => {}
            }
        }
        if let Some(v) = lookup("NEXUS_BROKER__PURGE_ON_DISCONNECT") {
            self.broker.purge_on_disconnect = v == "true" || v == "1";
        }
    }
}
