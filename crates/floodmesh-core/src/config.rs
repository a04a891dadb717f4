//! Configuration system for floodmesh.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FLOODMESH_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/floodmesh/config.toml
//!   3. ~/.config/floodmesh/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodmeshConfig {
    pub network: NetworkConfig,
    pub overlay: OverlayConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP port to accept overlay connections on. 0 = OS-assigned.
    pub listen_port: u16,
    /// Local address to bind the listener to.
    pub bind_addr: String,
    /// Host part of this node's GID. Peers dial `advertise_host:listen_port`.
    ///
    /// Defaults to loopback. Set it to a routable address whenever nodes run
    /// on more than one host, otherwise a forwarded join request makes the
    /// admitting node dial its own loopback.
    pub advertise_host: String,
    /// Addresses to send a join request to at startup.
    pub bootstrap: Vec<String>,
    /// Seconds a fresh inbound connection may take to deliver its first frame.
    pub handshake_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Losing a peer below this count issues a replacement join request.
    pub min_desired_peers: usize,
    /// Number of packet identities remembered for duplicate suppression.
    pub dedup_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    /// Port of the local HTTP control API, bound on 127.0.0.1.
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_port: 1234,
            bind_addr: "0.0.0.0".to_string(),
            advertise_host: "127.0.0.1".to_string(),
            bootstrap: Vec::new(),
            handshake_timeout_secs: 10,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_desired_peers: 2,
            dedup_capacity: 4096,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9001,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("floodmesh")
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

/// Written above the serialized defaults in a fresh config file.
const DEFAULT_FILE_HEADER: &str = "\
# floodmesh configuration.
#
# network.advertise_host is the host part of this node's GID and the address
# other nodes dial to reach it. The default 127.0.0.1 only works while every
# node runs on this machine: set it to a routable address for multi-host use.

";

// ── Loading ───────────────────────────────────────────────────────────────────

impl FloodmeshConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            FloodmeshConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("FLOODMESH_CONFIG")
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
            let text = toml::to_string_pretty(&FloodmeshConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            let text = format!("{DEFAULT_FILE_HEADER}{text}");
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply FLOODMESH_* overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FLOODMESH_NETWORK__LISTEN_PORT") {
            if let Ok(p) = v.parse() {
                self.network.listen_port = p;
            }
        }
        if let Some(v) = lookup("FLOODMESH_NETWORK__ADVERTISE_HOST") {
            self.network.advertise_host = v;
        }
        if let Some(v) = lookup("FLOODMESH_NETWORK__BOOTSTRAP") {
            self.network.bootstrap = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("FLOODMESH_OVERLAY__MIN_DESIRED_PEERS") {
            if let Ok(n) = v.parse() {
                self.overlay.min_desired_peers = n;
            }
        }
        if let Some(v) = lookup("FLOODMESH_API__ENABLED") {
            self.api.enabled = v == "true" || v == "1";
        }
        if let Some(v) = lookup("FLOODMESH_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
    }
}
