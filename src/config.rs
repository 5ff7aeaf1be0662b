//! Runtime configuration loaded from YAML.
//!
//! Every field has a default, so an absent file or a partial one is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::net::socket::Timeouts;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CARBIDE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "carbide.yaml";
/// Environment variable overriding `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timeouts: TimeoutConfig,
    pub static_files: Option<StaticFilesConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Log connection lifecycle and dispatch at info level.
    pub verbose: bool,
    pub enable_hosting: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            verbose: false,
            enable_hosting: false,
        }
    }
}

/// Per-operation socket timeouts in milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub send_ms: u64,
    pub recv_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            send_ms: 30_000,
            recv_ms: 60_000,
        }
    }
}

impl From<TimeoutConfig> for Timeouts {
    fn from(cfg: TimeoutConfig) -> Self {
        Timeouts {
            send: Duration::from_millis(cfg.send_ms),
            recv: Duration::from_millis(cfg.recv_ms),
        }
    }
}

/// Directory served for requests no hosting integration answers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_index() -> String {
    "index.html".to_string()
}

impl Config {
    /// Loads the file named by `CARBIDE_CONFIG` (or `carbide.yaml`), then
    /// applies the `LISTEN` override. A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut cfg = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("failed to parse YAML configuration")
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts.into()
    }
}
