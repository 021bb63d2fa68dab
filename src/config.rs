//! Client configuration: server coordinates and transfer tuning, stored
//! as TOML under the XDG config directory.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Settings loaded from `~/.config/jenkins-artifacts/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server, e.g. `http://ci.example.com:8080`.
    pub base_url: String,
    /// Account for HTTP basic auth; anonymous when absent.
    #[serde(default)]
    pub username: Option<String>,
    /// API token paired with `username`.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Seconds allowed for connection establishment.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a whole buffered request (fingerprint lookups).
    pub timeout_secs: u64,
    /// Verify TLS certificates. Disable only for self-signed test servers.
    pub ssl_verify: bool,
    /// Receive-buffer size for streamed downloads; 1 KiB when absent.
    #[serde(default)]
    pub download_chunk_bytes: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: None,
            api_token: None,
            connect_timeout_secs: 15,
            timeout_secs: 30,
            ssl_verify: true,
            download_chunk_bytes: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jenkins-artifacts")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ClientConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ClientConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ClientConfig = toml::from_str(&data)?;
    Ok(cfg)
}
