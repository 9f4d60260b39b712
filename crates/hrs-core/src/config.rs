use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// HTTP transport parameters (optional `[http]` section in config.toml).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Abort the stream if no byte arrives for this many seconds.
    /// Batch analysis is slow per record, so keep this generous.
    pub low_speed_time_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            low_speed_time_secs: 120,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_time(&self) -> Duration {
        Duration::from_secs(self.low_speed_time_secs)
    }
}

/// Global configuration loaded from `~/.config/hrs/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrsConfig {
    /// API root, e.g. `http://127.0.0.1:5000/api`.
    pub base_url: String,
    /// Path of the streaming batch endpoint, relative to `base_url`.
    pub batch_upload_path: String,
    /// Upload size ceiling in bytes (files must be strictly smaller).
    pub max_upload_bytes: u64,
    /// How long a finished upload stays visible, in milliseconds.
    pub display_window_ms: u64,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for HrsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            batch_upload_path: "/feedback/batch-upload".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            display_window_ms: 2000,
            http: HttpConfig::default(),
        }
    }
}

impl HrsConfig {
    /// Absolute URL for an API path (`/auth/me` -> `<base_url>/auth/me`).
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        join_endpoint(&self.base_url, path)
    }

    pub fn display_window(&self) -> Duration {
        Duration::from_millis(self.display_window_ms)
    }
}

/// Join an API path onto a base URL, keeping the base's path prefix.
pub fn join_endpoint(base_url: &str, path: &str) -> Result<Url> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base).with_context(|| format!("invalid base URL: {base_url}"))?;
    base.join(path.trim_start_matches('/'))
        .with_context(|| format!("invalid API path: {path}"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hrs")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HrsConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<HrsConfig> {
    if !path.exists() {
        let default_cfg = HrsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: HrsConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
