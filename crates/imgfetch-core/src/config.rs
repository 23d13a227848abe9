use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// HTTP transport settings (`[http]` section in config.toml).
///
/// Timeouts are unset by default: the fetch pipeline itself imposes none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout in seconds (None = libcurl default).
    pub connect_timeout_secs: Option<u64>,
    /// Whole-transfer timeout in seconds (None = no limit).
    pub timeout_secs: Option<u64>,
    /// Follow `Location` redirects.
    pub follow_redirects: bool,
    /// Maximum redirects to follow when `follow_redirects` is on.
    pub max_redirections: u32,
    /// Custom `User-Agent` header.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: None,
            timeout_secs: None,
            follow_redirects: true,
            max_redirections: 10,
            user_agent: None,
        }
    }
}

/// Global configuration loaded from `~/.config/imgfetch/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImgfetchConfig {
    /// Default cache root when a fetch does not name one (None = system temp dir).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("imgfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ImgfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ImgfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ImgfetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
