use crate::error::{Error, Result};
use crate::model::MediaMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "tube-converter";

/// Default User-Agent sent to the video host.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36";
/// Default Accept-Language sent to the video host.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Settings loaded from `<config dir>/tube-converter/config.toml`.
///
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where finished files go unless the user picks another folder.
    pub download_dir: PathBuf,
    /// How often the UI drains the progress queue, in milliseconds.
    pub poll_interval_ms: u64,
    /// Cookie file passed to yt-dlp when it exists (relative to the working directory).
    pub credential_file: PathBuf,
    /// yt-dlp executable name searched on PATH.
    pub yt_dlp_binary: String,
    /// Transcoder executable name searched on PATH.
    pub transcoder_binary: String,
    /// Transcoder file name checked in the working directory when PATH has none.
    pub transcoder_local_fallback: PathBuf,
    pub user_agent: String,
    pub accept_language: String,
    /// Mode selected at startup.
    pub default_mode: MediaMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        let local_ffmpeg = if cfg!(target_os = "windows") {
            "ffmpeg.exe"
        } else {
            "ffmpeg"
        };
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from("./downloads")),
            poll_interval_ms: 100,
            credential_file: PathBuf::from("cookies.txt"),
            yt_dlp_binary: "yt-dlp".to_string(),
            transcoder_binary: "ffmpeg".to_string(),
            transcoder_local_fallback: PathBuf::from(local_ffmpeg),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            default_mode: MediaMode::Video,
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(Error::NoUserDir)?;
    Ok(base.join(APP_DIR).join("config.toml"))
}

/// Load `path`, writing a default file there first if none exists.
pub fn load_or_init_at(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Load configuration from the per-user config directory.
pub fn load_or_init() -> Result<AppConfig> {
    load_or_init_at(&config_path()?)
}
