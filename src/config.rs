use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable holding the generative-model API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FlowFriendConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub chat: ChatConfig,
    pub tracking: TrackingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Usually left unset in the file and supplied through `GEMINI_API_KEY`.
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackingConfig {
    pub default_limit: usize,
    pub prediction_window: usize,
    pub insights_window: usize,
    /// Seconds between store re-reads in live views. `0` disables polling.
    pub refresh_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            host: "0.0.0.0".into(),
            port: 3050,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_flowfriend_dir()
            .join("flowfriend.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_limit: 30,
            prediction_window: 90,
            insights_window: 30,
            refresh_interval_secs: 5,
        }
    }
}

impl ChatConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl TrackingConfig {
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

impl ModelConfig {
    /// The configured API key, if it is present and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Returns `~/.flowfriend/`
pub fn default_flowfriend_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".flowfriend")
}

/// Returns the default config file path: `~/.flowfriend/config.toml`
pub fn default_config_path() -> PathBuf {
    default_flowfriend_dir().join("config.toml")
}

impl FlowFriendConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            FlowFriendConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (FLOWFRIEND_DB, FLOWFRIEND_LOG_LEVEL,
    /// FLOWFRIEND_MODEL, GEMINI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FLOWFRIEND_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("FLOWFRIEND_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("FLOWFRIEND_MODEL") {
            self.model.model = val;
        }
        if let Ok(val) = std::env::var(API_KEY_ENV) {
            self.model.api_key = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
