use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RebirthConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
    pub completion: CompletionConfig,
    pub progression: ProgressionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

/// Local cache location. Always available.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Remote relational store and account database. Only consulted while signed in.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub provider: String,
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Experience needed per level. Constant across levels.
    pub next_level_at: u32,
    /// Percent into level 1 at which an anonymous user is asked to save progress.
    pub signup_prompt_percent: u32,
}

impl Default for RebirthConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            remote: RemoteConfig::default(),
            completion: CompletionConfig::default(),
            progression: ProgressionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_rebirth_dir()
            .join("local.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let db_path = default_rebirth_dir()
            .join("remote.db")
            .to_string_lossy()
            .into_owned();
        Self {
            enabled: true,
            db_path,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            api_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4-turbo-preview".into(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            next_level_at: 100,
            signup_prompt_percent: 20,
        }
    }
}

/// Returns `~/.rebirth/`
pub fn default_rebirth_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".rebirth")
}

/// Returns the default config file path: `~/.rebirth/config.toml`
pub fn default_config_path() -> PathBuf {
    default_rebirth_dir().join("config.toml")
}

impl RebirthConfig {
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
            RebirthConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `REBIRTH_API_KEY` wins over `OPENAI_API_KEY`; either only applies when set.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REBIRTH_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("REBIRTH_REMOTE_DB") {
            self.remote.db_path = val;
        }
        if let Ok(val) = std::env::var("REBIRTH_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("REBIRTH_API_URL") {
            self.completion.api_url = val;
        }
        if let Ok(val) = std::env::var("REBIRTH_MODEL") {
            self.completion.model = val;
        }
        if let Ok(val) =
            std::env::var("REBIRTH_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.completion.api_key = val;
        }
    }

    /// Resolve the local cache path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the remote store path, expanding `~` if needed.
    pub fn resolved_remote_db_path(&self) -> PathBuf {
        expand_tilde(&self.remote.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
