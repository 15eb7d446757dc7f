use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;

pub const SERVER_URL_ENV: &str = "LANTERN_SERVER_URL";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
pub const DEFAULT_MODEL_NAME: &str = "glm-4";
pub const DEFAULT_COUNTDOWN_TARGET: &str = "2025-01-01T00:00:00";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const COUNTDOWN_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Values the settings form falls back to when the relay has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDefaults {
    pub api_url: String,
    pub model_name: String,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
        }
    }
}

/// Local client settings. The endpoint credentials live on the relay, not here.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: Option<String>,
    pub default_api_url: Option<String>,
    pub default_model_name: Option<String>,
    pub countdown_target: Option<String>,
    pub log_level: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: ClientConfig = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Relay base URL: environment first, then the config file, then the default.
    pub fn server_url(&self) -> String {
        self.resolve_server_url(std::env::var(SERVER_URL_ENV).ok())
    }

    fn resolve_server_url(&self, from_env: Option<String>) -> String {
        from_env
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn defaults(&self) -> ConfigDefaults {
        ConfigDefaults {
            api_url: non_blank(&self.default_api_url).unwrap_or(DEFAULT_API_URL).to_string(),
            model_name: non_blank(&self.default_model_name)
                .unwrap_or(DEFAULT_MODEL_NAME)
                .to_string(),
        }
    }

    pub fn countdown_target(&self) -> Result<NaiveDateTime> {
        let raw = non_blank(&self.countdown_target).unwrap_or(DEFAULT_COUNTDOWN_TARGET);
        NaiveDateTime::parse_from_str(raw, COUNTDOWN_FORMAT)
            .map_err(|err| anyhow!("invalid countdown_target {:?}: {}", raw, err))
    }

    pub fn log_level(&self) -> &str {
        non_blank(&self.log_level).unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("lantern-chat").join("config.json"))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
