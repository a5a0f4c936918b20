use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration for askbot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub channels: ChannelsConfig,
    pub providers: ProvidersConfig,
    pub tools: ToolsConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Names of the credentials that are still unset.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.channels.telegram.token.is_empty() {
            missing.push("TELEGRAM_BOT_TOKEN");
        }
        if self.providers.gemini.api_key.is_empty() {
            missing.push("GEMINI_API_KEY");
        }
        if self.tools.web_search.api_key.is_empty() {
            missing.push("SERPAPI_KEY");
        }
        missing
    }

    /// Parsed storage backend selection.
    pub fn storage_backend(&self) -> Result<StorageBackend, ConfigError> {
        StorageBackend::parse(&self.storage.backend)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelsConfig {
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub token: String,
    pub allow_from: Vec<String>,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: String::new(),
            allow_from: Vec::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub text_model: String,
    pub vision_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            text_model: "gemini-1.5-flash".to_string(),
            vision_model: "gemini-1.5-flash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    pub web_search: WebSearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSearchConfig {
    pub api_key: String,
    pub api_base: String,
    pub max_links: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://serpapi.com/search".to_string(),
            max_links: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// `mongodb` or `memory`.
    pub backend: String,
    pub mongodb_uri: String,
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "mongodb".to_string(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database: "telegram_bot".to_string(),
        }
    }
}

/// Storage backend selected by `storage.backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StorageBackend::MongoDb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend '{}'",
                other
            ))),
        }
    }
}

/// Get the data directory path (~/.askbot).
pub fn get_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".askbot")
}

/// Get the default config file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.json")
}

/// Load configuration from file or fall back to defaults.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config from {}: {}", path.display(), e);
                    tracing::warn!("Using default configuration.");
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Load configuration from the environment, overlaying the config file.
///
/// A `.env` file in the working directory is read first. `ASKBOT_CONFIG` may
/// hold a complete JSON config; otherwise individual variables are applied on
/// top of the file config.
pub fn load_config_from_env() -> Config {
    dotenvy::dotenv().ok();

    if let Ok(json) = std::env::var("ASKBOT_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to parse ASKBOT_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = load_config(None);
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    cfg
}

/// Apply environment overrides using the given lookup.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    // Telegram
    if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
        cfg.channels.telegram.token = v;
        cfg.channels.telegram.enabled = true;
    }
    if let Some(v) = get("TELEGRAM_ALLOW_FROM") {
        cfg.channels.telegram.allow_from = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Storage
    if let Some(v) = get("MONGODB_URI") {
        cfg.storage.mongodb_uri = v;
    }
    if let Some(v) = get("MONGODB_DATABASE") {
        cfg.storage.database = v;
    }
    if let Some(v) = get("ASKBOT_STORAGE") {
        cfg.storage.backend = v;
    }

    // Gemini (GOOGLE_API_KEY accepted as an alias)
    if let Some(v) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
        cfg.providers.gemini.api_key = v;
    }
    if let Some(v) = get("GEMINI_TEXT_MODEL") {
        cfg.providers.gemini.text_model = v;
    }
    if let Some(v) = get("GEMINI_VISION_MODEL") {
        cfg.providers.gemini.vision_model = v;
    }

    // Web search
    if let Some(v) = get("SERPAPI_KEY") {
        cfg.tools.web_search.api_key = v;
    }
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)
        .map_err(|e| ConfigError::Invalid(format!("cannot write {}: {}", path.display(), e)))?;
    Ok(())
}
