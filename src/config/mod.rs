//! Configuration (layered: defaults < TOML file < environment).
//!
//! ```toml
//! base_url = "https://yto.bigmodel.cn/api/paas"
//! api_key = "..."
//!
//! [chat]
//! options = { model = "glm-4", temperature = 0.3 }
//!
//! [embedding]
//! metadata_mode = "embed"
//!
//! [image]
//! enabled = false
//!
//! [retry]
//! max_attempts = 5
//! ```

pub mod wiring;

pub use wiring::{YtoAiModels, YtoAiModelsBuilder};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::image::DEFAULT_IMAGE_MODEL;
use crate::api::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL};
use crate::error::YtoAiError;
use crate::model::MetadataMode;
use crate::options::{YtoAiChatOptions, YtoAiEmbeddingOptions, YtoAiImageOptions};
use crate::util::retry::RetryPolicy;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings for all YtoAI models.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YtoAiConfig {
    /// Connection base URL shared by every model.
    pub base_url: String,
    /// Connection API key shared by every model.
    pub api_key: String,
    pub chat: ChatSettings,
    pub embedding: EmbeddingSettings,
    pub image: ImageSettings,
    pub retry: RetryPolicy,
}

impl Default for YtoAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            chat: ChatSettings::default(),
            embedding: EmbeddingSettings::default(),
            image: ImageSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for YtoAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YtoAiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &mask(&self.api_key))
            .field("chat", &self.chat)
            .field("embedding", &self.embedding)
            .field("image", &self.image)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub enabled: bool,
    /// Overrides the connection base URL when non-blank.
    pub base_url: Option<String>,
    /// Overrides the connection API key when non-blank.
    pub api_key: Option<String>,
    /// Fields left out of a config file keep their defaults.
    #[serde(deserialize_with = "chat_options_over_defaults")]
    pub options: YtoAiChatOptions,
}

fn chat_options_over_defaults<'de, D>(deserializer: D) -> Result<YtoAiChatOptions, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parsed = YtoAiChatOptions::deserialize(deserializer)?;
    Ok(YtoAiChatOptions::resolve(
        None,
        Some(&parsed),
        &ChatSettings::default().options,
    ))
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            options: YtoAiChatOptions::builder()
                .model(DEFAULT_CHAT_MODEL.to_string())
                .temperature(0.7)
                .build(),
        }
    }
}

impl fmt::Debug for ChatSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSettings")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask))
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub metadata_mode: MetadataMode,
    pub options: YtoAiEmbeddingOptions,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            metadata_mode: MetadataMode::Embed,
            options: YtoAiEmbeddingOptions::default(),
        }
    }
}

impl fmt::Debug for EmbeddingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingSettings")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask))
            .field("metadata_mode", &self.metadata_mode)
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub options: YtoAiImageOptions,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            options: YtoAiImageOptions {
                model: Some(DEFAULT_IMAGE_MODEL.to_string()),
                user: None,
            },
        }
    }
}

impl fmt::Debug for ImageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSettings")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask))
            .field("options", &self.options)
            .finish()
    }
}

impl YtoAiConfig {
    /// Defaults, then the TOML file at `path` (or the default location),
    /// then the environment. `.env` is loaded if present.
    ///
    /// An explicit `path` must exist; a missing default file is skipped.
    pub fn load(path: Option<&Path>) -> Result<Self, YtoAiError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with the environment only.
    pub fn from_env() -> Result<Self, YtoAiError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, YtoAiError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| {
            YtoAiError::Configuration(format!("{}: {e}", path.display()))
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, YtoAiError> {
        toml::from_str(raw).map_err(|e| YtoAiError::Configuration(e.to_string()))
    }

    /// Overlay values found through `lookup`, keyed by environment
    /// variable name. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), YtoAiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("YTOAI_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("YTOAI_API_KEY") {
            self.api_key = v;
        }

        if let Some(v) = get("YTOAI_CHAT_ENABLED") {
            self.chat.enabled = parse_env("YTOAI_CHAT_ENABLED", &v)?;
        }
        if let Some(v) = get("YTOAI_CHAT_BASE_URL") {
            self.chat.base_url = Some(v);
        }
        if let Some(v) = get("YTOAI_CHAT_API_KEY") {
            self.chat.api_key = Some(v);
        }
        if let Some(v) = get("YTOAI_CHAT_MODEL") {
            self.chat.options.model = Some(v);
        }

        if let Some(v) = get("YTOAI_EMBEDDING_ENABLED") {
            self.embedding.enabled = parse_env("YTOAI_EMBEDDING_ENABLED", &v)?;
        }
        if let Some(v) = get("YTOAI_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Some(v) = get("YTOAI_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = get("YTOAI_EMBEDDING_MODEL") {
            self.embedding.options.model = Some(v);
        }
        if let Some(v) = get("YTOAI_EMBEDDING_DIMENSIONS") {
            self.embedding.options.dimensions = Some(parse_env("YTOAI_EMBEDDING_DIMENSIONS", &v)?);
        }

        if let Some(v) = get("YTOAI_IMAGE_ENABLED") {
            self.image.enabled = parse_env("YTOAI_IMAGE_ENABLED", &v)?;
        }
        if let Some(v) = get("YTOAI_IMAGE_BASE_URL") {
            self.image.base_url = Some(v);
        }
        if let Some(v) = get("YTOAI_IMAGE_API_KEY") {
            self.image.api_key = Some(v);
        }
        if let Some(v) = get("YTOAI_IMAGE_MODEL") {
            self.image.options.model = Some(v);
        }
        if let Some(v) = get("YTOAI_IMAGE_USER") {
            self.image.options.user = Some(v);
        }

        if let Some(v) = get("YTOAI_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_env("YTOAI_RETRY_MAX_ATTEMPTS", &v)?;
        }

        Ok(())
    }
}

/// `~/.ytoai/config.toml`.
pub fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".ytoai"))
        .unwrap_or_else(|| PathBuf::from(".ytoai"))
        .join(CONFIG_FILE_NAME)
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, YtoAiError> {
    value.trim().parse().map_err(|_| {
        YtoAiError::Configuration(format!("Invalid value for {key}: {value}"))
    })
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else if value.is_empty() {
        String::new()
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_service() {
        let config = YtoAiConfig::default();
        assert_eq!(config.base_url, "https://yto.bigmodel.cn/api/paas");
        assert!(config.chat.enabled);
        assert_eq!(config.chat.options.model.as_deref(), Some("glm-4-air"));
        assert_eq!(config.chat.options.temperature, Some(0.7));
        assert_eq!(config.embedding.options.model.as_deref(), Some("embedding-2"));
        assert_eq!(config.embedding.metadata_mode, MetadataMode::Embed);
        assert_eq!(config.image.options.model.as_deref(), Some("cogview-3"));
    }

    #[test]
    fn env_overrides_values() {
        let mut config = YtoAiConfig::default();
        config
            .apply_env(lookup(&[
                ("YTOAI_API_KEY", "root-key"),
                ("YTOAI_CHAT_MODEL", "glm-4"),
                ("YTOAI_EMBEDDING_DIMENSIONS", "512"),
                ("YTOAI_IMAGE_ENABLED", "false"),
                ("YTOAI_RETRY_MAX_ATTEMPTS", "7"),
            ]))
            .unwrap();

        assert_eq!(config.api_key, "root-key");
        assert_eq!(config.chat.options.model.as_deref(), Some("glm-4"));
        assert_eq!(config.embedding.options.dimensions, Some(512));
        assert!(!config.image.enabled);
        assert_eq!(config.retry.max_attempts, 7);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = YtoAiConfig::default();
        config.apply_env(lookup(&[("YTOAI_BASE_URL", "  ")])).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn invalid_env_value_is_a_configuration_error() {
        let mut config = YtoAiConfig::default();
        let err = config
            .apply_env(lookup(&[("YTOAI_CHAT_ENABLED", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, YtoAiError::Configuration(_)));
    }

    #[test]
    fn partial_chat_options_keep_defaults() {
        let config = YtoAiConfig::from_toml_str(
            "api_key = \"k\"\n[chat.options]\nmodel = \"glm-4\"\n",
        )
        .unwrap();
        assert_eq!(config.chat.options.model.as_deref(), Some("glm-4"));
        assert_eq!(config.chat.options.temperature, Some(0.7));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn debug_masks_api_key() {
        let config = YtoAiConfig {
            api_key: "abcd1234efgh5678".into(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("abcd1234efgh5678"));
        assert!(debug.contains("abcd...5678"));
    }
}
