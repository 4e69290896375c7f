//! Tests for configuration loading and model wiring.

mod common;

use std::io::Write;
use std::sync::{Mutex, OnceLock};

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use ytoai::config::{YtoAiConfig, YtoAiModels};
use ytoai::error::YtoAiError;
use ytoai::model::{ChatModel, MetadataMode, Prompt};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 4] = [
    "YTOAI_BASE_URL",
    "YTOAI_API_KEY",
    "YTOAI_CHAT_MODEL",
    "YTOAI_IMAGE_ENABLED",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_values_layer_over_defaults() {
    let file = write_config(
        r#"
base_url = "http://localhost:9999/api"
api_key = "file-key"

[chat.options]
model = "glm-4"
max_tokens = 256

[embedding]
metadata_mode = "all"

[embedding.options]
model = "embedding-3"
dimensions = 512

[image]
enabled = false

[retry]
max_attempts = 5
"#,
    );

    let config = YtoAiConfig::from_file(file.path()).unwrap();

    assert_eq!(config.base_url, "http://localhost:9999/api");
    assert_eq!(config.api_key, "file-key");
    assert_eq!(config.chat.options.model.as_deref(), Some("glm-4"));
    assert_eq!(config.chat.options.max_tokens, Some(256));
    assert_eq!(config.chat.options.temperature, Some(0.7));
    assert_eq!(config.embedding.metadata_mode, MetadataMode::All);
    assert_eq!(config.embedding.options.model.as_deref(), Some("embedding-3"));
    assert_eq!(config.embedding.options.dimensions, Some(512));
    assert!(!config.image.enabled);
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.multiplier, 2.0);
}

#[test]
fn malformed_file_is_a_configuration_error() {
    let file = write_config("api_key = [not toml");
    let err = YtoAiConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, YtoAiError::Configuration(_)), "got {err:?}");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = YtoAiConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, YtoAiError::Io(_)), "got {err:?}");
}

#[test]
fn environment_wins_over_file() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    std::env::set_var("YTOAI_CHAT_MODEL", "glm-4-flash");
    std::env::set_var("YTOAI_IMAGE_ENABLED", "true");

    let file = write_config(
        r#"
api_key = "file-key"
[chat.options]
model = "glm-4"
[image]
enabled = false
"#,
    );
    let config = YtoAiConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.api_key, "file-key");
    assert_eq!(config.chat.options.model.as_deref(), Some("glm-4-flash"));
    assert!(config.image.enabled);
}

#[test]
fn wiring_requires_an_api_key() {
    let config = YtoAiConfig::default();
    let err = YtoAiModels::from_config(&config).build().unwrap_err();
    assert_eq!(err.to_string(), "Configuration error: YtoAI API key must be set");
}

#[test]
fn wiring_skips_disabled_sections() {
    let mut config = YtoAiConfig {
        api_key: "key".into(),
        ..Default::default()
    };
    config.embedding.enabled = false;
    config.image.enabled = false;

    let models = YtoAiModels::from_config(&config).build().unwrap();

    assert!(models.chat.is_some());
    assert!(models.embedding.is_none());
    assert!(models.image.is_none());
}

#[test]
fn disabled_sections_do_not_need_credentials() {
    let mut config = YtoAiConfig::default();
    config.chat.enabled = false;
    config.embedding.enabled = false;
    config.image.enabled = true;
    config.image.api_key = Some("image-key".into());

    let models = YtoAiModels::from_config(&config).build().unwrap();
    assert!(models.image.is_some());
}

#[tokio::test]
async fn wired_chat_model_uses_section_connection_and_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("authorization", "Bearer chat-key"))
        .and(body_partial_json(json!({"model": "glm-4", "temperature": 0.2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("c-1", "wired")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = YtoAiConfig::from_toml_str(&format!(
        r#"
base_url = "http://unused.invalid"
api_key = "common-key"

[chat]
base_url = "{}"
api_key = "chat-key"

[chat.options]
model = "glm-4"
temperature = 0.2
"#,
        server.uri()
    ))
    .unwrap();
    config.embedding.enabled = false;
    config.image.enabled = false;

    let models = YtoAiModels::from_config(&config)
        .retry_policy(quick_retry())
        .build()
        .unwrap();
    let chat = models.chat.unwrap();

    let response = chat.call(Prompt::from_text("Hi")).await.unwrap();
    assert_eq!(response.text(), "wired");
}
