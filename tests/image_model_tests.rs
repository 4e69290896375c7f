//! Image generation against a mock YtoAI server.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use ytoai::error::YtoAiError;
use ytoai::model::{ImageModel, ImageOptions, ImagePrompt};
use ytoai::options::YtoAiImageOptions;

#[tokio::test]
async fn generates_image_urls_with_the_default_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .and(body_json(json!({"prompt": "a lighthouse at dusk", "model": "cogview-3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1_700_000_000,
            "data": [{"url": "https://img.example.com/1.png"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = image_model(&server)
        .call(ImagePrompt::new("a lighthouse at dusk"))
        .await
        .unwrap();

    assert_eq!(response.generations.len(), 1);
    assert_eq!(
        response.result().unwrap().output.url.as_deref(),
        Some("https://img.example.com/1.png")
    );
    assert!(response.result().unwrap().output.b64_json.is_none());
}

#[tokio::test]
async fn prompt_options_win_over_model_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .and(body_json(json!({
            "prompt": "a fox",
            "model": "cogview-3-plus",
            "user_id": "prompt-user"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"url": "https://img.example.com/fox.png"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = image_model(&server).with_options(YtoAiImageOptions {
        model: Some("cogview-3-plus".into()),
        user: Some("default-user".into()),
    });
    let prompt = ImagePrompt::new("a fox").with_options(ImageOptions {
        user: Some("prompt-user".into()),
        ..Default::default()
    });

    let response = model.call(prompt).await.unwrap();
    assert_eq!(response.generations.len(), 1);
}

#[tokio::test]
async fn empty_body_yields_no_generations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let response = image_model(&server)
        .call(ImagePrompt::new("anything"))
        .await
        .unwrap();

    assert!(response.generations.is_empty());
    assert!(response.result().is_none());
}

#[tokio::test]
async fn server_errors_are_retried_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(IMAGES_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let err = image_model(&server)
        .call(ImagePrompt::new("anything"))
        .await
        .unwrap_err();

    assert!(matches!(err, YtoAiError::Api { status: 502, .. }), "got {err:?}");
}

#[tokio::test]
async fn prompt_without_instructions_is_rejected_locally() {
    let server = MockServer::start().await;

    let err = image_model(&server)
        .call(ImagePrompt::default())
        .await
        .unwrap_err();

    assert!(matches!(err, YtoAiError::InvalidArgument(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}
