use futures::StreamExt;
use genai_provider_rs::{
    ChatMessage, HttpConfig, ImageGenerationParams, ModelType, OpenAISetting, ProviderClient, ProviderError,
    ProviderSetting, TextGenerationParams,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai(server: &MockServer) -> ProviderSetting {
    ProviderSetting::OpenAI(OpenAISetting::new("sk-test").with_base_url(format!("{}/v1", server.uri())))
}

fn completion() -> serde_json::Value {
    json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello there"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
    })
}

async fn mount_completion(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn generates_text() {
    let server = MockServer::start().await;
    mount_completion(&server).await;

    let client = ProviderClient::new(&HttpConfig::default()).unwrap();
    let chunk = client
        .generate_text(
            &openai(&server),
            &[ChatMessage::user("hi")],
            &TextGenerationParams::new("gpt-4o-mini"),
        )
        .await
        .expect("chunk");

    assert_eq!(chunk.id, "chatcmpl-42");
    assert_eq!(chunk.get_content(), Some("Hello there"));
    assert_eq!(chunk.usage.map(|u| u.total_tokens), Some(11));
    assert_eq!(chunk.created.timestamp(), 1700000000);
}

#[tokio::test]
async fn stream_is_lazy_and_finite() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion()))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProviderClient::new(&HttpConfig::default()).unwrap();
    let setting = openai(&server);
    let params = TextGenerationParams::new("gpt-4o-mini");
    let messages = [ChatMessage::user("hi")];

    // never polled, so no request is made
    drop(client.stream_text(&setting, &messages, &params).await.unwrap());

    let stream = client.stream_text(&setting, &messages, &params).await.unwrap();
    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].as_ref().unwrap().get_content(), Some("Hello there"));
}

#[tokio::test]
async fn lists_remote_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "gpt-4o", "object": "model"}, {"id": "gpt-4o-mini", "object": "model"}]
        })))
        .mount(&server)
        .await;

    let client = ProviderClient::new(&HttpConfig::default()).unwrap();
    let models = client.list_models(&openai(&server)).await.unwrap();
    let ids: Vec<_> = models.iter().map(|m| m.model_id.as_str()).collect();
    assert_eq!(ids, vec!["gpt-4o", "gpt-4o-mini"]);
    assert!(models.iter().all(|m| m.model_type == ModelType::Text));
}

#[tokio::test]
async fn unreachable_catalog_falls_back_to_builtin_models() {
    let client = ProviderClient::new(&HttpConfig::default()).unwrap();
    let setting = ProviderSetting::OpenAI(OpenAISetting::new("sk-test").with_base_url("http://127.0.0.1:1/v1"));

    let models = client.list_models(&setting).await.expect("fallback catalog");
    let ids: Vec<_> = models.iter().map(|m| m.model_id.as_str()).collect();
    assert_eq!(ids, vec!["gpt-4o", "gpt-4o-mini", "gpt-4-turbo-preview", "gpt-3.5-turbo"]);
}

#[tokio::test]
async fn rejected_catalog_and_missing_key_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProviderClient::new(&HttpConfig::default()).unwrap();
    assert!(!client.list_models(&openai(&server)).await.unwrap().is_empty());

    let keyless = ProviderSetting::OpenAI(OpenAISetting::new("").with_base_url(format!("{}/v1", server.uri())));
    assert!(!client.list_models(&keyless).await.unwrap().is_empty());
}

#[tokio::test]
async fn image_generation_is_unsupported() {
    let server = MockServer::start().await;
    let client = ProviderClient::new(&HttpConfig::default()).unwrap();
    let err = client
        .generate_image(&openai(&server), &ImageGenerationParams::new("dall-e-3", "cat"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unsupported { provider: "openai", .. }));
}
