use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;

use super::{PreparedRequest, Provider, BALANCE_NOT_IMPLEMENTED};
use crate::config::{OpenAISetting, ProviderSetting};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{ensure_success, HttpTransport};
use crate::models::{
    ChatMessage, ImageGenerationParams, ImageGenerationResult, MessageChoice, MessageChunk, TextGenerationParams,
};
use crate::roulette::{default_roulette, KeyRoulette};
use crate::streaming::MessageStream;
use crate::types::{Model, ProviderId, RequestId, TokenUsage};
use crate::utils::{endpoint_url, merge_custom_body, request_headers};

/// Served when the remote catalog cannot be fetched
const FALLBACK_MODELS: [&str; 4] = ["gpt-4o", "gpt-4o-mini", "gpt-4-turbo-preview", "gpt-3.5-turbo"];

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    id: String,
    #[serde(default)]
    created: i64,
    model: String,
    choices: Vec<MessageChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

/// OpenAI-compatible chat completions. No image generation.
#[derive(Clone)]
pub struct OpenAIProvider {
    transport: HttpTransport,
    roulette: Arc<dyn KeyRoulette>,
}

impl OpenAIProvider {
    pub fn new(transport: HttpTransport) -> Self {
        Self::with_roulette(transport, default_roulette())
    }

    pub fn with_roulette(transport: HttpTransport, roulette: Arc<dyn KeyRoulette>) -> Self {
        Self { transport, roulette }
    }

    fn build_chat_request(
        setting: &OpenAISetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
        api_key: &str,
    ) -> ProviderResult<PreparedRequest> {
        let request = ChatCompletionRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            stream: false,
        };
        let body = match serde_json::to_value(&request)? {
            Value::Object(map) => merge_custom_body(map, &params.custom_body),
            other => return Err(ProviderError::Configuration(format!("request is not an object: {other}"))),
        };

        Ok(PreparedRequest {
            url: endpoint_url(&setting.base_url, "chat/completions")?,
            headers: request_headers(&params.custom_headers, api_key)?,
            body: serde_json::to_string(&body)?,
        })
    }

    async fn complete(
        &self,
        setting: &OpenAISetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageChunk> {
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "generate_text",
            provider = ProviderId::OPENAI,
            request_id = %request_id,
            model = %params.model
        );

        self.send_chat(setting, messages, params).instrument(span).await
    }

    async fn send_chat(
        &self,
        setting: &OpenAISetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageChunk> {
        let key = self.roulette.next(setting.id, &setting.api_key)?;
        let request = Self::build_chat_request(setting, messages, params, &key)?;
        tracing::debug!(url = %request.url, messages = messages.len(), "sending chat request");

        let resp = self
            .transport
            .post(&setting.proxy, &request.url, request.headers, request.body)
            .await?;
        let resp = ensure_success(resp).await?;
        let completion: ChatCompletionResponse = serde_json::from_str(&resp.text().await?)?;
        if completion.choices.is_empty() {
            return Err(ProviderError::InvalidResponse("No choices in response".to_string()));
        }

        Ok(MessageChunk {
            id: completion.id,
            model: completion.model,
            created: DateTime::from_timestamp(completion.created, 0).unwrap_or_else(Utc::now),
            choices: completion.choices,
            usage: completion.usage,
        })
    }

    async fn fetch_models(&self, setting: &OpenAISetting) -> ProviderResult<Vec<Model>> {
        let key = self.roulette.next(setting.id, &setting.api_key)?;
        let url = endpoint_url(&setting.base_url, "models")?;

        let resp = self
            .transport
            .get(&setting.proxy, &url, request_headers(&[], &key)?)
            .await?;
        let resp = ensure_success(resp).await?;
        let models: ModelsResponse = serde_json::from_str(&resp.text().await?)?;
        tracing::debug!(count = models.data.len(), "listed models");

        Ok(models.data.into_iter().map(|m| Model::chat(m.id)).collect())
    }
}

fn fallback_models() -> Vec<Model> {
    FALLBACK_MODELS.iter().map(|id| Model::chat(*id)).collect()
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderId::OPENAI)
    }

    /// Remote catalog, or the built-in list when the fetch fails.
    async fn list_models(&self, setting: &ProviderSetting) -> ProviderResult<Vec<Model>> {
        let setting = setting.as_openai()?;
        match self.fetch_models(setting).await {
            Ok(models) => Ok(models),
            Err(e) => {
                tracing::warn!(provider = %setting.name, error = %e, "model catalog unavailable, using built-in list");
                Ok(fallback_models())
            }
        }
    }

    async fn get_balance(&self, setting: &ProviderSetting) -> ProviderResult<String> {
        setting.as_openai()?;
        Ok(BALANCE_NOT_IMPLEMENTED.to_string())
    }

    async fn generate_text(
        &self,
        setting: &ProviderSetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageChunk> {
        let setting = setting.as_openai()?;
        self.complete(setting, messages, params).await
    }

    /// Yields the whole completion as a single chunk once polled.
    async fn stream_text(
        &self,
        setting: &ProviderSetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageStream> {
        let setting = setting.as_openai()?.clone();
        let this = self.clone();
        let messages = messages.to_vec();
        let params = params.clone();

        let stream = futures::stream::once(async move { this.complete(&setting, &messages, &params).await });
        Ok(Box::pin(stream))
    }

    async fn generate_image(
        &self,
        setting: &ProviderSetting,
        _params: &ImageGenerationParams,
    ) -> ProviderResult<ImageGenerationResult> {
        setting.as_openai()?;
        Err(ProviderError::Unsupported {
            provider: ProviderId::OPENAI,
            operation: "image generation",
        })
    }
}
