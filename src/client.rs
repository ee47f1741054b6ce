use crate::config::{HttpConfig, ProviderSetting};
use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpTransport;
use crate::models::{ChatMessage, ImageGenerationParams, ImageGenerationResult, MessageChunk, TextGenerationParams};
use crate::providers::{OpenAIProvider, PpioProvider, Provider};
use crate::roulette::{default_roulette, KeyRoulette};
use crate::streaming::MessageStream;
use crate::types::Model;
use futures::{Future, StreamExt};
use metrics::{counter, decrement_gauge, histogram, increment_gauge};
use std::sync::Arc;
use std::time::Instant;

/// Entry point for callers: routes each setting to the adapter for its variant
pub struct ProviderClient {
    openai: Arc<dyn Provider>,
    ppio: Arc<dyn Provider>,
}

impl ProviderClient {
    /// Each adapter gets its own round-robin roulette.
    pub fn new(config: &HttpConfig) -> ProviderResult<Self> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self {
            openai: Arc::new(OpenAIProvider::with_roulette(transport.clone(), default_roulette())),
            ppio: Arc::new(PpioProvider::with_roulette(transport, default_roulette())),
        })
    }

    /// Build with a custom key roulette shared by all adapters
    pub fn with_roulette(config: &HttpConfig, roulette: Arc<dyn KeyRoulette>) -> ProviderResult<Self> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self {
            openai: Arc::new(OpenAIProvider::with_roulette(transport.clone(), roulette.clone())),
            ppio: Arc::new(PpioProvider::with_roulette(transport, roulette)),
        })
    }

    /// The adapter serving `setting` for generation. Disabled settings are refused.
    pub fn provider(&self, setting: &ProviderSetting) -> ProviderResult<Arc<dyn Provider>> {
        if !setting.enabled() {
            return Err(ProviderError::Configuration(format!(
                "provider {} is disabled",
                setting.name()
            )));
        }
        Ok(self.adapter(setting))
    }

    fn adapter(&self, setting: &ProviderSetting) -> Arc<dyn Provider> {
        match setting {
            ProviderSetting::OpenAI(_) => self.openai.clone(),
            ProviderSetting::Ppio(_) => self.ppio.clone(),
        }
    }

    /// Catalog of the setting's provider, also for disabled settings
    pub async fn list_models(&self, setting: &ProviderSetting) -> ProviderResult<Vec<Model>> {
        let provider = self.adapter(setting);
        observe(setting.kind(), "list_models", provider.list_models(setting)).await
    }

    pub async fn get_balance(&self, setting: &ProviderSetting) -> ProviderResult<String> {
        let provider = self.adapter(setting);
        observe(setting.kind(), "get_balance", provider.get_balance(setting)).await
    }

    pub async fn generate_text(
        &self,
        setting: &ProviderSetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageChunk> {
        let provider = self.provider(setting)?;
        let chunk = observe(
            setting.kind(),
            "generate_text",
            provider.generate_text(setting, messages, params),
        )
        .await?;
        if let Some(usage) = &chunk.usage {
            counter!("genai_prompt_tokens_total", usage.prompt_tokens as u64, "provider" => setting.kind(), "model" => params.model.clone());
            counter!("genai_completion_tokens_total", usage.completion_tokens as u64, "provider" => setting.kind(), "model" => params.model.clone());
        }
        Ok(chunk)
    }

    pub async fn stream_text(
        &self,
        setting: &ProviderSetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageStream> {
        let provider = self.provider(setting)?;
        let kind = setting.kind();
        let start = Instant::now();
        let stream = observe(kind, "stream_text", provider.stream_text(setting, messages, params)).await?;

        let model = params.model.clone();
        let mut first = true;
        let wrapped = stream.inspect(move |res| {
            if res.is_ok() && first {
                histogram!("genai_first_chunk_latency_seconds", start.elapsed().as_secs_f64(), "provider" => kind, "model" => model.clone());
                first = false;
            }
        });
        Ok(Box::pin(wrapped))
    }

    pub async fn generate_image(
        &self,
        setting: &ProviderSetting,
        params: &ImageGenerationParams,
    ) -> ProviderResult<ImageGenerationResult> {
        let provider = self.provider(setting)?;
        let result = observe(setting.kind(), "generate_image", provider.generate_image(setting, params)).await?;
        counter!("genai_images_generated_total", result.items.len() as u64, "provider" => setting.kind());
        Ok(result)
    }
}

async fn observe<T, F>(provider: &'static str, operation: &'static str, fut: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    let mut call = InflightCall::start(provider, operation);
    let result = fut.await;
    call.outcome = match &result {
        Ok(_) => "success",
        Err(e) => {
            tracing::debug!(provider, operation, error = %e, "provider call failed");
            "error"
        }
    };
    result
}

/// Holds one slot of `genai_inflight_requests` until dropped.
///
/// A call whose future is dropped before completion is counted as `cancelled`.
struct InflightCall {
    provider: &'static str,
    operation: &'static str,
    start: Instant,
    outcome: &'static str,
}

impl InflightCall {
    fn start(provider: &'static str, operation: &'static str) -> Self {
        increment_gauge!("genai_inflight_requests", 1.0, "provider" => provider);
        Self {
            provider,
            operation,
            start: Instant::now(),
            outcome: "cancelled",
        }
    }
}

impl Drop for InflightCall {
    fn drop(&mut self) {
        let (provider, operation) = (self.provider, self.operation);
        histogram!("genai_request_latency_seconds", self.start.elapsed().as_secs_f64(), "provider" => provider, "operation" => operation);
        decrement_gauge!("genai_inflight_requests", 1.0, "provider" => provider);
        counter!("genai_requests_total", 1, "provider" => provider, "operation" => operation, "result" => self.outcome);
    }
}
