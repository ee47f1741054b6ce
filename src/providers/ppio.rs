use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::Instrument;

use super::{PreparedRequest, Provider, BALANCE_NOT_IMPLEMENTED};
use crate::config::{PpioSetting, ProviderSetting};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{ensure_success, HttpTransport};
use crate::models::{
    ChatMessage, ImageGenerationItem, ImageGenerationParams, ImageGenerationResult, MessageChunk,
    TextGenerationParams,
};
use crate::roulette::{default_roulette, KeyRoulette};
use crate::streaming::MessageStream;
use crate::types::{ImageAspectRatio, Model, ProviderId, RequestId};
use crate::utils::{endpoint_url, merge_custom_body, request_headers};

const MODEL_ID: &str = "seedream-4.0";
const MAX_IMAGES: u32 = 15;
const IMAGE_MIME_TYPE: &str = "image/png";

/// PPIO Seedream image generation. Text operations are unsupported.
pub struct PpioProvider {
    transport: HttpTransport,
    roulette: Arc<dyn KeyRoulette>,
}

impl PpioProvider {
    pub fn new(transport: HttpTransport) -> Self {
        Self::with_roulette(transport, default_roulette())
    }

    pub fn with_roulette(transport: HttpTransport, roulette: Arc<dyn KeyRoulette>) -> Self {
        Self { transport, roulette }
    }

    async fn request_images(
        &self,
        setting: &PpioSetting,
        params: &ImageGenerationParams,
    ) -> ProviderResult<ImageGenerationResult> {
        let key = self.roulette.next(setting.id, &setting.api_key)?;
        let request = build_image_request(setting, params, &key)?;
        tracing::debug!(url = %request.url, aspect_ratio = ?params.aspect_ratio, "sending image request");

        let resp = self
            .transport
            .post(&setting.proxy, &request.url, request.headers, request.body)
            .await?;
        let resp = ensure_success(resp).await?;
        let body = resp.text().await?;

        let result = decode_images(&body)?;
        tracing::info!(items = result.items.len(), "image generation finished");
        Ok(result)
    }

    fn text_unsupported() -> ProviderError {
        ProviderError::Unsupported {
            provider: ProviderId::PPIO,
            operation: "text generation",
        }
    }
}

/// Native Seedream resolution for an aspect ratio
pub fn image_size(aspect_ratio: ImageAspectRatio) -> &'static str {
    match aspect_ratio {
        ImageAspectRatio::Square => "2048x2048",
        ImageAspectRatio::Landscape => "2560x1440",
        ImageAspectRatio::Portrait => "1440x2560",
    }
}

/// Build the Seedream request for `params`, authenticated with `api_key`
pub fn build_image_request(
    setting: &PpioSetting,
    params: &ImageGenerationParams,
    api_key: &str,
) -> ProviderResult<PreparedRequest> {
    let mut body = Map::new();
    body.insert("prompt".into(), json!(params.prompt));
    body.insert("size".into(), json!(image_size(params.aspect_ratio)));
    // single image per prompt, no storyboards
    body.insert("sequential_image_generation".into(), json!("disabled"));
    body.insert("max_images".into(), json!(params.num_of_images.clamp(1, MAX_IMAGES)));
    body.insert("watermark".into(), json!(false));
    let body = merge_custom_body(body, &params.custom_body);

    Ok(PreparedRequest {
        url: endpoint_url(&setting.base_url, MODEL_ID)?,
        headers: request_headers(&params.custom_headers, api_key)?,
        body: serde_json::to_string(&body)?,
    })
}

/// Decode a successful Seedream response body
pub fn decode_images(body: &str) -> ProviderResult<ImageGenerationResult> {
    let json: Value = serde_json::from_str(body)?;
    let images = json
        .get("images")
        .ok_or_else(|| ProviderError::InvalidResponse("No images in response".to_string()))?
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("`images` is not an array".to_string()))?;

    let items = images
        .iter()
        .map(|image| {
            let data = match image {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => "null".to_string(),
                other => {
                    return Err(ProviderError::InvalidResponse(format!(
                        "image entry is not a primitive: {other}"
                    )))
                }
            };
            Ok(ImageGenerationItem {
                data,
                mime_type: IMAGE_MIME_TYPE.to_string(),
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;

    Ok(ImageGenerationResult { items })
}

#[async_trait]
impl Provider for PpioProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderId::PPIO)
    }

    async fn list_models(&self, setting: &ProviderSetting) -> ProviderResult<Vec<Model>> {
        setting.as_ppio()?;
        Ok(vec![Model::image(MODEL_ID, "Seedream 4.0")])
    }

    async fn get_balance(&self, setting: &ProviderSetting) -> ProviderResult<String> {
        setting.as_ppio()?;
        Ok(BALANCE_NOT_IMPLEMENTED.to_string())
    }

    async fn generate_text(
        &self,
        setting: &ProviderSetting,
        _messages: &[ChatMessage],
        _params: &TextGenerationParams,
    ) -> ProviderResult<MessageChunk> {
        setting.as_ppio()?;
        Err(Self::text_unsupported())
    }

    async fn stream_text(
        &self,
        setting: &ProviderSetting,
        _messages: &[ChatMessage],
        _params: &TextGenerationParams,
    ) -> ProviderResult<MessageStream> {
        setting.as_ppio()?;
        Err(Self::text_unsupported())
    }

    async fn generate_image(
        &self,
        setting: &ProviderSetting,
        params: &ImageGenerationParams,
    ) -> ProviderResult<ImageGenerationResult> {
        let setting = setting.as_ppio()?;
        let request_id = RequestId::new();
        let span = tracing::info_span!("generate_image", provider = ProviderId::PPIO, request_id = %request_id);
        self.request_images(setting, params).instrument(span).await
    }
}
