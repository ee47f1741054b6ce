//! Vendor adapters behind a single capability interface.

mod openai;
mod ppio;

pub use openai::OpenAIProvider;
pub use ppio::{build_image_request, decode_images, image_size, PpioProvider};

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::config::ProviderSetting;
use crate::error::ProviderResult;
use crate::models::{ChatMessage, ImageGenerationParams, ImageGenerationResult, MessageChunk, TextGenerationParams};
use crate::streaming::MessageStream;
use crate::types::{Model, ProviderId};

/// Returned by `get_balance` when the vendor exposes no balance API
pub const BALANCE_NOT_IMPLEMENTED: &str = "balance query not implemented";

/// The capability set every vendor adapter implements.
///
/// Each operation narrows `setting` to the adapter's own variant first and fails
/// with [`crate::ProviderError::SettingMismatch`] otherwise. Operations the vendor
/// cannot serve fail with [`crate::ProviderError::Unsupported`].
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn list_models(&self, setting: &ProviderSetting) -> ProviderResult<Vec<Model>>;

    async fn get_balance(&self, setting: &ProviderSetting) -> ProviderResult<String>;

    async fn generate_text(
        &self,
        setting: &ProviderSetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageChunk>;

    /// Lazily produced, finite chunk stream. Dropping it cancels the request.
    async fn stream_text(
        &self,
        setting: &ProviderSetting,
        messages: &[ChatMessage],
        params: &TextGenerationParams,
    ) -> ProviderResult<MessageStream>;

    async fn generate_image(
        &self,
        setting: &ProviderSetting,
        params: &ImageGenerationParams,
    ) -> ProviderResult<ImageGenerationResult>;
}

/// A fully built vendor request, ready for the transport
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: String,
}
