//! A pluggable provider layer for generative AI backends
//!
//! Callers ask for text or images through one capability interface and a
//! per-vendor setting; adapters take care of key rotation, request building
//! and decoding the vendor's response.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod providers;
pub mod roulette;
pub mod streaming;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::ProviderClient;
pub use config::{ClientConfig, HttpConfig, OpenAISetting, PpioSetting, ProviderProxy, ProviderSetting};
pub use error::{ProviderError, ProviderResult};
pub use models::{
    ChatMessage, CustomBody, CustomHeader, ImageGenerationItem, ImageGenerationParams, ImageGenerationResult,
    MessageChunk, TextGenerationParams,
};
pub use providers::{OpenAIProvider, PpioProvider, Provider};
pub use roulette::{KeyRoulette, RoundRobinKeyRoulette};
pub use streaming::MessageStream;
pub use types::{ImageAspectRatio, Model, ModelType, ProviderId};

/// Initialize the logging system
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
