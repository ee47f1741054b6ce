use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ImageAspectRatio, TokenUsage};

/// Chat message role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Extra HTTP header sent with a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHeader {
    pub name: String,
    pub value: String,
}

impl CustomHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Top-level key override merged into the generated request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomBody {
    pub key: String,
    pub value: serde_json::Value,
}

impl CustomBody {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Parameters for `Provider::generate_text` and `Provider::stream_text`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextGenerationParams {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub custom_headers: Vec<CustomHeader>,
    #[serde(default)]
    pub custom_body: Vec<CustomBody>,
}

impl TextGenerationParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_header(mut self, header: CustomHeader) -> Self {
        self.custom_headers.push(header);
        self
    }

    pub fn with_body(mut self, body: CustomBody) -> Self {
        self.custom_body.push(body);
        self
    }
}

/// Parameters for `Provider::generate_image`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationParams {
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_num_of_images")]
    pub num_of_images: u32,
    #[serde(default)]
    pub aspect_ratio: ImageAspectRatio,
    #[serde(default)]
    pub custom_headers: Vec<CustomHeader>,
    #[serde(default)]
    pub custom_body: Vec<CustomBody>,
}

fn default_num_of_images() -> u32 {
    1
}

impl ImageGenerationParams {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            num_of_images: default_num_of_images(),
            aspect_ratio: ImageAspectRatio::default(),
            custom_headers: Vec::new(),
            custom_body: Vec::new(),
        }
    }

    pub fn with_num_of_images(mut self, n: u32) -> Self {
        self.num_of_images = n;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: ImageAspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_header(mut self, header: CustomHeader) -> Self {
        self.custom_headers.push(header);
        self
    }

    pub fn with_body(mut self, body: CustomBody) -> Self {
        self.custom_body.push(body);
        self
    }
}

/// One generated image, still encoded as the vendor returned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationItem {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageGenerationResult {
    pub items: Vec<ImageGenerationItem>,
}

/// A choice inside a message chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageChoice {
    pub index: u32,
    pub message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Provider-agnostic unit of generated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageChunk {
    pub id: String,
    pub model: String,
    pub created: DateTime<Utc>,
    pub choices: Vec<MessageChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl MessageChunk {
    pub fn get_content(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.message.content.as_str())
    }
}
