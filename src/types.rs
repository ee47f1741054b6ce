use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Provider identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Predefined provider IDs
impl ProviderId {
    pub const OPENAI: &'static str = "openai";
    pub const PPIO: &'static str = "ppio";
}

/// Request ID for tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// What a model primarily produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelAbility {
    Tool,
    Reasoning,
}

/// Static model descriptor as reported by `Provider::list_models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub model_id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub input_modalities: BTreeSet<Modality>,
    pub output_modalities: BTreeSet<Modality>,
    #[serde(default)]
    pub abilities: BTreeSet<ModelAbility>,
}

impl Model {
    /// A text-in, text-out chat model
    pub fn chat(model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        Self {
            display_name: model_id.clone(),
            model_id,
            model_type: ModelType::Text,
            input_modalities: BTreeSet::from([Modality::Text]),
            output_modalities: BTreeSet::from([Modality::Text]),
            abilities: BTreeSet::new(),
        }
    }

    /// A text-to-image model
    pub fn image(model_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            display_name: display_name.into(),
            model_type: ModelType::Image,
            input_modalities: BTreeSet::from([Modality::Text]),
            output_modalities: BTreeSet::from([Modality::Image]),
            abilities: BTreeSet::new(),
        }
    }
}

/// Caller-facing image shape, mapped to vendor resolutions by each adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageAspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl std::str::FromStr for ImageAspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "square" | "1:1" => Ok(Self::Square),
            "landscape" | "16:9" => Ok(Self::Landscape),
            "portrait" | "9:16" => Ok(Self::Portrait),
            other => Err(format!("unknown aspect ratio: {other}")),
        }
    }
}
