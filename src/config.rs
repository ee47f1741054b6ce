use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{EnvVarError, ProviderError, ProviderResult};
use crate::types::ProviderId;

/// Proxy used for calls made with a given provider setting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderProxy {
    #[default]
    None,
    Http {
        address: String,
        port: u16,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

/// Per-vendor account configuration. Each variant is served by exactly one adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderSetting {
    #[serde(rename = "openai")]
    OpenAI(OpenAISetting),
    Ppio(PpioSetting),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAISetting {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default = "OpenAISetting::default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// One or more keys separated by commas or whitespace
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "OpenAISetting::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub proxy: ProviderProxy,
}

impl OpenAISetting {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    fn default_name() -> String {
        "OpenAI".to_string()
    }

    fn default_base_url() -> String {
        Self::DEFAULT_BASE_URL.to_string()
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Self::default_name(),
            enabled: true,
            api_key: api_key.into(),
            base_url: Self::default_base_url(),
            proxy: ProviderProxy::None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PpioSetting {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default = "PpioSetting::default_name")]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// One or more keys separated by commas or whitespace
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "PpioSetting::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub proxy: ProviderProxy,
}

impl PpioSetting {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.ppinfra.com/v3";

    fn default_name() -> String {
        "PPIO".to_string()
    }

    fn default_base_url() -> String {
        Self::DEFAULT_BASE_URL.to_string()
    }

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Self::default_name(),
            enabled: true,
            api_key: api_key.into(),
            base_url: Self::default_base_url(),
            proxy: ProviderProxy::None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: ProviderProxy) -> Self {
        self.proxy = proxy;
        self
    }
}

fn default_enabled() -> bool {
    true
}

impl ProviderSetting {
    /// Variant tag, also used as the provider id of the matching adapter
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderSetting::OpenAI(_) => ProviderId::OPENAI,
            ProviderSetting::Ppio(_) => ProviderId::PPIO,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProviderSetting::OpenAI(s) => &s.name,
            ProviderSetting::Ppio(s) => &s.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            ProviderSetting::OpenAI(s) => s.enabled,
            ProviderSetting::Ppio(s) => s.enabled,
        }
    }

    pub fn proxy(&self) -> &ProviderProxy {
        match self {
            ProviderSetting::OpenAI(s) => &s.proxy,
            ProviderSetting::Ppio(s) => &s.proxy,
        }
    }

    pub fn as_openai(&self) -> ProviderResult<&OpenAISetting> {
        match self {
            ProviderSetting::OpenAI(s) => Ok(s),
            other => Err(ProviderError::SettingMismatch {
                expected: ProviderId::OPENAI,
                actual: other.kind(),
            }),
        }
    }

    pub fn as_ppio(&self) -> ProviderResult<&PpioSetting> {
        match self {
            ProviderSetting::Ppio(s) => Ok(s),
            other => Err(ProviderError::SettingMismatch {
                expected: ProviderId::PPIO,
                actual: other.kind(),
            }),
        }
    }

    /// Environment variable that may override this setting's keys, e.g. `PPIO_API_KEY`
    pub fn api_key_env_var(&self) -> String {
        format!("{}_API_KEY", self.kind().to_ascii_uppercase())
    }

    fn api_key_mut(&mut self) -> &mut String {
        match self {
            ProviderSetting::OpenAI(s) => &mut s.api_key,
            ProviderSetting::Ppio(s) => &mut s.api_key,
        }
    }
}

/// Shared HTTP client settings. Nothing is applied unless configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: Vec<ProviderSetting>,
}

impl ClientConfig {
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Replace configured keys with `<KIND>_API_KEY` where that variable is set
    pub fn apply_env_overrides(&mut self) {
        for setting in &mut self.providers {
            if let Ok(key) = std::env::var(setting.api_key_env_var()) {
                if !key.trim().is_empty() {
                    tracing::debug!(provider = setting.kind(), name = setting.name(), "api key taken from environment");
                    *setting.api_key_mut() = key;
                }
            }
        }
    }

    /// Find a provider setting by its display name, case-insensitively
    pub fn provider(&self, name: &str) -> Option<&ProviderSetting> {
        self.providers
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Like [`ClientConfig::provider`], but requires a usable key as well
    pub fn require_provider(&self, name: &str) -> ProviderResult<&ProviderSetting> {
        let setting = self
            .provider(name)
            .ok_or_else(|| ProviderError::Configuration(format!("no provider named {name}")))?;
        let key = match setting {
            ProviderSetting::OpenAI(s) => &s.api_key,
            ProviderSetting::Ppio(s) => &s.api_key,
        };
        if key.trim().is_empty() {
            return Err(EnvVarError {
                var: setting.api_key_env_var(),
                instructions: Some(format!("or set api_key for provider {}", setting.name())),
            }
            .into());
        }
        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "http": { "timeout_secs": 60 },
        "providers": [
            { "type": "ppio", "api_key": "k1,k2",
              "proxy": { "type": "http", "address": "127.0.0.1", "port": 7890 } },
            { "type": "openai", "name": "Work", "api_key": "sk-1", "enabled": false }
        ]
    }"#;

    #[test]
    fn parses_tagged_settings_with_defaults() {
        let config = ClientConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.http.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.providers.len(), 2);

        let ProviderSetting::Ppio(ppio) = &config.providers[0] else {
            panic!("expected ppio setting");
        };
        assert_eq!(ppio.name, "PPIO");
        assert_eq!(ppio.base_url, PpioSetting::DEFAULT_BASE_URL);
        assert!(ppio.enabled);
        assert_eq!(
            ppio.proxy,
            ProviderProxy::Http {
                address: "127.0.0.1".into(),
                port: 7890,
                username: None,
                password: None,
            }
        );

        let work = config.provider("work").unwrap();
        assert_eq!(work.kind(), "openai");
        assert!(!work.enabled());
        assert_eq!(work.proxy(), &ProviderProxy::None);
    }

    #[test]
    fn narrowing_rejects_other_variant() {
        let setting = ProviderSetting::OpenAI(OpenAISetting::new("sk"));
        assert!(setting.as_openai().is_ok());
        let err = setting.as_ppio().unwrap_err();
        assert_eq!(err.to_string(), "expected ppio provider setting, got openai");
    }

    #[test]
    fn env_var_name_follows_kind() {
        let setting = ProviderSetting::Ppio(PpioSetting::new("k"));
        assert_eq!(setting.api_key_env_var(), "PPIO_API_KEY");
    }

    #[test]
    fn require_provider_reports_missing_key() {
        let config = ClientConfig {
            http: HttpConfig::default(),
            providers: vec![ProviderSetting::Ppio(PpioSetting::new("  "))],
        };
        let err = config.require_provider("ppio").unwrap_err();
        assert!(err.to_string().contains("PPIO_API_KEY"));
        assert!(config.require_provider("nope").is_err());
    }
}
