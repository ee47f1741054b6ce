use reqwest::StatusCode;
use std::io;
use thiserror::Error;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Main error type for provider adapters
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A setting of the wrong variant was handed to an adapter
    #[error("expected {expected} provider setting, got {actual}")]
    SettingMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The vendor does not implement the requested capability
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    /// Vendor answered with a non-success HTTP status
    #[error("unexpected status {0}: {1}")]
    UnexpectedStatus(StatusCode, String),

    /// Success status, but the payload is missing expected structure
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A custom header could not be encoded
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Environment variable error
    #[error("missing environment variable: {0}")]
    EnvVar(#[from] EnvVarError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Environment variable error
#[derive(Debug)]
pub struct EnvVarError {
    /// Name of the environment variable that is missing
    pub var: String,
    /// Optional instructions to help the user get a valid value
    pub instructions: Option<String>,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing environment variable: `{}`", self.var)?;
        if let Some(instructions) = &self.instructions {
            write!(f, ". {}", instructions)?;
        }
        Ok(())
    }
}

impl std::error::Error for EnvVarError {}

impl ProviderError {
    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// Nothing in this crate retries; this only classifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Reqwest(e) => e.is_timeout() || e.is_connect(),
            ProviderError::UnexpectedStatus(status, _) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Errors caused by the caller's input or wiring rather than the vendor
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProviderError::SettingMismatch { .. }
                | ProviderError::Unsupported { .. }
                | ProviderError::Configuration(_)
                | ProviderError::InvalidHeader(_)
                | ProviderError::EnvVar(_)
        )
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            ProviderError::UnexpectedStatus(status, _) => Some(*status),
            ProviderError::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}
