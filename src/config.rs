//! Construction configuration for provider variants
//!
//! Providers are built from these configs by the factory at startup; loading
//! them from disk or UI state is the caller's concern. API keys are held as
//! `SecretString` and exposed only at the point a request header is built.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Configuration for the on-device provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocalProviderConfig {
    /// Path to the model file (GGUF)
    pub model_path: PathBuf,
}

impl LocalProviderConfig {
    /// Create a config for a model file.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self { model_path: model_path.into() }
    }

    /// Whether a model path has been set at all.
    pub fn is_configured(&self) -> bool {
        !self.model_path.as_os_str().is_empty()
    }
}

/// Configuration for the OpenAI-style provider.
///
/// Deserializes from settings storage; API keys land directly in
/// `SecretString` and are never serialized back out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: SecretString,

    /// Default model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new(String::new()),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Create a config with an API key and model name.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            model: model.into(),
        }
    }

    /// Whether the API key is present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }
}

/// Configuration for the Ollama Cloud provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaCloudConfig {
    /// API base URL
    pub base_url: String,

    /// API key
    pub api_key: SecretString,

    /// Model name
    pub model: String,

    /// Default per-attempt timeout in milliseconds
    pub timeout_ms: u64,

    /// Upper bound on per-request retries
    pub max_retries: u32,

    /// Default base backoff delay in milliseconds
    pub backoff_base_ms: u64,
}

impl Default for OllamaCloudConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ollama.com".to_string(),
            api_key: SecretString::new(String::new()),
            model: String::new(),
            timeout_ms: 30_000,
            max_retries: 3,
            backoff_base_ms: 250,
        }
    }
}

impl OllamaCloudConfig {
    /// Create a config with the required fields and default timing.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: SecretString::new(api_key.into()),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Whether base URL, API key, and model are all present.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
            && !self.api_key.expose_secret().is_empty()
            && !self.model.is_empty()
    }
}

/// Which provider the application has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderChoice {
    /// No provider selected yet
    #[default]
    Unset,

    /// On-device model execution
    Local,

    /// OpenAI-style remote API
    OpenAi,

    /// Ollama Cloud remote API
    OllamaCloud,
}

/// Aggregate provider settings supplied by the application's config source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Selected provider
    pub choice: ProviderChoice,

    /// On-device provider config
    pub local: LocalProviderConfig,

    /// OpenAI provider config
    pub openai: OpenAiConfig,

    /// Ollama Cloud provider config
    pub ollama: OllamaCloudConfig,
}
