//! Provider construction from application settings
//!
//! Builds the provider variant the settings select, wiring in the production
//! transport or an injected one. Providers are built once at startup and
//! handed to the `ProviderManager`.

use std::sync::Arc;

use crate::config::{
    LocalProviderConfig, OllamaCloudConfig, OpenAiConfig, ProviderChoice, ProviderSettings,
};
use crate::provider::{
    InferenceClient, OllamaCloudProvider, OnDeviceProvider, OpenAiProvider, Provider,
};
use crate::transport::HttpTransport;

/// Factory for provider variants.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the provider selected by the settings.
    ///
    /// The on-device variant needs the in-process engine handed in; remote
    /// variants use the production HTTP transport. Returns `None` when no
    /// usable choice is configured.
    pub fn from_settings(
        settings: &ProviderSettings,
        inference_client: Arc<dyn InferenceClient>,
    ) -> Option<Arc<dyn Provider>> {
        match settings.choice {
            ProviderChoice::Local => {
                if !settings.local.is_configured() {
                    return None;
                }
                Some(Self::local(settings.local.clone(), inference_client))
            }
            ProviderChoice::OpenAi => {
                Some(Self::openai(settings.openai.clone()))
            }
            ProviderChoice::OllamaCloud => {
                Some(Self::ollama_cloud(settings.ollama.clone()))
            }
            ProviderChoice::Unset => None,
        }
    }

    /// Build an on-device provider.
    pub fn local(
        config: LocalProviderConfig,
        client: Arc<dyn InferenceClient>,
    ) -> Arc<dyn Provider> {
        Arc::new(OnDeviceProvider::new(config, client))
    }

    /// Build an OpenAI-style provider with the production transport.
    pub fn openai(config: OpenAiConfig) -> Arc<dyn Provider> {
        Arc::new(OpenAiProvider::new(config))
    }

    /// Build an OpenAI-style provider with an injected transport.
    pub fn openai_with_transport(
        config: OpenAiConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Arc<dyn Provider> {
        Arc::new(OpenAiProvider::with_transport(config, transport))
    }

    /// Build an Ollama Cloud provider with the production transport.
    pub fn ollama_cloud(config: OllamaCloudConfig) -> Arc<dyn Provider> {
        Arc::new(OllamaCloudProvider::new(config))
    }

    /// Build an Ollama Cloud provider with an injected transport.
    pub fn ollama_cloud_with_transport(
        config: OllamaCloudConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Arc<dyn Provider> {
        Arc::new(OllamaCloudProvider::with_transport(config, transport))
    }
}
