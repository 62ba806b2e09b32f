//! On-device provider
//!
//! Wraps the in-process inference engine behind the `InferenceClient`
//! contract. Nothing ever leaves the device: the provider reports
//! `PrivacyLevel::LocalOnly` as the actual level regardless of what the
//! request permitted, and engine faults are converted to error responses
//! at this boundary instead of propagating.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LocalProviderConfig;
use crate::error::ProviderError;
use crate::types::{
    Capabilities, ChatMessage, HealthStatus, LlmRequest, LlmResponse, ModelInfo, PrivacyLevel,
};

use super::{validate_privacy, Provider};

/// Faults the in-process engine can raise.
#[derive(Debug, Clone, Error)]
pub enum InferenceFault {
    /// The model is missing or could not be loaded
    #[error("Model not available: {reason}")]
    NotLoaded { reason: String },

    /// The engine failed mid-inference
    #[error("Inference runtime failure: {reason}")]
    Runtime { reason: String },
}

/// Narrow contract to the in-process inference engine.
///
/// Production wraps the real engine; tests supply stubs.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Complete a prompt, returning generated text.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, InferenceFault>;
}

/// Provider backed by in-process model execution.
pub struct OnDeviceProvider {
    /// Model configuration
    config: LocalProviderConfig,

    /// Injected inference engine
    client: Arc<dyn InferenceClient>,
}

impl OnDeviceProvider {
    /// Create an on-device provider around an inference client.
    pub fn new(config: LocalProviderConfig, client: Arc<dyn InferenceClient>) -> Self {
        Self { config, client }
    }

    /// Filename of the configured model, for reporting.
    fn model_name(&self) -> String {
        self.config
            .model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Flatten the conversation into a role-labeled transcript prompt.
    fn build_transcript_prompt(messages: &[ChatMessage]) -> String {
        let mut prompt = String::new();
        for message in messages {
            let label = match message.role {
                crate::types::ChatRole::System => "System",
                crate::types::ChatRole::User => "User",
                crate::types::ChatRole::Assistant => "Assistant",
            };
            prompt.push_str(label);
            prompt.push_str(": ");
            prompt.push_str(&message.content);
            prompt.push('\n');
        }
        prompt.push_str("Assistant:");
        prompt
    }
}

#[async_trait]
impl Provider for OnDeviceProvider {
    fn id(&self) -> &str {
        "local"
    }

    fn display_name(&self) -> &str {
        "Local"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LOCAL_INFERENCE
    }

    fn requires_network(&self) -> bool {
        false
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.config.is_configured() {
            return HealthStatus::NotConfigured;
        }
        if !self.config.model_path.exists() {
            return HealthStatus::Unavailable;
        }
        HealthStatus::Healthy
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        if !self.config.model_path.exists() {
            return Vec::new();
        }

        let size_bytes = std::fs::metadata(&self.config.model_path)
            .map(|meta| meta.len())
            .unwrap_or(0);

        vec![ModelInfo {
            id: self.config.model_path.to_string_lossy().into_owned(),
            name: self.model_name(),
            description: "Local GGUF model".to_string(),
            size_bytes,
            is_available: true,
        }]
    }

    async fn chat(&self, request: &LlmRequest) -> LlmResponse {
        let start = Instant::now();

        if let Err(err) = validate_privacy(request, false) {
            return LlmResponse::failure(self.id(), &err);
        }

        if !self.config.is_configured() {
            let err = ProviderError::Configuration {
                reason: "Local model path is not configured".to_string(),
            };
            return LlmResponse::failure(self.id(), &err);
        }

        let prompt = Self::build_transcript_prompt(&request.messages);

        match self.client.complete(&prompt, request.max_tokens).await {
            Ok(text) => LlmResponse {
                text,
                tokens_used: 0,
                provider_id: self.id().to_string(),
                model_used: self.model_name(),
                duration_ms: start.elapsed().as_millis() as u64,
                success: true,
                error_code: 0,
                error_message: String::new(),
                used_remote_inference: false,
                actual_privacy_level: PrivacyLevel::LocalOnly,
            },
            Err(InferenceFault::NotLoaded { reason }) => {
                tracing::warn!(provider = self.id(), %reason, "local model unavailable");
                let err = ProviderError::Configuration { reason };
                LlmResponse::failure(self.id(), &err).with_duration_ms(
                    start.elapsed().as_millis() as u64,
                )
            }
            Err(InferenceFault::Runtime { reason }) => {
                tracing::warn!(provider = self.id(), %reason, "local inference failed");
                let err = ProviderError::Inference { reason };
                LlmResponse::failure(self.id(), &err).with_duration_ms(
                    start.elapsed().as_millis() as u64,
                )
            }
        }
    }
}
