//! Ollama Cloud remote provider
//!
//! Remote backend speaking the Ollama chat API:
//! - privacy and configuration gates run before any I/O
//! - transport failures and 5xx responses retry with exponential backoff
//! - responses arrive as `{message:{content}}`, `{response}`, or `{error}`
//!
//! The endpoint is free to probe, so health checks issue one short-timeout
//! GET instead of trusting configuration presence.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::OllamaCloudConfig;
use crate::error::ProviderError;
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::types::{
    Capabilities, HealthStatus, LlmRequest, LlmResponse, ModelInfo, PrivacyLevel,
};

use super::{validate_privacy, Provider};

/// Timeout for the liveness probe, kept short so health checks stay cheap.
const HEALTH_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Provider for the Ollama Cloud API.
pub struct OllamaCloudProvider {
    /// API configuration
    config: OllamaCloudConfig,

    /// Injected HTTP transport
    transport: Arc<dyn HttpTransport>,
}

/// Outbound chat payload.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<WireMessage<'a>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

/// Inbound chat payload; exactly one of the fields is expected.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<ResponseMessage>,
    response: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaCloudProvider {
    /// Create a provider using the production HTTP transport.
    pub fn new(config: OllamaCloudConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a provider with an injected transport (tests).
    pub fn with_transport(config: OllamaCloudConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }

    fn effective_model<'a>(&'a self, request: &'a LlmRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.model
        } else {
            &request.model
        }
    }

    fn serialize_payload(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        let payload = OllamaChatRequest {
            model: self.effective_model(request),
            stream: false,
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            options: OllamaOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        serde_json::to_string(&payload).map_err(|e| ProviderError::Parse {
            reason: format!("Failed to serialize request: {}", e),
        })
    }

    fn parse_response(&self, body: &str) -> Result<String, ProviderError> {
        let parsed: OllamaChatResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse {
                reason: format!("Malformed Ollama response: {}", e),
            })?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::Inference {
                reason: format!("Remote inference error: {}", error),
            });
        }
        if let Some(message) = parsed.message {
            return Ok(message.content);
        }
        if let Some(response) = parsed.response {
            return Ok(response);
        }

        Err(ProviderError::Parse {
            reason: "Ollama response carried no message, response, or error field".to_string(),
        })
    }

    /// Gates and serialization that run before any I/O.
    fn preflight(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        validate_privacy(request, true)?;

        if !self.config.is_configured() {
            return Err(ProviderError::Configuration {
                reason: "Ollama Cloud base URL, API key, or model is missing".to_string(),
            });
        }

        self.serialize_payload(request)
    }

    async fn dispatch(&self, request: &LlmRequest, body: &str) -> Result<String, ProviderError> {
        let url = self.chat_url();
        let timeout_ms = if request.timeout_ms > 0 {
            request.timeout_ms
        } else {
            self.config.timeout_ms
        };
        let backoff_base_ms = if request.retry_backoff_base_ms > 0 {
            request.retry_backoff_base_ms
        } else {
            self.config.backoff_base_ms
        };

        // The configured retry limit bounds what a request may ask for
        let max_retries = request.max_retries.min(self.config.max_retries);

        let policy = RetryPolicy::new(max_retries, backoff_base_ms);
        let response = policy
            .execute(|| {
                let http_request = HttpRequest::post_json(&url, body, timeout_ms)
                    .with_bearer_token(self.config.api_key.expose_secret());
                self.transport.send(http_request)
            })
            .await?;

        self.parse_response(&response.body)
    }
}

#[async_trait]
impl Provider for OllamaCloudProvider {
    fn id(&self) -> &str {
        "ollama-cloud"
    }

    fn display_name(&self) -> &str {
        "Ollama Cloud"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REMOTE_INFERENCE
    }

    fn requires_network(&self) -> bool {
        true
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn health_check(&self) -> HealthStatus {
        if !self.config.is_configured() {
            return HealthStatus::NotConfigured;
        }

        let probe = HttpRequest::get(
            self.config.base_url.trim_end_matches('/'),
            HEALTH_PROBE_TIMEOUT_MS,
        );

        match self.transport.send(probe).await {
            Ok(response) if response.is_success() => HealthStatus::Healthy,
            Ok(response) => {
                tracing::debug!(status = response.status, "Ollama liveness probe unhappy");
                HealthStatus::Degraded
            }
            Err(fault) => {
                tracing::debug!(error = %fault, "Ollama liveness probe failed");
                HealthStatus::Unavailable
            }
        }
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        // No catalog endpoint; mirror the configured model
        if self.config.model.is_empty() {
            return Vec::new();
        }

        vec![ModelInfo {
            id: self.config.model.clone(),
            name: self.config.model.clone(),
            description: "Ollama Cloud model".to_string(),
            size_bytes: 0,
            is_available: self.config.is_configured(),
        }]
    }

    async fn chat(&self, request: &LlmRequest) -> LlmResponse {
        let start = Instant::now();

        // Rejected here means nothing left the device
        let body = match self.preflight(request) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(provider = self.id(), error = %err, "chat request rejected");
                return LlmResponse::failure(self.id(), &err);
            }
        };

        match self.dispatch(request, &body).await {
            Ok(text) => LlmResponse {
                text,
                tokens_used: 0,
                provider_id: self.id().to_string(),
                model_used: self.effective_model(request).to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                success: true,
                error_code: 0,
                error_message: String::new(),
                used_remote_inference: true,
                actual_privacy_level: request.privacy_level,
            },
            Err(err) => {
                tracing::warn!(provider = self.id(), error = %err, "chat request failed");
                // The payload was already dispatched; report the transmission
                LlmResponse::remote_failure(self.id(), &err, request.privacy_level)
                    .with_duration_ms(start.elapsed().as_millis() as u64)
            }
        }
    }
}
