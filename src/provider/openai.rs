//! OpenAI-style remote provider
//!
//! API-key-authenticated chat completions backend. Health checks never make
//! a network call: each probe would cost money, so configuration presence is
//! treated as healthy. Model listing likewise returns a static catalog
//! instead of a round trip.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::ProviderError;
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::types::{
    Capabilities, HealthStatus, LlmRequest, LlmResponse, ModelInfo, PrivacyLevel,
};

use super::{validate_privacy, Provider};

/// Chat completions endpoint.
const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Per-attempt timeout when the request leaves it unset.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Base backoff delay when the request leaves it unset.
const DEFAULT_BACKOFF_BASE_MS: u64 = 250;

/// Provider for an OpenAI-style chat completions API.
pub struct OpenAiProvider {
    /// API configuration
    config: OpenAiConfig,

    /// Injected HTTP transport
    transport: Arc<dyn HttpTransport>,
}

/// Outbound chat completions payload.
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Inbound chat completions payload.
#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiProvider {
    /// Create a provider using the production HTTP transport.
    pub fn new(config: OpenAiConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a provider with an injected transport (tests).
    pub fn with_transport(config: OpenAiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Model to request: the request's model if set, otherwise the configured
    /// default.
    fn effective_model<'a>(&'a self, request: &'a LlmRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.model
        } else {
            &request.model
        }
    }

    fn serialize_payload(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        let payload = ChatCompletionsRequest {
            model: self.effective_model(request),
            messages: request
                .messages
                .iter()
                .map(|message| WireMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        serde_json::to_string(&payload).map_err(|e| ProviderError::Parse {
            reason: format!("Failed to serialize request: {}", e),
        })
    }

    fn parse_response(&self, body: &str) -> Result<(String, u32), ProviderError> {
        let parsed: ChatCompletionsResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Parse {
                reason: format!("Malformed chat completions response: {}", e),
            })?;

        let text = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::Parse {
                reason: "Chat completions response contained no choices".to_string(),
            })?;

        let tokens = parsed.usage.map(|usage| usage.total_tokens).unwrap_or(0);
        Ok((text, tokens))
    }

    /// Gates and serialization that run before any I/O.
    fn preflight(&self, request: &LlmRequest) -> Result<String, ProviderError> {
        validate_privacy(request, true)?;

        if !self.config.is_configured() {
            return Err(ProviderError::Configuration {
                reason: "OpenAI API key is missing".to_string(),
            });
        }

        self.serialize_payload(request)
    }

    async fn dispatch(
        &self,
        request: &LlmRequest,
        body: &str,
    ) -> Result<(String, u32), ProviderError> {
        let timeout_ms = if request.timeout_ms > 0 {
            request.timeout_ms
        } else {
            DEFAULT_TIMEOUT_MS
        };
        let backoff_base_ms = if request.retry_backoff_base_ms > 0 {
            request.retry_backoff_base_ms
        } else {
            DEFAULT_BACKOFF_BASE_MS
        };

        let policy = RetryPolicy::new(request.max_retries, backoff_base_ms);
        let response = policy
            .execute(|| {
                let http_request = HttpRequest::post_json(CHAT_COMPLETIONS_URL, body, timeout_ms)
                    .with_bearer_token(self.config.api_key.expose_secret());
                self.transport.send(http_request)
            })
            .await?;

        self.parse_response(&response.body)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn display_name(&self) -> &str {
        "OpenAI"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::REMOTE_INFERENCE | Capabilities::STREAMING
    }

    fn requires_network(&self) -> bool {
        true
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn health_check(&self) -> HealthStatus {
        // Live probes cost money on this API; configuration presence is the
        // strongest check we make.
        if !self.config.is_configured() {
            return HealthStatus::NotConfigured;
        }
        HealthStatus::Healthy
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        // Static catalog, no round trip
        ["gpt-4o-mini", "gpt-4o", "gpt-4-turbo"]
            .into_iter()
            .map(|id| ModelInfo {
                id: id.to_string(),
                name: id.to_string(),
                description: "OpenAI chat model".to_string(),
                size_bytes: 0,
                is_available: true,
            })
            .collect()
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
            Ok((text, tokens_used)) => LlmResponse {
                text,
                tokens_used,
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

#[cfg(test)]
mod tests {
    use crate::transport::testing::ScriptedTransport;
    use crate::types::ChatMessage;

    use super::*;

    fn configured() -> OpenAiConfig {
        OpenAiConfig::new("test-key", "gpt-4o-mini")
    }

    fn remote_request() -> LlmRequest {
        LlmRequest::new(vec![ChatMessage::user("hello")], "")
            .with_privacy_level(PrivacyLevel::MetadataOnly)
            .with_retries(0, 1)
    }

    const CHAT_OK: &str = r#"{
        "choices": [{"message": {"content": "hello back"}}],
        "usage": {"total_tokens": 42}
    }"#;

    #[test]
    fn test_basic_properties() {
        let provider = OpenAiProvider::new(configured());

        assert_eq!(provider.id(), "openai");
        assert_eq!(provider.display_name(), "OpenAI");
        assert!(provider.requires_network());
        assert!(provider.capabilities().contains(Capabilities::REMOTE_INFERENCE));
        assert!(provider.capabilities().contains(Capabilities::STREAMING));
    }

    #[tokio::test]
    async fn test_health_check_never_touches_network() {
        let transport = Arc::new(ScriptedTransport::always(500, "boom"));
        let provider = OpenAiProvider::with_transport(configured(), transport.clone());

        assert_eq!(provider.health_check().await, HealthStatus::Healthy);
        assert_eq!(transport.calls(), 0);

        let provider =
            OpenAiProvider::with_transport(OpenAiConfig::default(), transport.clone());
        assert_eq!(provider.health_check().await, HealthStatus::NotConfigured);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_list_models_static_catalog() {
        let transport = Arc::new(ScriptedTransport::always(500, "boom"));
        let provider = OpenAiProvider::with_transport(configured(), transport.clone());

        let models = provider.list_models().await;

        assert!(!models.is_empty());
        assert!(models.iter().any(|m| m.id == "gpt-4o-mini"));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_success() {
        let transport = Arc::new(ScriptedTransport::always(200, CHAT_OK));
        let provider = OpenAiProvider::with_transport(configured(), transport.clone());

        let response = provider.chat(&remote_request()).await;

        assert!(response.success);
        assert_eq!(response.text, "hello back");
        assert_eq!(response.tokens_used, 42);
        assert_eq!(response.model_used, "gpt-4o-mini");
        assert!(response.used_remote_inference);
        assert_eq!(response.actual_privacy_level, PrivacyLevel::MetadataOnly);

        // Bearer auth on the wire
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0]
            .headers
            .iter()
            .any(|(name, value)| name == "Authorization" && value == "Bearer test-key"));
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits_before_transport() {
        let transport = Arc::new(ScriptedTransport::always(200, CHAT_OK));
        let provider = OpenAiProvider::with_transport(OpenAiConfig::default(), transport.clone());

        let response = provider.chat(&remote_request()).await;

        assert!(!response.success);
        assert_eq!(response.error_code, 1);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_local_only_request_blocked_before_transport() {
        let transport = Arc::new(ScriptedTransport::always(200, CHAT_OK));
        let provider = OpenAiProvider::with_transport(configured(), transport.clone());

        let request = remote_request().with_privacy_level(PrivacyLevel::LocalOnly);
        let response = provider.chat(&request).await;

        assert!(!response.success);
        assert_eq!(response.error_code, 403);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_parse_error() {
        let transport = Arc::new(ScriptedTransport::always(200, "not json"));
        let provider = OpenAiProvider::with_transport(configured(), transport);

        let response = provider.chat(&remote_request()).await;

        assert!(!response.success);
        assert_eq!(response.error_code, 3);
        // The request was transmitted before parsing failed
        assert!(response.used_remote_inference);
        assert_eq!(response.actual_privacy_level, PrivacyLevel::MetadataOnly);
    }

    #[tokio::test]
    async fn test_empty_choices_maps_to_parse_error() {
        let transport =
            Arc::new(ScriptedTransport::always(200, r#"{"choices": [], "usage": null}"#));
        let provider = OpenAiProvider::with_transport(configured(), transport);

        let response = provider.chat(&remote_request()).await;

        assert!(!response.success);
        assert_eq!(response.error_code, 3);
    }

    #[tokio::test]
    async fn test_request_model_overrides_configured_default() {
        let transport = Arc::new(ScriptedTransport::always(200, CHAT_OK));
        let provider = OpenAiProvider::with_transport(configured(), transport.clone());

        let mut request = remote_request();
        request.model = "gpt-4o".to_string();
        let response = provider.chat(&request).await;

        assert_eq!(response.model_used, "gpt-4o");
        let sent = transport.requests();
        assert!(sent[0].body.as_ref().expect("body").contains("\"gpt-4o\""));
    }
}
