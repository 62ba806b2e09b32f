//! Common types for the provider dispatch subsystem
//!
//! Shared vocabulary used by every provider variant and by the manager:
//! - Capability flags describing what a backend can do
//! - Ordered privacy levels bounding what data may leave the device
//! - Chat message and request/response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProviderError;

/// Capability flags for a provider, combined as a bitset.
///
/// Flags combine via union (`|`); membership is an intersection check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No capabilities.
    pub const NONE: Capabilities = Capabilities(0);

    /// Runs inference in-process, without network access.
    pub const LOCAL_INFERENCE: Capabilities = Capabilities(1 << 0);

    /// Runs inference on a remote service.
    pub const REMOTE_INFERENCE: Capabilities = Capabilities(1 << 1);

    /// Accepts image inputs.
    pub const VISION: Capabilities = Capabilities(1 << 2);

    /// Can produce embedding vectors.
    pub const EMBEDDINGS: Capabilities = Capabilities(1 << 3);

    /// Supports streaming responses.
    pub const STREAMING: Capabilities = Capabilities(1 << 4);

    /// Check whether all flags in `other` are present.
    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Capabilities) {
        self.0 |= rhs.0;
    }
}

/// Maximum amount of request data that may leave the device.
///
/// Levels are totally ordered from most to least restrictive. No component
/// may transmit more than the level permits, regardless of what data it has
/// physical access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrivacyLevel {
    /// Nothing may be transmitted off-device.
    LocalOnly,

    /// Only filename/extension metadata may be transmitted.
    MetadataOnly,

    /// A bounded content excerpt may be transmitted.
    ContentExcerpt,

    /// Everything may be transmitted; additionally requires explicit
    /// content upload consent on the request.
    FullContent,
}

/// Provider health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Provider is configured and responsive.
    Healthy,

    /// Provider is reachable but reporting problems.
    Degraded,

    /// Provider is configured but unreachable or its model is missing.
    Unavailable,

    /// Required configuration (model path / API key / base URL) is absent.
    NotConfigured,
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    /// Wire-format role string.
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author role
    pub role: ChatRole,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Information about a model a provider can serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,

    /// Human-readable model name
    pub name: String,

    /// Short description
    pub description: String,

    /// Model size in bytes, 0 when unknown
    pub size_bytes: u64,

    /// Whether the model can currently be used
    pub is_available: bool,
}

/// An inference request dispatched to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Unique request identifier
    pub request_id: Uuid,

    /// Request creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Conversation messages
    pub messages: Vec<ChatMessage>,

    /// Requested model id; empty means the provider's configured model
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Per-attempt timeout in milliseconds; 0 means the provider default
    pub timeout_ms: u64,

    /// Maximum data classification allowed to leave the device
    pub privacy_level: PrivacyLevel,

    /// Explicit user consent for uploading full content
    pub allow_content_upload: bool,

    /// Character budget for content excerpts at `PrivacyLevel::ContentExcerpt`
    pub content_excerpt_budget: usize,

    /// Maximum retry attempts after the first (remote providers)
    pub max_retries: u32,

    /// Base backoff delay in milliseconds; 0 means the provider default
    pub retry_backoff_base_ms: u64,
}

impl LlmRequest {
    /// Create a request with default sampling and privacy settings.
    pub fn new(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the privacy level.
    pub fn with_privacy_level(mut self, level: PrivacyLevel) -> Self {
        self.privacy_level = level;
        self
    }

    /// Set the content upload consent flag.
    pub fn with_content_upload(mut self, allowed: bool) -> Self {
        self.allow_content_upload = allowed;
        self
    }

    /// Set the retry parameters.
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_base_ms = backoff_base_ms;
        self
    }
}

impl Default for LlmRequest {
    fn default() -> Self {
        Self {
            request_id: Uuid::now_v7(),
            timestamp: Utc::now(),
            messages: Vec::new(),
            model: String::new(),
            max_tokens: 256,
            temperature: 0.2,
            timeout_ms: 0,
            privacy_level: PrivacyLevel::LocalOnly,
            allow_content_upload: false,
            content_excerpt_budget: 512,
            max_retries: 2,
            retry_backoff_base_ms: 0,
        }
    }
}

/// A normalized provider response.
///
/// Faults never escape a provider's public surface; callers branch on
/// `success` and treat `error_message` as diagnostic text only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text, empty on failure
    pub text: String,

    /// Tokens consumed, 0 when unknown
    pub tokens_used: u32,

    /// Provider that produced this response
    pub provider_id: String,

    /// Model that actually served the request
    pub model_used: String,

    /// End-to-end latency in milliseconds
    pub duration_ms: u64,

    /// Whether the request succeeded
    pub success: bool,

    /// Error code, 0 on success (see `ProviderError::error_code`)
    pub error_code: u32,

    /// Diagnostic error text, empty on success
    pub error_message: String,

    /// Whether the response was produced by a remote service
    pub used_remote_inference: bool,

    /// Privacy level of the data that was actually transmitted
    pub actual_privacy_level: PrivacyLevel,
}

impl LlmResponse {
    /// Build a failure response for an error raised before any I/O.
    ///
    /// Pre-dispatch rejections report `PrivacyLevel::LocalOnly` as the actual
    /// level because nothing left the device. Failures after a transport
    /// attempt go through `remote_failure` instead.
    pub fn failure(provider_id: impl Into<String>, error: &ProviderError) -> Self {
        Self {
            text: String::new(),
            tokens_used: 0,
            provider_id: provider_id.into(),
            model_used: String::new(),
            duration_ms: 0,
            success: false,
            error_code: error.error_code(),
            error_message: error.to_string(),
            used_remote_inference: false,
            actual_privacy_level: PrivacyLevel::LocalOnly,
        }
    }

    /// Build a failure response for a remote call that was already dispatched.
    ///
    /// Once a transport attempt has carried the payload off-device the
    /// response must say so even though the call ultimately failed, or a
    /// privacy-auditing caller would conclude nothing was transmitted.
    pub fn remote_failure(
        provider_id: impl Into<String>,
        error: &ProviderError,
        privacy_level: PrivacyLevel,
    ) -> Self {
        Self {
            used_remote_inference: true,
            actual_privacy_level: privacy_level,
            ..Self::failure(provider_id, error)
        }
    }

    /// Set the measured latency.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
