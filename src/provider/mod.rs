//! Provider abstraction for heterogeneous inference backends
//!
//! This module defines the `Provider` trait shared by the on-device engine
//! and the remote HTTP backends, plus the privacy helpers every variant
//! funnels through:
//! - `validate_privacy` gates a request before any I/O or engine call
//! - `build_categorize_request` reduces categorization to an equivalent
//!   chat call with the redaction rules already applied

mod local;
mod ollama;
mod openai;

#[cfg(test)]
mod tests;

pub use local::{InferenceClient, InferenceFault, OnDeviceProvider};
pub use ollama::OllamaCloudProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{
    Capabilities, ChatMessage, HealthStatus, LlmRequest, LlmResponse, ModelInfo, PrivacyLevel,
};

/// Fixed system instruction for categorization requests.
pub const CATEGORIZE_SYSTEM_PROMPT: &str = "You are a file categorization assistant. \
Given a file or directory name, assign it to a single category. \
Reply with the category name only, no explanation.";

/// A backend capable of producing chat and categorization responses.
///
/// Implementations never let an internal fault escape: every failure is
/// normalized into an unsuccessful `LlmResponse` at this boundary.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable registry identifier (e.g. "local", "openai").
    fn id(&self) -> &str;

    /// Human-readable provider name.
    fn display_name(&self) -> &str;

    /// Capability flags for this backend.
    fn capabilities(&self) -> Capabilities;

    /// Whether requests to this provider leave the device.
    fn requires_network(&self) -> bool;

    /// Whether the required configuration is present.
    fn is_configured(&self) -> bool;

    /// Check provider health with a check appropriate to its cost profile.
    async fn health_check(&self) -> HealthStatus;

    /// List models this provider can serve.
    async fn list_models(&self) -> Vec<ModelInfo>;

    /// Execute a chat request.
    async fn chat(&self, request: &LlmRequest) -> LlmResponse;

    /// Execute a categorization request.
    ///
    /// Reduces to an equivalent `chat` call: a fixed system instruction plus
    /// a constructed user prompt with the same redaction rules `chat`
    /// enforces.
    async fn categorize(
        &self,
        filename: &str,
        filepath: &str,
        is_directory: bool,
        consistency_context: &str,
        base_request: &LlmRequest,
    ) -> LlmResponse {
        let request = build_categorize_request(
            base_request,
            filename,
            filepath,
            is_directory,
            consistency_context,
        );
        self.chat(&request).await
    }
}

/// Check a request against privacy policy before any I/O happens.
///
/// Two independent gates are AND'ed: the privacy level and the explicit
/// content upload consent must both permit a transmission.
pub(crate) fn validate_privacy(
    request: &LlmRequest,
    requires_network: bool,
) -> Result<(), ProviderError> {
    if request.privacy_level == PrivacyLevel::FullContent && !request.allow_content_upload {
        return Err(ProviderError::PrivacyBlocked {
            reason: "FullContent requests require explicit content upload consent".to_string(),
        });
    }

    if requires_network && request.privacy_level == PrivacyLevel::LocalOnly {
        return Err(ProviderError::PrivacyBlocked {
            reason: "Request marked as LocalOnly cannot be sent to remote provider".to_string(),
        });
    }

    Ok(())
}

/// Build the redacted categorization user prompt.
///
/// The filepath is included only at FullContent with upload consent; at every
/// lower level only the filename is sent. The consistency context is included
/// from ContentExcerpt upward, truncated to the request's excerpt budget at
/// ContentExcerpt.
pub(crate) fn build_categorize_prompt(
    request: &LlmRequest,
    filename: &str,
    filepath: &str,
    is_directory: bool,
    consistency_context: &str,
) -> String {
    let kind = if is_directory { "directory" } else { "file" };

    let mut prompt = format!("Categorize the following {}.\nName: {}\n", kind, filename);

    let full_content_allowed =
        request.privacy_level == PrivacyLevel::FullContent && request.allow_content_upload;
    if full_content_allowed && !filepath.is_empty() {
        prompt.push_str(&format!("Path: {}\n", filepath));
    }

    if request.privacy_level >= PrivacyLevel::ContentExcerpt && !consistency_context.is_empty() {
        let context = if request.privacy_level == PrivacyLevel::ContentExcerpt {
            truncate_excerpt(consistency_context, request.content_excerpt_budget)
        } else {
            consistency_context.to_string()
        };
        prompt.push_str("\nCategories already assigned to nearby items:\n");
        prompt.push_str(&context);
        prompt.push('\n');
    }

    prompt.push_str("\nReply with a single category name.");
    prompt
}

/// Build the chat request a categorization reduces to.
pub(crate) fn build_categorize_request(
    base_request: &LlmRequest,
    filename: &str,
    filepath: &str,
    is_directory: bool,
    consistency_context: &str,
) -> LlmRequest {
    let prompt = build_categorize_prompt(
        base_request,
        filename,
        filepath,
        is_directory,
        consistency_context,
    );

    let mut request = base_request.clone();
    request.messages = vec![
        ChatMessage::system(CATEGORIZE_SYSTEM_PROMPT),
        ChatMessage::user(prompt),
    ];
    request
}

/// Truncate to a character budget without splitting a code point.
fn truncate_excerpt(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    text.chars().take(budget).collect()
}
