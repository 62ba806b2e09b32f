//! Cross-provider scenario tests
//!
//! Privacy behavior that must hold identically for every variant: the
//! FullContent consent gate, filepath redaction on categorization, and the
//! reduction of categorize to a chat call.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use proptest::prelude::*;

use crate::config::{LocalProviderConfig, OllamaCloudConfig, OpenAiConfig};
use crate::transport::testing::ScriptedTransport;
use crate::types::{ChatMessage, ChatRole, LlmRequest, PrivacyLevel};

use super::local::{InferenceClient, InferenceFault, OnDeviceProvider};
use super::{
    build_categorize_prompt, build_categorize_request, OllamaCloudProvider, OpenAiProvider,
    Provider, CATEGORIZE_SYSTEM_PROMPT,
};

/// Inference client that records every prompt it receives.
struct RecordingClient {
    prompts: Mutex<Vec<String>>,
}

impl RecordingClient {
    fn new() -> Arc<Self> {
        Arc::new(Self { prompts: Mutex::new(Vec::new()) })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl InferenceClient for RecordingClient {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, InferenceFault> {
        self.prompts.lock().push(prompt.to_string());
        Ok("documents".to_string())
    }
}

fn metadata_request() -> LlmRequest {
    LlmRequest::new(Vec::new(), "")
        .with_privacy_level(PrivacyLevel::MetadataOnly)
        .with_retries(0, 1)
}

#[tokio::test]
async fn test_full_content_without_consent_blocked_on_every_provider() {
    // Both gates must permit a transmission; consent is missing here
    let request = LlmRequest::new(vec![ChatMessage::user("hi")], "")
        .with_privacy_level(PrivacyLevel::FullContent)
        .with_content_upload(false);

    let client = RecordingClient::new();
    let local = OnDeviceProvider::new(LocalProviderConfig::new("/models/m.gguf"), client.clone());
    let response = local.chat(&request).await;
    assert!(!response.success);
    assert_eq!(response.error_code, 403);
    assert!(client.prompts().is_empty());

    let transport = Arc::new(ScriptedTransport::always(200, r#"{"response": "x"}"#));
    let ollama = OllamaCloudProvider::with_transport(
        OllamaCloudConfig::new("https://ollama.example", "key", "llama3"),
        transport.clone(),
    );
    let response = ollama.chat(&request).await;
    assert!(!response.success);
    assert_eq!(response.error_code, 403);
    assert_eq!(transport.calls(), 0);

    let transport = Arc::new(ScriptedTransport::always(200, "{}"));
    let openai =
        OpenAiProvider::with_transport(OpenAiConfig::new("key", "gpt-4o-mini"), transport.clone());
    let response = openai.chat(&request).await;
    assert!(!response.success);
    assert_eq!(response.error_code, 403);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_full_content_with_consent_passes_gate() {
    let request = LlmRequest::new(vec![ChatMessage::user("hi")], "")
        .with_privacy_level(PrivacyLevel::FullContent)
        .with_content_upload(true)
        .with_retries(0, 1);

    let transport = Arc::new(ScriptedTransport::always(200, r#"{"response": "ok"}"#));
    let ollama = OllamaCloudProvider::with_transport(
        OllamaCloudConfig::new("https://ollama.example", "key", "llama3"),
        transport,
    );

    let response = ollama.chat(&request).await;
    assert!(response.success);
    assert_eq!(response.actual_privacy_level, PrivacyLevel::FullContent);
}

#[tokio::test]
async fn test_categorize_reduces_to_chat_with_system_instruction() {
    let client = RecordingClient::new();
    let provider =
        OnDeviceProvider::new(LocalProviderConfig::new("/models/m.gguf"), client.clone());

    let response = provider
        .categorize("report.pdf", "/home/user/report.pdf", false, "", &metadata_request())
        .await;

    assert!(response.success);
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(CATEGORIZE_SYSTEM_PROMPT));
    assert!(prompts[0].contains("report.pdf"));
    // The transcript ends where the assistant is expected to answer
    assert!(prompts[0].ends_with("Assistant:"));
}

#[tokio::test]
async fn test_categorize_at_metadata_only_redacts_filepath_on_the_wire() {
    let transport = Arc::new(ScriptedTransport::always(200, r#"{"response": "documents"}"#));
    let provider = OllamaCloudProvider::with_transport(
        OllamaCloudConfig::new("https://ollama.example", "key", "llama3"),
        transport.clone(),
    );

    let filepath = "/home/alice/secret-project/report.pdf";
    let response = provider
        .categorize("report.pdf", filepath, false, "", &metadata_request())
        .await;

    assert!(response.success);
    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    let body = sent[0].body.as_ref().expect("body");
    assert!(body.contains("report.pdf"));
    assert!(!body.contains(filepath));
    assert!(!body.contains("secret-project"));
}

#[test]
fn test_categorize_request_substitutes_messages_only() {
    let base = metadata_request().with_retries(4, 77);
    let request = build_categorize_request(&base, "notes.txt", "/tmp/notes.txt", false, "");

    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, ChatRole::System);
    assert_eq!(request.messages[1].role, ChatRole::User);
    // Everything else mirrors the base request
    assert_eq!(request.privacy_level, base.privacy_level);
    assert_eq!(request.max_retries, 4);
    assert_eq!(request.retry_backoff_base_ms, 77);
}

#[test]
fn test_prompt_includes_filepath_only_at_full_content_with_consent() {
    let filepath = "/home/user/taxes/2025.xlsx";

    let request = metadata_request()
        .with_privacy_level(PrivacyLevel::FullContent)
        .with_content_upload(true);
    let prompt = build_categorize_prompt(&request, "2025.xlsx", filepath, false, "");
    assert!(prompt.contains(filepath));

    // Same level without consent never reaches a provider (gated), but the
    // prompt builder itself must also redact
    let request = metadata_request().with_privacy_level(PrivacyLevel::FullContent);
    let prompt = build_categorize_prompt(&request, "2025.xlsx", filepath, false, "");
    assert!(!prompt.contains(filepath));
}

#[test]
fn test_prompt_marks_directories() {
    let request = metadata_request();
    let prompt = build_categorize_prompt(&request, "photos", "/home/user/photos", true, "");
    assert!(prompt.contains("directory"));
    assert!(prompt.contains("photos"));
}

#[test]
fn test_consistency_context_requires_content_excerpt_level() {
    let context = "src -> code\nnotes.txt -> documents";

    let request = metadata_request();
    let prompt = build_categorize_prompt(&request, "a.txt", "", false, context);
    assert!(!prompt.contains("notes.txt"));

    let request = metadata_request().with_privacy_level(PrivacyLevel::ContentExcerpt);
    let prompt = build_categorize_prompt(&request, "a.txt", "", false, context);
    assert!(prompt.contains("notes.txt"));
}

#[test]
fn test_consistency_context_truncated_to_excerpt_budget() {
    let context = "x".repeat(2000);

    let mut request = metadata_request().with_privacy_level(PrivacyLevel::ContentExcerpt);
    request.content_excerpt_budget = 100;
    let prompt = build_categorize_prompt(&request, "a.txt", "", false, &context);
    assert!(prompt.contains(&"x".repeat(100)));
    assert!(!prompt.contains(&"x".repeat(101)));

    // FullContent with consent sends the full context
    let request = metadata_request()
        .with_privacy_level(PrivacyLevel::FullContent)
        .with_content_upload(true);
    let prompt = build_categorize_prompt(&request, "a.txt", "", false, &context);
    assert!(prompt.contains(&context));
}

proptest! {
    // For any filepath value, a MetadataOnly categorization prompt never
    // contains the filepath
    #[test]
    fn prop_metadata_only_prompt_never_contains_filepath(
        segment in "[a-zA-Z0-9_-]{1,24}",
        file in "[a-zA-Z0-9_-]{1,16}\\.[a-z]{2,4}",
    ) {
        let filepath = format!("/home/{}/{}", segment, file);
        let request = LlmRequest::new(Vec::new(), "")
            .with_privacy_level(PrivacyLevel::MetadataOnly);

        let prompt = build_categorize_prompt(&request, &file, &filepath, false, "");

        prop_assert!(!prompt.contains(&filepath));
    }

    // The same holds at ContentExcerpt: only FullContent plus consent may
    // carry the path
    #[test]
    fn prop_excerpt_level_prompt_never_contains_filepath(
        segment in "[a-zA-Z0-9_-]{1,24}",
        file in "[a-zA-Z0-9_-]{1,16}\\.[a-z]{2,4}",
    ) {
        let filepath = format!("/home/{}/{}", segment, file);
        let request = LlmRequest::new(Vec::new(), "")
            .with_privacy_level(PrivacyLevel::ContentExcerpt);

        let prompt = build_categorize_prompt(&request, &file, &filepath, false, "");

        prop_assert!(!prompt.contains(&filepath));
    }
}
