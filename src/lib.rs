//! Privacy-gated multi-provider LLM inference dispatch
//!
//! This crate decides which backend may handle an inference or
//! categorization request and enforces, through one unavoidable choke point,
//! that data never leaves the device beyond what the user has explicitly
//! authorized:
//! - Capability flags and ordered privacy levels shared by all backends
//! - A provider abstraction spanning on-device model execution and two
//!   differently-shaped remote HTTP APIs
//! - Bounded exponential-backoff retries for unreliable remote calls
//! - A `ProviderManager` that performs admission control and routing
//!
//! Responses, errors, and privacy metadata are normalized identically across
//! backends: callers branch on `LlmResponse::success` only.

pub mod config;
pub mod error;
pub mod factory;
pub mod manager;
pub mod provider;
pub mod retry;
pub mod transport;
pub mod types;

// Re-export commonly used items
pub use config::{
    LocalProviderConfig, OllamaCloudConfig, OpenAiConfig, ProviderChoice, ProviderSettings,
};
pub use error::{ProviderError, ProviderResult};
pub use factory::ProviderFactory;
pub use manager::{PrivacyMode, ProviderManager};
pub use provider::{
    InferenceClient, InferenceFault, OllamaCloudProvider, OnDeviceProvider, OpenAiProvider,
    Provider, CATEGORIZE_SYSTEM_PROMPT,
};
pub use retry::RetryPolicy;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportFault,
};
pub use types::{
    Capabilities, ChatMessage, ChatRole, HealthStatus, LlmRequest, LlmResponse, ModelInfo,
    PrivacyLevel,
};
