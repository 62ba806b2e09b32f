//! Error types for the provider dispatch subsystem
//!
//! Every fault a provider can hit is normalized into a `ProviderError` at the
//! provider boundary and surfaced to callers as an unsuccessful `LlmResponse`;
//! nothing propagates past a provider's public surface.

use thiserror::Error;

/// Provider-level errors.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Required configuration is missing (credentials, model path, base URL)
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// The inference backend faulted at runtime
    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    /// The request was refused by privacy policy before any I/O
    #[error("Request blocked by privacy policy: {reason}")]
    PrivacyBlocked { reason: String },

    /// Transport failed and retries were exhausted; `status` is the last
    /// HTTP status received, if any response ever arrived
    #[error("Transport error: {reason}")]
    Transport { status: Option<u16>, reason: String },

    /// The backend returned a payload we could not interpret
    #[error("Response parsing failed: {reason}")]
    Parse { reason: String },
}

impl ProviderError {
    /// Stable numeric code reported on `LlmResponse::error_code`.
    pub fn error_code(&self) -> u32 {
        match self {
            ProviderError::Configuration { .. } => 1,
            ProviderError::Inference { .. } => 2,
            ProviderError::PrivacyBlocked { .. } => 403,
            ProviderError::Transport { status, .. } => status.map(u32::from).unwrap_or(0),
            ProviderError::Parse { .. } => 3,
        }
    }
}

/// Result type for internal provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
