//! Provider manager and privacy choke point
//!
//! The single path by which a request may reach a provider:
//! - providers register under unique ids, last write wins
//! - privacy mode defaults to LocalOnly; escalation requires explicit
//!   user confirmation
//! - dispatch re-checks the active provider against the current mode
//!   before forwarding, so no call path can bypass the policy
//!
//! The manager performs no retries itself; its sole job is admission
//! control and routing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::provider::Provider;
use crate::types::{LlmRequest, LlmResponse, PrivacyLevel};

/// Privacy mode governing which providers may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyMode {
    /// Only providers that never touch the network (default)
    LocalOnly,

    /// Network-requiring providers enabled with user consent
    RemoteAllowed,
}

/// Mutable manager state, guarded by one lock so mode changes and active
/// provider updates are atomic together.
struct ManagerState {
    providers: HashMap<String, Arc<dyn Provider>>,
    active_provider_id: Option<String>,
    privacy_mode: PrivacyMode,
}

impl ManagerState {
    fn is_allowed(&self, provider: &dyn Provider) -> bool {
        // Local providers are always allowed; remote ones only when the
        // privacy mode permits
        !provider.requires_network() || self.privacy_mode == PrivacyMode::RemoteAllowed
    }

    fn active(&self) -> Option<Arc<dyn Provider>> {
        self.active_provider_id
            .as_ref()
            .and_then(|id| self.providers.get(id))
            .cloned()
    }
}

/// Registry and privacy gate for all inference providers.
///
/// One instance lives for the life of the process and is passed explicitly
/// to every request-handling path.
pub struct ProviderManager {
    state: RwLock<ManagerState>,
}

impl ProviderManager {
    /// Create a manager in LocalOnly mode with an empty registry.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ManagerState {
                providers: HashMap::new(),
                active_provider_id: None,
                privacy_mode: PrivacyMode::LocalOnly,
            }),
        }
    }

    /// Register a provider; an existing provider with the same id is
    /// replaced.
    pub fn register_provider(&self, provider: Arc<dyn Provider>) {
        let provider_id = provider.id().to_string();
        self.state.write().providers.insert(provider_id.clone(), provider);
        tracing::info!(provider = %provider_id, "Registered provider");
    }

    /// Remove a provider; clears the active selection if it was active.
    pub fn unregister_provider(&self, provider_id: &str) {
        let mut state = self.state.write();
        if state.providers.remove(provider_id).is_some() {
            if state.active_provider_id.as_deref() == Some(provider_id) {
                state.active_provider_id = None;
            }
            tracing::info!(provider = %provider_id, "Unregistered provider");
        }
    }

    /// Look up a provider by id.
    pub fn get_provider(&self, provider_id: &str) -> Option<Arc<dyn Provider>> {
        self.state.read().providers.get(provider_id).cloned()
    }

    /// All registered providers.
    pub fn all_providers(&self) -> Vec<Arc<dyn Provider>> {
        self.state.read().providers.values().cloned().collect()
    }

    /// Providers currently allowed under the privacy mode.
    pub fn allowed_providers(&self) -> Vec<Arc<dyn Provider>> {
        let state = self.state.read();
        state
            .providers
            .values()
            .filter(|provider| state.is_allowed(provider.as_ref()))
            .cloned()
            .collect()
    }

    /// Set the active provider.
    ///
    /// Returns false if the id is unknown or the provider requires network
    /// while the privacy mode is LocalOnly.
    pub fn set_active_provider(&self, provider_id: &str) -> bool {
        let mut state = self.state.write();

        let provider = match state.providers.get(provider_id) {
            Some(provider) => provider.clone(),
            None => {
                tracing::warn!(provider = %provider_id, "Cannot set active provider: not found");
                return false;
            }
        };

        if !state.is_allowed(provider.as_ref()) {
            tracing::warn!(
                provider = %provider_id,
                "Cannot set active provider: remote and privacy mode is LocalOnly"
            );
            return false;
        }

        state.active_provider_id = Some(provider_id.to_string());
        tracing::info!(
            provider = %provider_id,
            remote = provider.requires_network(),
            "Set active provider"
        );
        true
    }

    /// The currently active provider, if any.
    pub fn active_provider(&self) -> Option<Arc<dyn Provider>> {
        self.state.read().active()
    }

    /// Set the privacy mode.
    ///
    /// Switching to RemoteAllowed requires explicit user confirmation and is
    /// rejected with no state change without it. Switching to LocalOnly
    /// always succeeds and deactivates a network-requiring active provider
    /// in the same atomic step.
    pub fn set_privacy_mode(&self, mode: PrivacyMode, user_confirmed: bool) -> bool {
        if mode == PrivacyMode::RemoteAllowed && !user_confirmed {
            tracing::warn!("Cannot enable RemoteAllowed mode without user confirmation");
            return false;
        }

        let mut state = self.state.write();
        let old_mode = state.privacy_mode;
        state.privacy_mode = mode;

        if mode == PrivacyMode::LocalOnly {
            let deactivate = state
                .active()
                .map(|provider| provider.requires_network())
                .unwrap_or(false);
            if deactivate {
                tracing::info!(
                    provider = ?state.active_provider_id,
                    "Privacy mode changed to LocalOnly, deactivating remote provider"
                );
                state.active_provider_id = None;
            }
        }

        tracing::info!(?old_mode, new_mode = ?mode, "Privacy mode changed");
        true
    }

    /// Current privacy mode.
    pub fn privacy_mode(&self) -> PrivacyMode {
        self.state.read().privacy_mode
    }

    /// Whether remote providers are currently allowed.
    pub fn remote_allowed(&self) -> bool {
        self.privacy_mode() == PrivacyMode::RemoteAllowed
    }

    /// Check whether a request would be allowed right now.
    ///
    /// Returns a diagnostic message when blocked, `None` when allowed.
    pub fn validate_request(&self, request: &LlmRequest) -> Option<String> {
        let state = self.state.read();

        let provider = match state.active() {
            Some(provider) => provider,
            None => return Some("No active provider configured".to_string()),
        };

        if provider.requires_network() {
            if state.privacy_mode == PrivacyMode::LocalOnly {
                return Some(
                    "Active provider requires network but privacy mode is LocalOnly".to_string(),
                );
            }
            if request.privacy_level == PrivacyLevel::LocalOnly {
                return Some(
                    "Request is marked LocalOnly but active provider requires network".to_string(),
                );
            }
        }

        None
    }

    /// Resolve and admission-check the active provider for dispatch.
    ///
    /// `local_only_reason` is the diagnostic text used when the request is
    /// marked LocalOnly but the active provider requires network; chat and
    /// categorize report it differently.
    fn admit(
        &self,
        request: &LlmRequest,
        local_only_reason: &str,
    ) -> Result<Arc<dyn Provider>, LlmResponse> {
        let provider = {
            let state = self.state.read();

            let provider = match state.active() {
                Some(provider) => provider,
                None => return Err(Self::no_provider_error()),
            };

            // The mode may have changed since activation; re-check here
            if !state.is_allowed(provider.as_ref()) {
                return Err(Self::privacy_blocked_error(provider.id()));
            }

            provider
        };

        if provider.requires_network() && request.privacy_level == PrivacyLevel::LocalOnly {
            let err = ProviderError::PrivacyBlocked {
                reason: local_only_reason.to_string(),
            };
            return Err(LlmResponse::failure(provider.id(), &err));
        }

        Ok(provider)
    }

    /// Execute a chat request under the current privacy settings.
    pub async fn chat(&self, request: &LlmRequest) -> LlmResponse {
        let provider = match self
            .admit(request, "Request marked as LocalOnly cannot be sent to remote provider")
        {
            Ok(provider) => provider,
            Err(response) => return response,
        };

        tracing::debug!(provider = provider.id(), "Dispatching chat request");
        provider.chat(request).await
    }

    /// Execute a categorization request under the current privacy settings.
    pub async fn categorize(
        &self,
        filename: &str,
        filepath: &str,
        is_directory: bool,
        consistency_context: &str,
        base_request: &LlmRequest,
    ) -> LlmResponse {
        let provider = match self.admit(
            base_request,
            "Categorization request marked as LocalOnly cannot be sent to remote provider",
        ) {
            Ok(provider) => provider,
            Err(response) => return response,
        };

        tracing::debug!(
            provider = provider.id(),
            file = %filename,
            "Dispatching categorize request"
        );
        provider
            .categorize(filename, filepath, is_directory, consistency_context, base_request)
            .await
    }

    fn no_provider_error() -> LlmResponse {
        let err = ProviderError::Configuration {
            reason: "No active provider configured".to_string(),
        };
        LlmResponse::failure("", &err)
    }

    fn privacy_blocked_error(provider_id: &str) -> LlmResponse {
        let err = ProviderError::PrivacyBlocked {
            reason: format!(
                "Request blocked: provider '{}' requires network but privacy mode is \
                 LocalOnly. Enable remote providers in settings if you want to use this \
                 provider.",
                provider_id
            ),
        };
        LlmResponse::failure(provider_id, &err)
    }
}

impl Default for ProviderManager {
    fn default() -> Self {
        Self::new()
    }
}
