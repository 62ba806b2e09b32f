//! Bounded exponential-backoff retry for remote providers
//!
//! Wraps a transport attempt in a retry loop:
//! - attempts 0..=max_retries, attempt k>0 sleeps `base * 2^(k-1)` ms first
//! - success (2xx) and client errors (4xx) exit immediately
//! - network faults and server errors (5xx) are retried
//!
//! Backoff growth is uncapped; callers bound the worst case through
//! `max_retries` and the per-attempt timeout.

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;
use crate::transport::{HttpResponse, TransportFault};

/// Retry parameters for a remote call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retry attempts after the first; 0 means a single attempt
    pub max_retries: u32,

    /// Base backoff delay in milliseconds
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    /// Create a retry policy.
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self { max_retries, backoff_base_ms }
    }

    /// Backoff delay before attempt `attempt` (1-based for retries).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        debug_assert!(attempt > 0, "attempt 0 never backs off");
        let multiplier = 1u64 << (attempt - 1).min(63);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(multiplier))
    }

    /// Drive `attempt_fn` until it succeeds, fails non-retryably, or the
    /// attempt budget is exhausted.
    ///
    /// The returned error carries the last HTTP status received across all
    /// attempts, or no status when every attempt failed at the transport
    /// level.
    pub async fn execute<F, Fut>(&self, mut attempt_fn: F) -> Result<HttpResponse, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpResponse, TransportFault>>,
    {
        let total_attempts = self.max_retries + 1;
        let mut last_status: Option<u16> = None;
        let mut last_reason = String::new();

        for attempt in 0..total_attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match attempt_fn().await {
                Ok(response) if response.is_success() => {
                    return Ok(response);
                }
                Ok(response) if response.is_client_error() => {
                    // 4xx means the request itself is wrong; retrying cannot help
                    return Err(ProviderError::Transport {
                        status: Some(response.status),
                        reason: format!("HTTP {}: {}", response.status, response.body),
                    });
                }
                Ok(response) => {
                    tracing::warn!(
                        attempt,
                        status = response.status,
                        "remote call failed, will retry if attempts remain"
                    );
                    last_reason = format!("HTTP {}: {}", response.status, response.body);
                    last_status = Some(response.status);
                }
                Err(fault) => {
                    tracing::warn!(
                        attempt,
                        error = %fault,
                        "transport fault, will retry if attempts remain"
                    );
                    last_reason = fault.to_string();
                }
            }
        }

        Err(ProviderError::Transport {
            status: last_status,
            reason: format!(
                "Retries exhausted after {} attempts: {}",
                total_attempts, last_reason
            ),
        })
    }
}
