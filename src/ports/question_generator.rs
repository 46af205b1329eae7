//! QuestionGenerator port - interface to the external text-generation service.
//!
//! The engine asks for two things only: the next question for a slot, and
//! the closing summary. Implementations own the resilience machinery
//! (timeout, retry, circuit breaker); the engine sees the distilled error
//! taxonomy below.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Message;

/// Circuit breaker state, exposed for readiness checks and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Normal operation, calls flow through.
    Closed,
    /// Failing fast, no network attempts until the reset timeout elapses.
    Open,
    /// One trial call allowed to probe recovery.
    HalfOpen,
}

/// Result of a lightweight provider probe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorHealth {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub circuit_open: bool,
}

impl GeneratorHealth {
    /// Health report for a provider with no credentials configured.
    /// No network call is made to produce this.
    pub fn not_configured() -> Self {
        Self {
            ok: false,
            latency_ms: 0,
            error: Some("not_configured".to_string()),
            circuit_open: false,
        }
    }
}

/// Failures surfaced by generation calls.
///
/// All variants are reported to end users as a generic failure; the specific
/// cause is logged server-side only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// No command exists for the requested question number.
    #[error("no command found for question number {number}")]
    CommandNotFound { number: u8 },

    /// The provider answered but returned empty or missing content.
    #[error("provider returned no usable content")]
    GenerationFailed,

    /// The provider did not respond within the configured timeout.
    #[error("generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The circuit breaker is open; no network attempt was made.
    #[error("generation circuit breaker is open")]
    CircuitOpen,

    /// Any other provider or transport failure. The message has already been
    /// classified and logged by the adapter.
    #[error("provider error: {message}")]
    Provider { message: String },
}

/// Port for producing question and summary text.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Generates the question for a 1-based slot.
    ///
    /// When the slot's command carries fixed text it is returned immediately
    /// with no external call and without inspecting `history`. Otherwise the
    /// history is replayed as alternating question/response turns (summaries
    /// excluded) to prompt the provider.
    async fn generate_question(
        &self,
        history: &[Message],
        question_number: u8,
    ) -> Result<String, GenerationError>;

    /// Generates the closing summary from the full message history.
    async fn generate_summary(&self, history: &[Message]) -> Result<String, GenerationError>;

    /// Probes the provider, reporting reachability, latency, and breaker
    /// state. Returns "not configured" without a network call when no
    /// credential is present.
    async fn check_health(&self) -> GeneratorHealth;

    /// Current circuit breaker state.
    fn breaker_state(&self) -> BreakerState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&BreakerState::HalfOpen).unwrap(),
            "\"half_open\""
        );
    }

    #[test]
    fn not_configured_health_carries_marker_error() {
        let health = GeneratorHealth::not_configured();
        assert!(!health.ok);
        assert_eq!(health.error.as_deref(), Some("not_configured"));
    }
}
