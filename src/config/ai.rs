//! Generation provider configuration, including circuit breaker tunables.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Provider credential. Absent means the generator runs unconfigured:
    /// health checks report it and generation calls fail without a network
    /// attempt.
    pub api_key: Option<String>,
    /// Model identifier passed to the completion API.
    pub model: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Low-level retries beyond the first attempt.
    pub max_retries: u32,
    /// Seconds the circuit breaker stays open before a half-open trial.
    pub breaker_reset_secs: u64,
    /// Rolling error percentage (0..=100) at which the breaker opens.
    pub breaker_error_threshold_pct: u8,
    /// Minimum rolling call volume before the threshold applies.
    pub breaker_min_volume: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 15,
            max_retries: 2,
            breaker_reset_secs: 60,
            breaker_error_threshold_pct: 50,
            breaker_min_volume: 10,
        }
    }
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.breaker_error_threshold_pct > 100 {
            return Err("ai.breaker_error_threshold_pct must be 0..=100".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("ai.timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_tunables() {
        let config = AiConfig::default();
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.breaker_reset_secs, 60);
        assert_eq!(config.breaker_error_threshold_pct, 50);
        assert_eq!(config.breaker_min_volume, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn threshold_over_100_is_rejected() {
        let config = AiConfig {
            breaker_error_threshold_pct: 101,
            ..AiConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
