//! Admission control and input-length limits.

use serde::Deserialize;

use crate::domain::{MAX_RESPONSE_LENGTH, MAX_TITLE_LENGTH};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Fixed rate-limit window for response submission, in seconds.
    pub rate_window_secs: u64,
    /// Maximum submissions per caller per window.
    pub rate_max_requests: u32,
    /// Global cap on simultaneously in-flight submissions.
    pub max_concurrent_submissions: u32,
    /// Maximum conversation title length, in characters.
    pub max_title_length: usize,
    /// Maximum response length, in characters.
    pub max_response_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: 60,
            rate_max_requests: 10,
            max_concurrent_submissions: 4,
            max_title_length: MAX_TITLE_LENGTH,
            max_response_length: MAX_RESPONSE_LENGTH,
        }
    }
}

impl LimitsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_window_secs == 0 || self.rate_max_requests == 0 {
            return Err("limits.rate window and max must be positive".to_string());
        }
        if self.max_concurrent_submissions == 0 {
            return Err("limits.max_concurrent_submissions must be positive".to_string());
        }
        if self.max_title_length == 0 || self.max_response_length == 0 {
            return Err("limits length bounds must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_mirror_domain_bounds() {
        let limits = LimitsConfig::default();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.max_title_length, 50);
        assert_eq!(limits.max_response_length, 2000);
    }

    #[test]
    fn zero_window_is_rejected() {
        let limits = LimitsConfig {
            rate_window_secs: 0,
            ..LimitsConfig::default()
        };
        assert!(limits.validate().is_err());
    }
}
