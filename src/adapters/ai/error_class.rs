//! Classification of provider failures.
//!
//! Classification drives logging severity only; every class counts equally
//! toward the circuit breaker's error rate.

use std::fmt;

/// Fixed taxonomy of provider failure causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    QuotaExceeded,
    RateLimit,
    InvalidApiKey,
    Timeout,
    ServerError,
    NetworkError,
    Unknown,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::QuotaExceeded => "quota_exceeded",
            ErrorClass::RateLimit => "rate_limit",
            ErrorClass::InvalidApiKey => "invalid_api_key",
            ErrorClass::Timeout => "timeout",
            ErrorClass::ServerError => "server_error",
            ErrorClass::NetworkError => "network_error",
            ErrorClass::Unknown => "unknown",
        }
    }

    /// Whether a bounded low-level retry is worthwhile for this class.
    /// Quota and credential problems will not fix themselves mid-request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorClass::RateLimit
                | ErrorClass::Timeout
                | ErrorClass::ServerError
                | ErrorClass::NetworkError
        )
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a provider failure by inspecting its message.
///
/// Order matters: quota phrasing often also mentions 429, so quota is
/// checked before rate limiting.
pub fn classify(message: &str) -> ErrorClass {
    let message = message.to_lowercase();

    if message.contains("insufficient_quota")
        || message.contains("quota")
        || message.contains("billing")
    {
        return ErrorClass::QuotaExceeded;
    }
    if message.contains("rate_limit") || message.contains("429") {
        return ErrorClass::RateLimit;
    }
    if message.contains("invalid_api_key")
        || message.contains("unauthorized")
        || message.contains("401")
    {
        return ErrorClass::InvalidApiKey;
    }
    if message.contains("timeout") || message.contains("timed out") {
        return ErrorClass::Timeout;
    }
    if message.contains("500")
        || message.contains("502")
        || message.contains("503")
        || message.contains("504")
    {
        return ErrorClass::ServerError;
    }
    if message.contains("network")
        || message.contains("connection refused")
        || message.contains("dns")
    {
        return ErrorClass::NetworkError;
    }

    ErrorClass::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_beats_rate_limit_phrasing() {
        assert_eq!(
            classify("429: You exceeded your current quota"),
            ErrorClass::QuotaExceeded
        );
    }

    #[test]
    fn classifies_each_bucket() {
        assert_eq!(classify("Rate_limit reached for requests"), ErrorClass::RateLimit);
        assert_eq!(classify("Incorrect API key (invalid_api_key)"), ErrorClass::InvalidApiKey);
        assert_eq!(classify("request timed out"), ErrorClass::Timeout);
        assert_eq!(classify("HTTP 503 Service Unavailable"), ErrorClass::ServerError);
        assert_eq!(classify("network connection refused"), ErrorClass::NetworkError);
        assert_eq!(classify("something odd"), ErrorClass::Unknown);
    }

    #[test]
    fn quota_and_auth_are_not_retryable() {
        assert!(!ErrorClass::QuotaExceeded.is_retryable());
        assert!(!ErrorClass::InvalidApiKey.is_retryable());
        assert!(ErrorClass::Timeout.is_retryable());
        assert!(ErrorClass::ServerError.is_retryable());
    }
}
