//! OpenAI-compatible implementation of the QuestionGenerator port.
//!
//! Wraps the chat-completions API with a request timeout, a bounded
//! low-level retry, and the process-wide circuit breaker. No retry layer is
//! stacked above the breaker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::config::AiConfig;
use crate::domain::{CommandCatalog, Message};
use crate::ports::{BreakerState, GenerationError, GeneratorHealth, QuestionGenerator};

use super::circuit_breaker::{BreakerConfig, RollingBreaker};
use super::error_class::{classify, ErrorClass};
use super::prompts::{question_prompt, summary_prompt, WireMessage};

/// Sampling temperature for both questions and summaries: varied but
/// coherent phrasing over determinism.
const RESPONSE_TEMPERATURE: f32 = 0.7;
const QUESTION_MAX_TOKENS: u32 = 150;
const SUMMARY_MAX_TOKENS: u32 = 500;

/// Runtime settings for the generation client.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    api_key: Option<Secret<String>>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Low-level retries beyond the first attempt, for retryable classes
    /// only.
    pub max_retries: u32,
}

impl OpenAiSettings {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.map(Secret::new),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret().as_str())
    }
}

impl From<&AiConfig> for OpenAiSettings {
    fn from(config: &AiConfig) -> Self {
        OpenAiSettings::new(config.api_key.clone())
            .with_model(&config.model)
            .with_base_url(&config.base_url)
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_max_retries(config.max_retries)
    }
}

/// Generation client backed by an OpenAI-compatible completion API.
pub struct OpenAiGenerator {
    settings: OpenAiSettings,
    client: Client,
    breaker: RollingBreaker,
    catalog: CommandCatalog,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings, breaker_config: BreakerConfig) -> Self {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            settings,
            client,
            breaker: RollingBreaker::new(breaker_config),
            catalog: CommandCatalog::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.settings.base_url)
    }

    /// One guarded completion call: breaker check, bounded retry, outcome
    /// recording, classified logging.
    async fn complete_guarded(
        &self,
        messages: Vec<WireMessage>,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let api_key = self
            .settings
            .api_key()
            .ok_or_else(|| GenerationError::Provider {
                message: "generation API key is not configured".to_string(),
            })?
            .to_string();

        if !self.breaker.should_allow() {
            return Err(GenerationError::CircuitOpen);
        }

        match self.complete_with_retry(&api_key, &messages, max_tokens).await {
            Ok(content) => {
                self.breaker.record_success();
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    // The provider answered; the breaker saw a success even
                    // though the payload is unusable.
                    return Err(GenerationError::GenerationFailed);
                }
                Ok(trimmed.to_string())
            }
            Err(err) => {
                self.breaker.record_failure();
                let class = classify(&err.to_string());
                error!(error_class = %class, error = %err, "completion call failed");
                if class == ErrorClass::QuotaExceeded {
                    error!("CRITICAL: generation quota exceeded, check billing and usage limits");
                }
                Err(err)
            }
        }
    }

    async fn complete_with_retry(
        &self,
        api_key: &str,
        messages: &[WireMessage],
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(api_key, messages, max_tokens).await {
                Ok(content) => return Ok(content),
                Err(err) => {
                    let retryable = classify(&err.to_string()).is_retryable();
                    if !retryable || attempt >= self.settings.max_retries {
                        return Err(err);
                    }
                    // Exponential backoff: 1s, 2s, 4s, ...
                    sleep(Duration::from_secs(1 << attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn complete_once(
        &self,
        api_key: &str,
        messages: &[WireMessage],
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": RESPONSE_TEMPERATURE,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                message: format!("completion API returned {status}: {body}"),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| GenerationError::Provider {
            message: format!("failed to parse completion response: {e}"),
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                timeout_secs: self.settings.timeout.as_secs(),
            }
        } else if err.is_connect() {
            GenerationError::Provider {
                message: format!("network connection failed: {err}"),
            }
        } else {
            GenerationError::Provider {
                message: err.to_string(),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn breaker(&self) -> &RollingBreaker {
        &self.breaker
    }
}

#[async_trait]
impl QuestionGenerator for OpenAiGenerator {
    async fn generate_question(
        &self,
        history: &[Message],
        question_number: u8,
    ) -> Result<String, GenerationError> {
        let command = self
            .catalog
            .get(question_number)
            .ok_or(GenerationError::CommandNotFound {
                number: question_number,
            })?;

        // Static fast path: no external call, history never inspected.
        if let Some(text) = command.static_question {
            return Ok(text.to_string());
        }

        debug!(question_number, "generating question via completion API");
        self.complete_guarded(question_prompt(command, history), QUESTION_MAX_TOKENS)
            .await
    }

    async fn generate_summary(&self, history: &[Message]) -> Result<String, GenerationError> {
        debug!("generating summary via completion API");
        self.complete_guarded(summary_prompt(history), SUMMARY_MAX_TOKENS)
            .await
    }

    async fn check_health(&self) -> GeneratorHealth {
        let start = Instant::now();

        let Some(api_key) = self.settings.api_key().map(str::to_string) else {
            return GeneratorHealth::not_configured();
        };

        if self.breaker.state() == BreakerState::Open {
            return GeneratorHealth {
                ok: false,
                latency_ms: start.elapsed().as_millis() as u64,
                error: Some("circuit_breaker_open".to_string()),
                circuit_open: true,
            };
        }

        let probe = self
            .client
            .get(self.models_url())
            .bearer_auth(&api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match probe {
            Ok(_) => GeneratorHealth {
                ok: true,
                latency_ms: start.elapsed().as_millis() as u64,
                error: None,
                circuit_open: false,
            },
            Err(err) => GeneratorHealth {
                ok: false,
                latency_ms: start.elapsed().as_millis() as u64,
                error: Some(format!("{}: {err}", classify(&err.to_string()))),
                circuit_open: false,
            },
        }
    }

    fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
